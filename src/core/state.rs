//! 循环状态：目标、提案与指令的持久化结构，以及单轮活动记录

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// 目标状态；只允许 pending → achieved / pending → failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Pending,
    Achieved,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub description: String,
    pub status: GoalStatus,
}

impl Goal {
    pub fn pending(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            status: GoalStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == GoalStatus::Pending
    }

    /// 结束一个 pending 目标；已结束的目标保持不变
    pub fn resolve(&mut self, success: bool) {
        if self.is_pending() {
            self.status = if success {
                GoalStatus::Achieved
            } else {
                GoalStatus::Failed
            };
        }
    }
}

/// 提案来源标记：由手动指令生成
pub const SOURCE_MANUAL_ORDERS: &str = "manual_orders";

/// last_proposal.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalDocument {
    pub plan: Option<String>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// last_orders.json；被消费后以 `orders: null` 落盘
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrdersDocument {
    pub orders: Option<String>,
    pub timestamp: f64,
}

/// 当前 Unix 时间（秒，带小数）
pub fn unix_now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// 一轮循环的活动行，各阶段依次追加，循环末尾写入每日日志
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleTrace {
    activities: Vec<String>,
}

impl CycleTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::info!(target: "worker_mind::cycle", "{}", line);
        self.activities.push(line);
    }

    pub fn activities(&self) -> &[String] {
        &self.activities
    }

    pub fn into_activities(self) -> Vec<String> {
        self.activities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_status_is_terminal() {
        let mut goal = Goal::pending("write report");
        goal.resolve(false);
        assert_eq!(goal.status, GoalStatus::Failed);
        goal.resolve(true);
        assert_eq!(goal.status, GoalStatus::Failed);
    }

    #[test]
    fn test_unknown_status_rejected() {
        let parsed = serde_json::from_str::<Goal>(r#"{"description": "x", "status": "maybe"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_proposal_field_names() {
        let doc = ProposalDocument {
            plan: Some("Fulfill manual order: dance".into()),
            goals: vec![Goal::pending("dance")],
            timestamp: 1.5,
            source: Some(SOURCE_MANUAL_ORDERS.into()),
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["goals"][0]["status"], "pending");
        assert_eq!(value["source"], "manual_orders");

        let cleared = OrdersDocument { orders: None, timestamp: 2.0 };
        assert!(serde_json::to_value(&cleared).unwrap()["orders"].is_null());
    }
}
