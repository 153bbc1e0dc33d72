//! Planner：根据上下文向 LLM 请求计划文本与目标列表
//!
//! 回复解析策略：`plan` 缺失 → "No plan proposed."；`goals` 非数组 → 空；
//! 单个目标缺 description / status、不是对象或 status 未知 → 丢弃并计数。

use std::sync::Arc;

use serde_json::Value;

use crate::agent::decision::extract_json;
use crate::config::LlmSection;
use crate::core::state::Goal;
use crate::llm::{CompletionRequest, LlmClient};

pub const NO_LLM_PLAN: &str = "No LLM available for planning.";
pub const LLM_ERROR_PLAN: &str = "Failed to generate a valid plan (LLM error).";
pub const DECODE_ERROR_PLAN: &str = "Failed to generate a valid plan (JSON decode error).";
pub const NO_PLAN_PROPOSED: &str = "No plan proposed.";

const PLANNER_SYSTEM_PROMPT: &str = "You are a strategic planner for an AI agent. Your task is to propose actionable plans and clear, measurable goals in JSON format.";

const EXAMPLE_RESPONSE: &str = r#"```json
{
  "plan": "Improve system efficiency and user satisfaction.",
  "goals": [
    {"description": "Analyze recent tool failures to identify root causes.", "status": "pending"},
    {"description": "Optimize the data processing pipeline for faster execution.", "status": "pending"}
  ]
}
```"#;

#[derive(Debug, Clone)]
pub struct PlannerSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl PlannerSettings {
    pub fn from_llm_section(cfg: &LlmSection) -> Self {
        Self {
            model: cfg.planning_model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens_planning,
        }
    }
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self::from_llm_section(&LlmSection::default())
    }
}

pub struct Planner {
    llm: Option<Arc<dyn LlmClient>>,
    settings: PlannerSettings,
}

impl Planner {
    pub fn new(llm: Option<Arc<dyn LlmClient>>, settings: PlannerSettings) -> Self {
        Self { llm, settings }
    }

    fn build_prompt(context: &str) -> String {
        format!(
            "Given the following context, propose a strategic plan and a list of actionable, measurable goals. \
             The plan should be a high-level strategy, and the goals should be specific tasks that can be executed. \
             Each goal should have a 'description' and an initial 'status' (e.g., 'pending'). \
             Prioritize tasks that align with the agent's purpose, improve internal states (joy, obedience), \
             and address any identified issues. \
             Respond ONLY with a JSON object containing 'plan' (string) and 'goals' (array of objects). \
             Context:\n{}\n\nExample JSON response:\n{}\nYour JSON response:",
            context, EXAMPLE_RESPONSE
        )
    }

    /// 提出计划与目标；失败时返回说明文本与空目标列表，从不报错
    pub async fn propose(&self, context: &str) -> (String, Vec<Goal>) {
        let Some(llm) = &self.llm else {
            tracing::warn!("LLM client not available for planning");
            return (NO_LLM_PLAN.to_string(), Vec::new());
        };

        let request = CompletionRequest::new(PLANNER_SYSTEM_PROMPT, Self::build_prompt(context))
            .model(&self.settings.model)
            .temperature(self.settings.temperature)
            .max_tokens(self.settings.max_tokens)
            .structured();

        let raw = match llm.complete(&request).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(error = %e, "Planning request failed");
                return (LLM_ERROR_PLAN.to_string(), Vec::new());
            }
        };
        tracing::debug!(raw = %raw, "Planner raw response");
        parse_plan(&raw)
    }
}

/// 解析规划回复（纯函数）
pub fn parse_plan(raw: &str) -> (String, Vec<Goal>) {
    let data = match serde_json::from_str::<Value>(extract_json(raw)) {
        Ok(Value::Object(data)) => data,
        _ => {
            tracing::warn!("Planner response was not a JSON object");
            return (DECODE_ERROR_PLAN.to_string(), Vec::new());
        }
    };

    let plan = data
        .get("plan")
        .and_then(|v| v.as_str())
        .unwrap_or(NO_PLAN_PROPOSED)
        .to_string();

    let goals = match data.get("goals") {
        Some(Value::Array(entries)) => {
            let total = entries.len();
            let goals: Vec<Goal> = entries
                .iter()
                .filter_map(|entry| serde_json::from_value::<Goal>(entry.clone()).ok())
                .collect();
            let dropped = total - goals.len();
            if dropped > 0 {
                tracing::warn!(dropped, kept = goals.len(), "Dropped invalid goal entries");
            }
            goals
        }
        Some(_) => {
            tracing::warn!("Planner returned goals that are not an array");
            Vec::new()
        }
        None => Vec::new(),
    };

    (plan, goals)
}
