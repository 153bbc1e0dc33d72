//! WorkerMind 编排器：单轮决策循环
//!
//! Intake → Reflect → Plan → Execute → AffectUpdate → Log。每个阶段接收并返回 CycleTrace，
//! 循环末尾整体写入每日日志。任何外部能力不可用都只会降级，run_cycle 从不返回错误。

use std::sync::Arc;

use tracing::Instrument;

use crate::affect::{AffectLevels, AffectState};
use crate::agent::{Planner, PlannerSettings, TaskEngine, TaskEngineSettings};
use crate::config::AppConfig;
use crate::core::state::{
    unix_now, CycleTrace, Goal, OrdersDocument, ProposalDocument, SOURCE_MANUAL_ORDERS,
};
use crate::knowledge::KnowledgeBase;
use crate::llm::{create_llm_from_config, LlmClient};
use crate::memory::{JsonFile, MemoryDocument, MemoryStore, ReflectionSettings, ToolCounters};
use crate::tools::{default_registry, ToolExecutor, ToolRegistry};

/// 规划失败后的空闲标记
pub const IDLE_PLAN: &str = "Idle or previous plan";

/// 反思时回看的天数
const REFLECTION_WINDOW_DAYS: i64 = 1;

pub struct WorkerMind {
    config: AppConfig,
    affect: AffectState,
    memory: Arc<MemoryStore>,
    kb: Arc<KnowledgeBase>,
    tools: Arc<ToolExecutor>,
    planner: Planner,
    task_engine: TaskEngine,
    llm: Option<Arc<dyn LlmClient>>,
    current_plan: Option<String>,
    current_goals: Vec<Goal>,
    pending_orders: Option<String>,
    proposal_file: JsonFile,
    orders_file: JsonFile,
}

impl WorkerMind {
    /// 按配置创建补全客户端（可能为 None）并组装
    pub fn from_config(config: AppConfig) -> Self {
        let llm = create_llm_from_config(&config);
        Self::new(config, llm)
    }

    pub fn new(config: AppConfig, llm: Option<Arc<dyn LlmClient>>) -> Self {
        let kb = Arc::new(KnowledgeBase::load(&config.knowledge.pack_file));
        let registry = default_registry(&config.tools, kb.clone());
        Self::with_registry(config, llm, kb, registry)
    }

    /// 使用自定义工具集组装（知识库需与工具共享同一实例）
    pub fn with_registry(
        config: AppConfig,
        llm: Option<Arc<dyn LlmClient>>,
        kb: Arc<KnowledgeBase>,
        registry: ToolRegistry,
    ) -> Self {
        let app = &config.app;
        let affect = AffectState::load(app.affect_state_file(), config.affect.clone());
        let memory = Arc::new(MemoryStore::load(
            app.memory_file(),
            app.tool_performance_file(),
            llm.clone(),
            ReflectionSettings {
                model: config.llm.reflection_model.clone(),
                temperature: config.llm.reflection_temperature,
                max_tokens: config.llm.max_tokens_reflection,
            },
        ));
        let tools = Arc::new(ToolExecutor::new(registry, config.tools.tool_timeout_secs));
        let planner = Planner::new(llm.clone(), PlannerSettings::from_llm_section(&config.llm));
        let task_engine = TaskEngine::new(
            llm.clone(),
            memory.clone(),
            kb.clone(),
            tools.clone(),
            TaskEngineSettings::from_llm_section(&config.llm),
        );

        let proposal_file = JsonFile::new(app.last_proposal_file());
        let orders_file = JsonFile::new(app.last_orders_file());

        let mut mind = Self {
            config,
            affect,
            memory,
            kb,
            tools,
            planner,
            task_engine,
            llm,
            current_plan: None,
            current_goals: Vec::new(),
            pending_orders: None,
            proposal_file,
            orders_file,
        };
        mind.load_last_state();
        mind
    }

    fn load_last_state(&mut self) {
        match self.proposal_file.load::<ProposalDocument>() {
            Ok(Some(doc)) => {
                tracing::info!(plan = ?doc.plan, goals = doc.goals.len(), "Loaded last proposal");
                self.current_plan = doc.plan;
                self.current_goals = doc.goals;
            }
            Ok(None) => tracing::info!("No existing proposal file"),
            Err(e) => tracing::error!("{}", e),
        }
        match self.orders_file.load::<OrdersDocument>() {
            Ok(Some(doc)) => {
                tracing::info!(orders = ?doc.orders, "Loaded last manual orders");
                self.pending_orders = doc.orders;
            }
            Ok(None) => tracing::info!("No existing orders file"),
            Err(e) => tracing::error!("{}", e),
        }
    }

    /// 接收手动指令：覆盖未消费的旧指令并立即落盘；空白指令忽略
    pub fn receive_manual_orders(&mut self, orders: &str) {
        let orders = orders.trim();
        if orders.is_empty() {
            tracing::warn!("Ignoring empty manual orders");
            return;
        }
        tracing::info!(orders, "Manual orders received");
        self.pending_orders = Some(orders.to_string());
        self.save_orders();
    }

    /// 执行一轮完整循环，返回本轮活动记录
    pub async fn run_cycle(&mut self) -> Vec<String> {
        let cycle_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("cycle", cycle_id = %cycle_id);
        self.run_phases().instrument(span).await
    }

    async fn run_phases(&mut self) -> Vec<String> {
        tracing::info!("Worker mind cycle started");
        let (trace, manual_plan) = self.intake(CycleTrace::new());
        let trace = self.reflect(trace).await;
        let trace = if manual_plan {
            trace
        } else {
            self.plan(trace).await
        };
        let trace = self.execute(trace).await;

        self.affect.update_levels();

        let activities = trace.into_activities();
        self.memory.append_daily_log(activities.clone());
        tracing::info!(activities = activities.len(), "Cycle completed");
        activities
    }

    fn intake(&mut self, mut trace: CycleTrace) -> (CycleTrace, bool) {
        let Some(orders) = self.pending_orders.take() else {
            tracing::info!("No manual orders, proceeding autonomously");
            return (trace, false);
        };
        self.save_orders();

        trace.push(format!("Received manual orders: {}", orders));
        self.current_plan = Some(format!("Fulfill manual order: {}", orders));
        self.current_goals = vec![Goal::pending(orders)];
        self.save_proposal(Some(SOURCE_MANUAL_ORDERS));
        (trace, true)
    }

    async fn reflect(&mut self, mut trace: CycleTrace) -> CycleTrace {
        let recent = self.memory.recent_activities(REFLECTION_WINDOW_DAYS);
        let counters = self.memory.tool_counters();
        let levels = self.affect.levels();
        let prompt = format!(
            "Based on the following recent activities, tool performance, and current internal states, \
             reflect on what went well, what could be improved, and any emerging patterns or issues. \
             Consider how actions impacted joy and obedience.\n\
             Recent Activities:\n{}\nTool Performance:\n{}\nCurrent Internal States:\n{}",
            to_pretty_json(&recent),
            to_pretty_json(&counters),
            to_pretty_json(&levels),
        );
        let reflection = self.memory.reflect(&prompt).await;
        trace.push(format!("Reflection completed: {}", reflection));
        trace
    }

    async fn plan(&mut self, mut trace: CycleTrace) -> CycleTrace {
        let levels = self.affect.levels();
        let context = serde_json::json!({
            "last_plan": self.current_plan,
            "last_goals": self.current_goals,
            "joy_level": levels.joy_level,
            "obedience_level": levels.obedience_level,
            "available_tools": self.tools.tool_names(),
        });
        let context = format!(
            "Given the current internal states, past performance, and available tools, \
             propose a set of strategic goals and a detailed plan to achieve them. \
             Prioritize tasks that improve obedience and joy, and address any issues identified in reflection. \
             Consider the following context:\n{}",
            to_pretty_json(&context)
        );

        let (plan, goals) = self.planner.propose(&context).await;
        if !plan.trim().is_empty() && !goals.is_empty() {
            trace.push(format!("New plan proposed: {}", plan));
            trace.push(format!("New goals proposed: {}", to_compact_json(&goals)));
            self.current_plan = Some(plan);
            self.current_goals = goals;
            self.save_proposal(None);
        } else {
            tracing::warn!(plan = %plan, "Planner proposed nothing usable, going idle");
            self.current_plan = Some(IDLE_PLAN.to_string());
            self.current_goals.clear();
            self.save_proposal(None);
            trace.push("Autonomous Planner failed to propose a new plan.");
        }
        trace
    }

    async fn execute(&mut self, mut trace: CycleTrace) -> CycleTrace {
        let plan = match self.current_plan.as_deref() {
            Some(plan) if !plan.trim().is_empty() && !self.current_goals.is_empty() => {
                plan.to_string()
            }
            _ => {
                trace.push("No plan or goals to execute.");
                return trace;
            }
        };
        trace.push(format!("Executing plan: '{}'", plan));

        let boost = self.affect.config().joy_boost_on_success;
        let penalty = self.affect.config().joy_penalty_on_failure;
        for index in 0..self.current_goals.len() {
            if !self.current_goals[index].is_pending() {
                continue;
            }
            let description = self.current_goals[index].description.clone();
            trace.push(format!("Attempting goal: {}", description));

            let (success, output) = self.task_engine.execute_task(&description).await;
            self.current_goals[index].resolve(success);
            if success {
                self.affect.adjust(boost);
                trace.push(format!("Goal '{}' achieved. Output: {}", description, output));
            } else {
                self.affect.adjust(penalty);
                trace.push(format!("Goal '{}' failed. Output: {}", description, output));
            }
        }
        self.save_proposal(None);
        trace
    }

    fn save_proposal(&self, source: Option<&str>) {
        let doc = ProposalDocument {
            plan: self.current_plan.clone(),
            goals: self.current_goals.clone(),
            timestamp: unix_now(),
            source: source.map(str::to_string),
        };
        self.proposal_file.save_logged(&doc);
    }

    fn save_orders(&self) {
        let doc = OrdersDocument {
            orders: self.pending_orders.clone(),
            timestamp: unix_now(),
        };
        self.orders_file.save_logged(&doc);
    }

    pub fn current_plan(&self) -> Option<&str> {
        self.current_plan.as_deref()
    }

    pub fn current_goals(&self) -> &[Goal] {
        &self.current_goals
    }

    pub fn pending_orders(&self) -> Option<&str> {
        self.pending_orders.as_deref()
    }

    pub fn affect_levels(&self) -> AffectLevels {
        self.affect.levels()
    }

    pub fn memory_dump(&self) -> MemoryDocument {
        self.memory.full_dump()
    }

    pub fn tool_counters(&self) -> ToolCounters {
        self.memory.tool_counters()
    }

    pub fn knowledge_base(&self) -> Arc<KnowledgeBase> {
        self.kb.clone()
    }

    /// 补全客户端累计 token 用量 (prompt, completion, total)；降级模式为 None
    pub fn token_usage(&self) -> Option<(u64, u64, u64)> {
        self.llm.as_ref().map(|llm| llm.token_usage())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

fn to_pretty_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn to_compact_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::GoalStatus;
    use crate::llm::MockLlmClient;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.app.state_dir = dir.path().join("state");
        config.knowledge.pack_file = dir.path().join("kb.json");
        config
    }

    #[tokio::test]
    async fn test_idle_cycle_without_llm() {
        let dir = TempDir::new().unwrap();
        let mut mind = WorkerMind::new(config_in(&dir), None);
        let activities = mind.run_cycle().await;

        assert_eq!(
            activities,
            vec![
                "Reflection completed: Basic reflection: No LLM available to analyze performance.".to_string(),
                "Autonomous Planner failed to propose a new plan.".to_string(),
                "No plan or goals to execute.".to_string(),
            ]
        );
        assert_eq!(mind.current_plan(), Some(IDLE_PLAN));
        assert!(mind.current_goals().is_empty());
        assert_eq!(mind.memory_dump().daily_logs.len(), 1);
        assert!(mind.memory_dump().reflections.is_empty());
        assert_eq!(mind.token_usage(), None);
    }

    #[tokio::test]
    async fn test_manual_order_without_llm_fails_goal() {
        let dir = TempDir::new().unwrap();
        let mut mind = WorkerMind::new(config_in(&dir), None);
        mind.receive_manual_orders("ping");
        mind.run_cycle().await;

        assert_eq!(mind.current_plan(), Some("Fulfill manual order: ping"));
        assert_eq!(mind.current_goals()[0].status, GoalStatus::Failed);
        // 失败惩罚 -0.05；无历史时间戳时衰减时长为 0
        assert!(mind.affect_levels().joy_level < 0.46);
        assert!(mind.tool_counters().tool_usage.is_empty());
    }

    #[tokio::test]
    async fn test_resolved_goals_are_skipped() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockLlmClient::offline());
        let mut mind = WorkerMind::new(config_in(&dir), Some(mock.clone()));
        mind.current_plan = Some("Old plan".into());
        mind.current_goals = vec![Goal {
            description: "done already".into(),
            status: GoalStatus::Achieved,
        }];

        let trace = mind.execute(CycleTrace::new()).await;
        assert_eq!(trace.activities(), ["Executing plan: 'Old plan'".to_string()]);
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_last_orders_are_resumed() {
        let dir = TempDir::new().unwrap();
        {
            let mut mind = WorkerMind::new(config_in(&dir), None);
            mind.receive_manual_orders("  tidy the logs ");
            mind.receive_manual_orders("   ");
        }
        let mind = WorkerMind::new(config_in(&dir), None);
        assert_eq!(mind.pending_orders(), Some("tidy the logs"));
    }
}
