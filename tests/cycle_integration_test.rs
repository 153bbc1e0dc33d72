//! 决策循环集成测试：多轮循环、手动指令、重启后状态恢复

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;
    use worker_mind::config::AppConfig;
    use worker_mind::core::{GoalStatus, OrdersDocument, WorkerMind, IDLE_PLAN};
    use worker_mind::llm::MockLlmClient;
    use worker_mind::memory::JsonFile;

    fn config_in(dir: &TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.app.state_dir = dir.path().join("agent_state");
        config.knowledge.pack_file = dir.path().join("knowledge_packs").join("pack.json");
        config
    }

    #[tokio::test]
    async fn test_manual_order_is_fulfilled() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let mock = Arc::new(MockLlmClient::offline());
        let mut mind = WorkerMind::new(config.clone(), Some(mock.clone()));
        assert_eq!(mind.affect_levels().joy_level, 0.5);

        mind.receive_manual_orders("ping");
        let activities = mind.run_cycle().await;

        assert_eq!(mind.current_plan(), Some("Fulfill manual order: ping"));
        assert_eq!(mind.current_goals().len(), 1);
        assert_eq!(mind.current_goals()[0].description, "ping");
        assert_eq!(mind.current_goals()[0].status, GoalStatus::Achieved);
        assert_eq!(mind.pending_orders(), None);
        assert_eq!(mind.memory_dump().daily_logs.len(), 1);

        assert_eq!(activities[0], "Received manual orders: ping");
        assert!(activities[1].starts_with("Reflection completed: "));
        assert_eq!(activities[2], "Executing plan: 'Fulfill manual order: ping'");
        assert_eq!(activities[3], "Attempting goal: ping");
        assert_eq!(activities[4], "Goal 'ping' achieved. Output: status: nominal");

        // 手动指令本轮不请求规划
        assert!(mock
            .requests()
            .iter()
            .all(|r| !r.system_prompt.contains("strategic planner")));
        assert_eq!(mind.tool_counters().success("echo"), 1);
        assert!(mind.affect_levels().joy_level > 0.59);

        let orders: OrdersDocument = JsonFile::new(config.app.last_orders_file())
            .load()
            .unwrap()
            .unwrap();
        assert_eq!(orders.orders, None);
    }

    #[tokio::test]
    async fn test_non_json_plan_goes_idle() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(
            MockLlmClient::new()
                .with_rule("strategic planner", "I would rather not plan today.")
                .with_default("Reflection: steady."),
        );
        let mut mind = WorkerMind::new(config_in(&dir), Some(mock));
        let activities = mind.run_cycle().await;

        assert_eq!(mind.current_plan(), Some(IDLE_PLAN));
        assert!(mind.current_goals().is_empty());
        assert_eq!(
            activities,
            vec![
                "Reflection completed: Reflection: steady.".to_string(),
                "Autonomous Planner failed to propose a new plan.".to_string(),
                "No plan or goals to execute.".to_string(),
            ]
        );
        assert_eq!(mind.memory_dump().reflections.len(), 1);
    }

    #[tokio::test]
    async fn test_autonomous_cycle_then_restart() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let (levels, goals) = {
            let mock = Arc::new(MockLlmClient::offline());
            let mut mind = WorkerMind::new(config.clone(), Some(mock));
            mind.run_cycle().await;
            assert_eq!(mind.current_plan(), Some("Keep the worker mind healthy"));
            assert_eq!(mind.current_goals()[0].status, GoalStatus::Achieved);
            (mind.affect_levels(), mind.current_goals().to_vec())
        };

        let mind = WorkerMind::new(config, None);
        assert_eq!(mind.current_plan(), Some("Keep the worker mind healthy"));
        assert_eq!(mind.current_goals(), goals.as_slice());
        assert_eq!(mind.affect_levels(), levels);
        assert_eq!(mind.memory_dump().daily_logs.len(), 1);
        assert_eq!(mind.memory_dump().reflections.len(), 1);
        assert_eq!(mind.tool_counters().usage("echo"), 1);
    }

    #[tokio::test]
    async fn test_idle_cycle_discards_persisted_plan() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        {
            let mock = Arc::new(MockLlmClient::offline());
            let mut mind = WorkerMind::new(config.clone(), Some(mock));
            mind.run_cycle().await;
            assert_eq!(mind.current_plan(), Some("Keep the worker mind healthy"));
        }
        {
            let mock = MockLlmClient::new()
                .with_rule("strategic planner", "not json")
                .with_default("Reflection: steady.");
            let mut mind = WorkerMind::new(config.clone(), Some(Arc::new(mock)));
            mind.run_cycle().await;
            assert_eq!(mind.current_plan(), Some(IDLE_PLAN));
        }

        let mind = WorkerMind::new(config, None);
        assert_eq!(mind.current_plan(), Some(IDLE_PLAN));
        assert!(mind.current_goals().is_empty());
    }

    #[tokio::test]
    async fn test_second_order_overwrites_first() {
        let dir = TempDir::new().unwrap();
        let mut mind = WorkerMind::new(config_in(&dir), Some(Arc::new(MockLlmClient::offline())));
        mind.receive_manual_orders("first");
        mind.receive_manual_orders("second");
        mind.run_cycle().await;

        assert_eq!(mind.current_goals()[0].description, "second");

        // 下一轮没有指令，回到自主规划
        mind.run_cycle().await;
        assert_eq!(mind.current_plan(), Some("Keep the worker mind healthy"));
        assert_eq!(mind.memory_dump().daily_logs.len(), 2);
    }
}
