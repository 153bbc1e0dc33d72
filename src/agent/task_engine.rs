//! TaskEngine：执行单个目标
//!
//! 两步请求：先问是否需要查询知识库（`Query KB for <x>` / `N/A`），再请求行动决策
//! （直接回答或工具调用）。每次尝试恰好记录一次工具结果计数和一条即时日志。

use std::sync::Arc;

use crate::agent::decision::{parse_decision, parse_kb_suggestion, Decision, KbSuggestion};
use crate::config::LlmSection;
use crate::knowledge::KnowledgeBase;
use crate::llm::{CompletionRequest, LlmClient};
use crate::memory::MemoryStore;
use crate::tools::{action_decision_schema_json, ToolExecutor};

pub const NOT_CONFIGURED: &str = "LLM client not configured.";
pub const PARSE_FAILURE: &str = "Failed to parse LLM's action decision.";
pub const UNCLEAR_DECISION: &str = "LLM could not determine a clear action.";

/// 保留的结果计数键
pub const KEY_PARSE_ERROR: &str = "decisionParseError";
pub const KEY_DIRECT_RESPONSE: &str = "directResponse";
pub const KEY_UNCLEAR: &str = "decisionUnclear";

const KB_SYSTEM_PROMPT: &str = "You are a helpful AI assistant deciding whether the local knowledge base can help with a task. Answer with 'Query KB for <topic>' or 'N/A'.";
const DECISION_SYSTEM_PROMPT: &str = "You are an agent designed to execute tasks. Respond with a single valid JSON object only.";

#[derive(Debug, Clone)]
pub struct TaskEngineSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens_decision: u32,
    pub max_tokens_kb_suggestion: u32,
}

impl TaskEngineSettings {
    pub fn from_llm_section(cfg: &LlmSection) -> Self {
        Self {
            model: cfg.task_model.clone(),
            temperature: cfg.temperature,
            max_tokens_decision: cfg.max_tokens_task_decision,
            max_tokens_kb_suggestion: cfg.max_tokens_kb_suggestion,
        }
    }
}

impl Default for TaskEngineSettings {
    fn default() -> Self {
        Self::from_llm_section(&LlmSection::default())
    }
}

pub struct TaskEngine {
    llm: Option<Arc<dyn LlmClient>>,
    memory: Arc<MemoryStore>,
    kb: Arc<KnowledgeBase>,
    tools: Arc<ToolExecutor>,
    settings: TaskEngineSettings,
}

impl TaskEngine {
    pub fn new(
        llm: Option<Arc<dyn LlmClient>>,
        memory: Arc<MemoryStore>,
        kb: Arc<KnowledgeBase>,
        tools: Arc<ToolExecutor>,
        settings: TaskEngineSettings,
    ) -> Self {
        Self {
            llm,
            memory,
            kb,
            tools,
            settings,
        }
    }

    /// 执行一个目标，返回 (是否成功, 输出文本)
    pub async fn execute_task(&self, goal: &str) -> (bool, String) {
        let Some(llm) = &self.llm else {
            tracing::warn!(goal, "LLM client not available for task execution");
            return (false, NOT_CONFIGURED.to_string());
        };
        tracing::info!(goal, "Executing task");

        let kb_info = self.consult_knowledge_base(llm.as_ref(), goal).await;

        let prompt = self.decision_prompt(goal, &kb_info);
        let request = CompletionRequest::new(DECISION_SYSTEM_PROMPT, prompt)
            .model(&self.settings.model)
            .temperature(self.settings.temperature)
            .max_tokens(self.settings.max_tokens_decision)
            .structured();
        let decision = match llm.complete(&request).await {
            Ok(raw) => {
                tracing::debug!(raw = %raw, "Raw action decision");
                parse_decision(&raw)
            }
            Err(e) => {
                tracing::error!(error = %e, "Action decision request failed");
                Decision::Unparseable(e.to_string())
            }
        };

        let (key, success, output) = match decision {
            Decision::DirectResponse { content } => {
                tracing::info!(content = %content, "Direct response");
                (KEY_DIRECT_RESPONSE.to_string(), true, content)
            }
            Decision::ToolCall { name, args } => {
                tracing::info!(tool = %name, args = %args, "Tool call");
                match self.tools.execute(&name, args).await {
                    Ok(output) => (name, true, output),
                    Err(e) => {
                        let output = format!("Error calling tool '{}': {}", name, e);
                        (name, false, output)
                    }
                }
            }
            Decision::Malformed(raw) => {
                tracing::warn!(raw = %raw, "Decision was neither direct response nor tool call");
                (KEY_UNCLEAR.to_string(), false, UNCLEAR_DECISION.to_string())
            }
            Decision::Unparseable(raw) => {
                tracing::warn!(raw = %raw, "Decision was not valid JSON");
                (KEY_PARSE_ERROR.to_string(), false, PARSE_FAILURE.to_string())
            }
        };

        self.memory.record_tool_outcome(&key, success);
        self.memory.add_log_entry(&format!(
            "Task '{}' attempted via '{}'. Success: {}. Output: {}",
            goal, key, success, output
        ));
        (success, output)
    }

    /// 第一步：请求知识库建议并执行查询；任何失败都返回空上下文
    async fn consult_knowledge_base(&self, llm: &dyn LlmClient, goal: &str) -> String {
        let prompt = format!(
            "Given the task '{}', is there any relevant information or concept in the local knowledge base \
             that could help in understanding or executing this task? If yes, reply exactly \
             'Query KB for <concise query>'. If no, respond with 'N/A'.",
            goal
        );
        let request = CompletionRequest::new(KB_SYSTEM_PROMPT, prompt)
            .model(&self.settings.model)
            .temperature(self.settings.temperature)
            .max_tokens(self.settings.max_tokens_kb_suggestion);

        let suggestion = match llm.complete(&request).await {
            Ok(reply) => parse_kb_suggestion(&reply),
            Err(e) => {
                tracing::warn!(error = %e, "KB suggestion request failed");
                KbSuggestion::NotApplicable
            }
        };
        match suggestion {
            KbSuggestion::Query(query) => {
                let info = self.kb.query(&query);
                tracing::info!(query = %query, "KB consulted");
                info
            }
            KbSuggestion::NotApplicable => String::new(),
        }
    }

    fn decision_prompt(&self, goal: &str, kb_info: &str) -> String {
        let tools = self
            .tools
            .tool_descriptions()
            .into_iter()
            .map(|(name, description)| format!("- {}: {}", name, description))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "Task: '{}'.\n\
             Context from KB (if any):\n{}\n\n\
             Available Tools:\n{}\n\n\
             Tool argument schemas:\n{}\n\n\
             Based on the task and available tools, decide the best course of action. \
             If a tool is suitable, provide a JSON object with 'tool_name' and 'tool_args'. \
             Example: {{\"tool_name\": \"search_web\", \"tool_args\": {{\"query\": \"latest news\"}}}}\n\
             If no tool is suitable and you can directly answer or state the next logical step, \
             provide a JSON object with 'direct_response' and 'response_content'. \
             Example: {{\"direct_response\": \"true\", \"response_content\": \"I will now proceed to...\"}}\n\
             Decision format schema:\n{}",
            goal,
            kb_info,
            tools,
            self.tools.schema_json(),
            action_decision_schema_json()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::{Concept, KnowledgePack};
    use crate::llm::MockLlmClient;
    use crate::memory::ReflectionSettings;
    use crate::tools::{ArgKind, ArgSpec, EchoTool, Tool, ToolRegistry};
    use async_trait::async_trait;
    use serde_json::Value;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        memory: Arc<MemoryStore>,
        engine: TaskEngine,
    }

    fn fixture(llm: Option<Arc<dyn LlmClient>>) -> Fixture {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        fixture_with(llm, registry)
    }

    fn fixture_with(llm: Option<Arc<dyn LlmClient>>, registry: ToolRegistry) -> Fixture {
        let dir = TempDir::new().unwrap();
        let memory = Arc::new(MemoryStore::load(
            dir.path().join("memory.json"),
            dir.path().join("tools.json"),
            None,
            ReflectionSettings::default(),
        ));
        let kb = Arc::new(KnowledgeBase::in_memory(KnowledgePack {
            concepts: vec![Concept {
                id: "c1".into(),
                name: "Joy".into(),
                description: "Positive affect".into(),
            }],
            ..KnowledgePack::default()
        }));
        let tools = Arc::new(ToolExecutor::new(registry, 5));
        let engine = TaskEngine::new(llm, memory.clone(), kb, tools, TaskEngineSettings::default());
        Fixture {
            _dir: dir,
            memory,
            engine,
        }
    }

    #[tokio::test]
    async fn test_no_llm_records_nothing() {
        let f = fixture(None);
        let result = f.engine.execute_task("anything").await;
        assert_eq!(result, (false, NOT_CONFIGURED.to_string()));
        assert!(f.memory.tool_counters().tool_usage.is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_decision() {
        let mock = Arc::new(
            MockLlmClient::new()
                .with_rule("knowledge base", "N/A")
                .with_rule("execute tasks", "definitely not json"),
        );
        let f = fixture(Some(mock));
        let result = f.engine.execute_task("Summarize logs").await;

        assert_eq!(result, (false, PARSE_FAILURE.to_string()));
        let counters = f.memory.tool_counters();
        assert_eq!(counters.usage(KEY_PARSE_ERROR), 1);
        assert_eq!(counters.success(KEY_PARSE_ERROR), 0);
        assert_eq!(counters.tool_usage.len(), 1);
    }

    #[tokio::test]
    async fn test_direct_response() {
        let mock = Arc::new(
            MockLlmClient::new()
                .with_rule("knowledge base", "N/A")
                .with_rule("execute tasks", r#"{"directResponse": true, "responseContent": "X"}"#),
        );
        let f = fixture(Some(mock));
        assert_eq!(f.engine.execute_task("Check in").await, (true, "X".to_string()));
        let counters = f.memory.tool_counters();
        assert_eq!(counters.usage(KEY_DIRECT_RESPONSE), 1);
        assert_eq!(counters.success(KEY_DIRECT_RESPONSE), 1);
    }

    #[tokio::test]
    async fn test_tool_call_with_kb_context() {
        let mock = Arc::new(
            MockLlmClient::new()
                .with_rule("knowledge base", "Query KB for joy")
                .with_rule(
                    "execute tasks",
                    r#"{"tool_name": "echo", "tool_args": {"text": "joy noted"}}"#,
                ),
        );
        let f = fixture(Some(mock.clone()));
        assert_eq!(f.engine.execute_task("Describe joy").await, (true, "joy noted".to_string()));

        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].user_prompt.contains("Concept: Joy - Positive affect"));
        assert!(requests[1].structured_output);
        assert_eq!(f.memory.tool_counters().success("echo"), 1);
    }

    #[tokio::test]
    async fn test_tool_failure_and_unclear() {
        let mock = Arc::new(MockLlmClient::new().with_rule("knowledge base", "N/A"));
        mock.push_reply("N/A");
        mock.push_reply(r#"{"tool_name": "teleport", "tool_args": {}}"#);
        mock.push_reply("N/A");
        mock.push_reply(r#"{"thought": "unsure"}"#);
        let f = fixture(Some(mock));

        let (ok, output) = f.engine.execute_task("Go to Mars").await;
        assert!(!ok);
        assert_eq!(output, "Error calling tool 'teleport': Tool 'teleport' not found");

        assert_eq!(
            f.engine.execute_task("Ponder").await,
            (false, UNCLEAR_DECISION.to_string())
        );

        let counters = f.memory.tool_counters();
        assert_eq!(counters.usage("teleport"), 1);
        assert_eq!(counters.success("teleport"), 0);
        assert_eq!(counters.usage(KEY_UNCLEAR), 1);
    }

    #[tokio::test]
    async fn test_decision_transport_error_counts_as_parse_failure() {
        let mock = Arc::new(
            MockLlmClient::new()
                .with_rule("knowledge base", "N/A")
                .with_failing_rule("execute tasks", "timeout"),
        );
        let f = fixture(Some(mock));
        assert_eq!(f.engine.execute_task("x").await, (false, PARSE_FAILURE.to_string()));
        assert_eq!(f.memory.tool_counters().usage(KEY_PARSE_ERROR), 1);
    }

    /// 不联网的 search_web 替身
    struct CannedSearch;

    #[async_trait]
    impl Tool for CannedSearch {
        fn name(&self) -> &str {
            "search_web"
        }

        fn description(&self) -> &str {
            "Canned search results"
        }

        fn args_schema(&self) -> Vec<ArgSpec> {
            vec![ArgSpec::required("query", ArgKind::String, "Search query")]
        }

        async fn execute(&self, args: Value) -> Result<String, String> {
            Ok(format!("results for {}", args["query"].as_str().unwrap_or_default()))
        }
    }

    #[tokio::test]
    async fn test_repeated_search_counts_each_attempt() {
        let mock = Arc::new(
            MockLlmClient::new()
                .with_rule("knowledge base", "N/A")
                .with_rule(
                    "execute tasks",
                    r#"{"tool_name": "search_web", "tool_args": {"query": "rust"}}"#,
                ),
        );
        let mut registry = ToolRegistry::new();
        registry.register(CannedSearch);
        let f = fixture_with(Some(mock), registry);

        for _ in 0..2 {
            assert_eq!(
                f.engine.execute_task("Find rust news").await,
                (true, "results for rust".to_string())
            );
        }
        let counters = f.memory.tool_counters();
        assert_eq!(counters.usage("search_web"), 2);
        assert_eq!(counters.success("search_web"), 2);
        assert_eq!(counters.tool_usage.len(), 1);
    }
}
