//! Mock LLM 客户端（用于测试与离线运行，无需 API）
//!
//! 回复来源按优先级：一次性队列 → 按 prompt 子串匹配的规则 → 默认回复。
//! 所有请求都会被记录，测试可断言调用次数与内容。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{CompletionRequest, LlmClient, LlmError};

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(String),
}

#[derive(Debug, Default)]
pub struct MockLlmClient {
    queue: Mutex<VecDeque<Reply>>,
    /// (needle, reply)：needle 出现在 system 或 user prompt 中即命中
    rules: Vec<(String, Reply)>,
    default_reply: Option<String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 离线演示用：规划出一个 echo 目标，知识库不适用，决策走 echo 工具
    pub fn offline() -> Self {
        Self::new()
            .with_rule(
                "strategic planner",
                r#"{"plan": "Keep the worker mind healthy", "goals": [{"description": "Report current status", "status": "pending"}]}"#,
            )
            .with_rule("knowledge base", "N/A")
            .with_rule(
                "execute tasks",
                r#"{"tool_name": "echo", "tool_args": {"text": "status: nominal"}}"#,
            )
            .with_default("Offline reflection: no notable issues.")
    }

    pub fn with_rule(mut self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        self.rules.push((needle.into(), Reply::Text(reply.into())));
        self
    }

    pub fn with_failing_rule(
        mut self,
        needle: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        self.rules.push((needle.into(), Reply::Fail(error.into())));
        self
    }

    pub fn with_default(mut self, reply: impl Into<String>) -> Self {
        self.default_reply = Some(reply.into());
        self
    }

    /// 追加一次性回复（先进先出，优先于规则）
    pub fn push_reply(&self, reply: impl Into<String>) {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Reply::Text(reply.into()));
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        let queued = self
            .queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        let reply = queued.or_else(|| {
            self.rules
                .iter()
                .find(|(needle, _)| {
                    request.system_prompt.contains(needle.as_str())
                        || request.user_prompt.contains(needle.as_str())
                })
                .map(|(_, reply)| reply.clone())
        });

        match reply {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(error)) => Err(LlmError::Request(error)),
            None => self
                .default_reply
                .clone()
                .ok_or_else(|| LlmError::Request("no mock reply configured".to_string())),
        }
    }
}
