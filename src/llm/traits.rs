//! 文本补全能力抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / Mock）实现 LlmClient::complete。
//! 客户端由进程入口构造一次，以 `Option<Arc<dyn LlmClient>>` 显式传给 Planner / TaskEngine / MemoryStore；
//! None 即「未配置」，各调用方走自己的降级路径。

use async_trait::async_trait;
use thiserror::Error;

/// 一次补全请求：system + user prompt、模型、温度、token 上限、是否要求 JSON 对象输出
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub structured_output: bool,
}

impl CompletionRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            model: String::new(),
            temperature: 0.7,
            max_tokens: 500,
            structured_output: false,
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn structured(mut self) -> Self {
        self.structured_output = true;
        self
    }
}

/// 补全失败（传输 / 认证 / 超时）；调用方一律降级，不向上传播
#[derive(Error, Debug, Clone)]
pub enum LlmError {
    #[error("LLM client not configured")]
    NotConfigured,

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Empty response")]
    EmptyResponse,
}

/// 文本补全 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式补全，返回首条回复文本
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
