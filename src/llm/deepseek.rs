//! DeepSeek 后端（OpenAI 兼容端点）
//!
//! 配置里的模型标签默认是 OpenAI 的（gpt-4o 等）。DeepSeek 不认这些名字，
//! 所以非 `deepseek-*` 的标签一律替换为客户端的默认模型。

use async_trait::async_trait;

use crate::llm::{CompletionRequest, LlmClient, LlmError, OpenAiClient};

pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEEPSEEK_CHAT: &str = "deepseek-chat";
pub const DEEPSEEK_REASONER: &str = "deepseek-reasoner";

pub struct DeepSeekClient {
    inner: OpenAiClient,
    model: String,
}

/// 模型未指定时读 `DEEPSEEK_MODEL`，再退回 deepseek-chat
pub fn create_deepseek_client(
    model: Option<&str>,
    api_key: &str,
    timeout_secs: u64,
) -> DeepSeekClient {
    let model = model
        .map(String::from)
        .or_else(|| std::env::var("DEEPSEEK_MODEL").ok())
        .unwrap_or_else(|| DEEPSEEK_CHAT.to_string());
    DeepSeekClient {
        inner: OpenAiClient::new(Some(DEEPSEEK_BASE_URL), &model, api_key, timeout_secs),
        model,
    }
}

impl DeepSeekClient {
    fn resolve_model<'a>(&'a self, requested: &'a str) -> &'a str {
        if requested.starts_with("deepseek") {
            requested
        } else {
            &self.model
        }
    }
}

#[async_trait]
impl LlmClient for DeepSeekClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let model = self.resolve_model(&request.model);
        if model == request.model {
            return self.inner.complete(request).await;
        }
        let request = request.clone().model(model);
        self.inner.complete(&request).await
    }

    fn token_usage(&self) -> (u64, u64, u64) {
        self.inner.token_usage()
    }
}
