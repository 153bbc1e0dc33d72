//! LLM 层：文本补全能力抽象与实现（OpenAI 兼容 / DeepSeek / Mock）

pub mod deepseek;
pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

pub use deepseek::{create_deepseek_client, DeepSeekClient, DEEPSEEK_CHAT, DEEPSEEK_REASONER};
pub use mock::MockLlmClient;
pub use openai::OpenAiClient;
pub use traits::{CompletionRequest, LlmClient, LlmError};

use crate::config::AppConfig;

/// 根据配置与环境变量构造补全能力；无可用 API Key 时返回 None（调用方进入降级模式）
///
/// - provider = mock：离线 MockLlmClient
/// - provider = deepseek：需要 DEEPSEEK_API_KEY（或 OPENAI_API_KEY）
/// - 其它：需要 OPENAI_API_KEY，可配 base_url
pub fn create_llm_from_config(cfg: &AppConfig) -> Option<Arc<dyn LlmClient>> {
    let provider = cfg.llm.provider.to_lowercase();
    let timeout = cfg.llm.request_timeout_secs;

    match provider.as_str() {
        "mock" => {
            tracing::info!("Using offline mock LLM");
            Some(Arc::new(MockLlmClient::offline()))
        }
        "deepseek" => {
            let key = std::env::var("DEEPSEEK_API_KEY").or_else(|_| std::env::var("OPENAI_API_KEY"));
            let Ok(key) = key else {
                tracing::warn!("DEEPSEEK_API_KEY not set; running in degraded mode");
                return None;
            };
            tracing::info!("Using DeepSeek LLM");
            Some(Arc::new(create_deepseek_client(None, &key, timeout)))
        }
        _ => match std::env::var("OPENAI_API_KEY") {
            Ok(key) => {
                tracing::info!(model = %cfg.llm.task_model, "Using OpenAI LLM");
                Some(Arc::new(OpenAiClient::new(
                    cfg.llm.base_url.as_deref(),
                    &cfg.llm.task_model,
                    &key,
                    timeout,
                )))
            }
            Err(_) => {
                tracing::warn!("OPENAI_API_KEY not set; planning, reflection and task execution run in degraded mode");
                None
            }
        },
    }
}
