//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Gemini / Mock）

pub mod gemini;
pub mod message;
pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use crate::config::AppConfig;

pub use gemini::{create_gemini_client, gemini_api_key, GEMINI_BASE_URL, GEMINI_PRO_PREVIEW};
pub use message::{Message, Role};
pub use mock::{MockLlmClient, ScriptedLlmClient};
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{LlmClient, LlmError};

/// 根据配置选择 LLM 后端（Gemini / OpenAI 兼容 / Mock）
///
/// 未设置 API Key 不会导致启动失败：凭据为空字符串，错误在首次调用时以协作方失败的形式出现。
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    match cfg.llm.provider.to_lowercase().as_str() {
        "mock" => {
            tracing::info!("Using Mock LLM");
            Arc::new(MockLlmClient)
        }
        "openai" => {
            let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
            tracing::info!("Using OpenAI-compatible LLM ({})", cfg.llm.model);
            Arc::new(OpenAiClient::new(
                cfg.llm.base_url.as_deref(),
                &cfg.llm.model,
                &api_key,
            ))
        }
        other => {
            if other != "gemini" {
                tracing::warn!("Unknown provider '{}', falling back to Gemini", other);
            }
            tracing::info!("Using Gemini LLM ({})", cfg.llm.model);
            Arc::new(create_gemini_client(
                cfg.llm.base_url.as_deref(),
                Some(&cfg.llm.model),
            ))
        }
    }
}
