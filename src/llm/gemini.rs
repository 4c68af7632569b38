//! Gemini API 客户端（OpenAI 兼容格式）
//!
//! Gemini 提供 OpenAI 兼容端点。
//! - Base URL: https://generativelanguage.googleapis.com/v1beta/openai/
//! - 模型: gemini-3-pro-preview（默认，思考模式）

use crate::llm::OpenAiClient;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai/";
pub const GEMINI_PRO_PREVIEW: &str = "gemini-3-pro-preview";

/// 读取 Gemini 凭据：`GEMINI_API_KEY` > `API_KEY` > 空字符串
pub fn gemini_api_key() -> String {
    std::env::var("GEMINI_API_KEY")
        .ok()
        .or_else(|| std::env::var("API_KEY").ok())
        .unwrap_or_default()
}

/// 创建 Gemini 客户端
///
/// - 凭据缺失时使用空字符串，失败推迟到第一次调用
/// - 模型可通过 `model` 参数或 `GEMINI_MODEL` 环境变量指定
pub fn create_gemini_client(base_url: Option<&str>, model: Option<&str>) -> OpenAiClient {
    let model = model
        .map(String::from)
        .or_else(|| std::env::var("GEMINI_MODEL").ok())
        .unwrap_or_else(|| GEMINI_PRO_PREVIEW.to_string());

    OpenAiClient::new(
        Some(base_url.unwrap_or(GEMINI_BASE_URL)),
        &model,
        &gemini_api_key(),
    )
}
