//! Reflector：检索结果反思
//!
//! 把任务与检索命中交给 LLM，要求返回 JSON 判断（是否有效、关键洞见、是否继续、下一步、置信度）。
//! 传输失败与 JSON 解析失败都以 AgentError::Reflection 返回；是否降级由编排循环按配置决定。

use std::sync::Arc;

use serde::Deserialize;

use crate::core::{AgentError, Reflection, VectorPoint};
use crate::llm::{LlmClient, Message};

/// 降级记录使用的固定洞见文本
pub const DEGRADED_INSIGHT: &str = "Reflection unavailable";

/// 内置反思提示词；`{context}` 为任务文本，`{results}` 为检索命中的 JSON
pub const DEFAULT_REFLECT_PROMPT: &str = r#"You are the agentic reflection system of FazAI.
Analyse the Qdrant results and the current context.

CONTEXT: {context}
RESULTS: {results}

Reply strictly in JSON:
{
  "was_productive": boolean,
  "key_insight": "main insight in plain ASCII",
  "should_continue": boolean,
  "next_action": "recommended next action",
  "confidence": 0.0-1.0
}"#;

/// 模型回复的 JSON 形状；缺失字段取默认值
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ReflectionReply {
    was_productive: bool,
    key_insight: String,
    should_continue: bool,
    next_action: String,
    confidence: f32,
}

/// 从文本中取出 JSON 块（```json ... ``` 或首尾花括号之间）
fn extract_json(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return Some(rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim()));
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end > start).then(|| &trimmed[start..=end])
}

/// 单遍替换占位符：已填入的文本不会再被扫描
fn fill_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some((at, key, value)) = vars
        .iter()
        .filter_map(|(key, value)| rest.find(key).map(|at| (at, *key, *value)))
        .min_by_key(|(at, _, _)| *at)
    {
        out.push_str(&rest[..at]);
        out.push_str(value);
        rest = &rest[at + key.len()..];
    }
    out.push_str(rest);
    out
}

/// 解析回复为第 iteration 轮的 Reflection
pub fn parse_reflection(text: &str, iteration: usize) -> Result<Reflection, AgentError> {
    let json = extract_json(text)
        .ok_or_else(|| AgentError::Parse(format!("no JSON object in reply: {}", text.trim())))?;
    let reply: ReflectionReply =
        serde_json::from_str(json).map_err(|e| AgentError::Parse(format!("{}: {}", e, json)))?;
    let confidence = if reply.confidence.is_finite() {
        reply.confidence.clamp(0.0, 1.0)
    } else {
        0.0
    };
    Ok(Reflection {
        iteration,
        was_productive: reply.was_productive,
        key_insight: reply.key_insight,
        next_action: reply.next_action,
        should_continue: reply.should_continue,
        confidence,
    })
}

impl Reflection {
    /// 反思失败时的占位记录
    pub fn degraded(iteration: usize) -> Self {
        Self {
            iteration,
            was_productive: false,
            key_insight: DEGRADED_INSIGHT.to_string(),
            next_action: String::new(),
            should_continue: false,
            confidence: 0.0,
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.was_productive && self.key_insight == DEGRADED_INSIGHT
    }
}

/// Reflector：持有 LLM 与 prompt 模板
pub struct Reflector {
    llm: Arc<dyn LlmClient>,
    prompt_template: String,
}

impl Reflector {
    pub fn new(llm: Arc<dyn LlmClient>, prompt_template: impl Into<String>) -> Self {
        Self {
            llm,
            prompt_template: prompt_template.into(),
        }
    }

    pub fn prompt_for(&self, context: &str, results: &[VectorPoint]) -> String {
        let results = serde_json::to_string(results).unwrap_or_else(|_| "[]".to_string());
        fill_template(
            &self.prompt_template,
            &[("{context}", context), ("{results}", results.as_str())],
        )
    }

    pub async fn reflect(
        &self,
        context: &str,
        results: &[VectorPoint],
        iteration: usize,
    ) -> Result<Reflection, AgentError> {
        let messages = vec![Message::user(self.prompt_for(context, results))];
        let text = self
            .llm
            .complete(&messages)
            .await
            .map_err(|e| AgentError::Reflection(e.to_string()))?;
        parse_reflection(&text, iteration).map_err(|e| AgentError::Reflection(e.to_string()))
    }
}
