//! Mock LLM 客户端（用于测试与离线演示，无需 API）
//!
//! - MockLlmClient：根据提示词类型给出固定回复（调度提示返回 trigger，反思提示返回 JSON）
//! - ScriptedLlmClient：按队列依次返回预设结果，便于测试失败路径

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, Message, Role};

/// Mock 客户端：不访问网络
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        if last_user.contains("\"was_productive\"") {
            return Ok(r#"{"was_productive": true, "key_insight": "Mock insight from retrieved context", "should_continue": true, "next_action": "review the retrieved settings", "confidence": 0.8}"#.to_string());
        }

        let task = last_user
            .lines()
            .find_map(|l| l.trim().strip_prefix("ORDER:"))
            .map(|t| t.trim().trim_matches('"').to_string())
            .unwrap_or_else(|| last_user.trim().to_string());
        Ok(format!(">>> MAESTRO_TRIGGER: {}", task))
    }
}

/// 脚本化客户端：每次 complete 弹出队首结果；队列耗尽时返回 EmptyResponse
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlmClient {
    pub fn new(replies: impl IntoIterator<Item = Result<String, LlmError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 已发生的调用次数
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// 第 n 次调用收到的消息
    pub fn call(&self, n: usize) -> Option<Vec<Message>> {
        self.calls.lock().ok().and_then(|c| c.get(n).cloned())
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }
        self.replies
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or(Err(LlmError::EmptyResponse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_pops_in_order() {
        let llm = ScriptedLlmClient::new([Ok("a".to_string()), Err(LlmError::Network("down".into()))]);
        assert_eq!(llm.complete(&[Message::user("x")]).await.unwrap(), "a");
        assert_eq!(
            llm.complete(&[Message::user("y")]).await,
            Err(LlmError::Network("down".into()))
        );
        assert_eq!(llm.complete(&[]).await, Err(LlmError::EmptyResponse));
        assert_eq!(llm.call_count(), 3);
        assert_eq!(llm.call(1).unwrap()[0].content, "y");
    }

    #[tokio::test]
    async fn test_mock_answers_reflection_with_json() {
        let reply = MockLlmClient
            .complete(&[Message::user("Reply with {\"was_productive\": ...}")])
            .await
            .unwrap();
        assert!(reply.trim_start().starts_with('{'));
    }

    #[tokio::test]
    async fn test_mock_routes_orders() {
        let reply = MockLlmClient
            .complete(&[Message::user("ORDER: \"optimize kernel\"\n")])
            .await
            .unwrap();
        assert_eq!(reply, ">>> MAESTRO_TRIGGER: optimize kernel");
    }
}
