//! Dispatcher：把自由文本指令分为「转交 Maestro」或「直接回答」
//!
//! 调用 LLM 得到回复；parse_dispatch 在回复中查找触发标记，标记之后的文本即规范化指令。

use std::sync::Arc;

use crate::core::AgentError;
use crate::llm::{LlmClient, Message};

/// 模型在需要转交时输出的固定前缀
pub const TRIGGER_MARKER: &str = ">>> MAESTRO_TRIGGER:";

/// 内置调度提示词；`{task}` 替换为用户指令
pub const DEFAULT_DISPATCH_PROMPT: &str = r#"You are Spark, the elite dispatcher connected to the FazAI socket.

ORDER: "{task}"

RULES:
1. If the order requires changing the system (create files, install packages, monitor, networking), hand it to the MAESTRO.
   -> Output: >>> MAESTRO_TRIGGER: [normalized order]
2. If it is a knowledge question, text analysis or a doubt, answer directly in plain ASCII.

Think deeply before answering."#;

/// 调度结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 需要下游编排，内容为规范化后的指令
    Trigger(String),
    /// 可以直接回答，内容为回答文本
    Direct(String),
}

impl DispatchOutcome {
    pub fn content(&self) -> &str {
        match self {
            DispatchOutcome::Trigger(s) | DispatchOutcome::Direct(s) => s,
        }
    }
}

/// 解析模型回复：含标记则取第一个标记之后的内容（trim）为 Trigger，否则整段为 Direct
pub fn parse_dispatch(text: &str) -> DispatchOutcome {
    match text.split_once(TRIGGER_MARKER) {
        Some((_, rest)) => {
            let order = rest.split(TRIGGER_MARKER).next().unwrap_or(rest);
            DispatchOutcome::Trigger(order.trim().to_string())
        }
        None => DispatchOutcome::Direct(text.to_string()),
    }
}

/// Dispatcher：持有 LLM 与提示词模板
pub struct Dispatcher {
    llm: Arc<dyn LlmClient>,
    prompt_template: String,
}

impl Dispatcher {
    pub fn new(llm: Arc<dyn LlmClient>, prompt_template: impl Into<String>) -> Self {
        Self {
            llm,
            prompt_template: prompt_template.into(),
        }
    }

    pub fn prompt_for(&self, task: &str) -> String {
        self.prompt_template.replace("{task}", task)
    }

    /// 调用失败（网络 / 鉴权 / 空回复）直接上抛，由编排循环转为 ERROR
    pub async fn dispatch(&self, task: &str) -> Result<DispatchOutcome, AgentError> {
        let messages = vec![Message::user(self.prompt_for(task))];
        let text = self
            .llm
            .complete(&messages)
            .await
            .map_err(|e| AgentError::Dispatch(e.to_string()))?;
        Ok(parse_dispatch(&text))
    }
}
