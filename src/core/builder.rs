//! Session 构建器：统一的会话初始化逻辑
//!
//! TUI 与 spark-run 共用：从配置创建 LLM、读取提示词模板、选择检索实现。

use std::path::PathBuf;
use std::sync::Arc;

use crate::agent::{
    Dispatcher, MockRetriever, Reflector, Retriever, DEFAULT_DISPATCH_PROMPT,
    DEFAULT_REFLECT_PROMPT,
};
use crate::config::{load_config_or_default, AppConfig};
use crate::core::{Collaborators, ResetReceiver, Session};
use crate::llm::{create_llm_from_config, LlmClient};

/// 按顺序查找第一个存在的提示词文件
fn read_prompt(candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .find_map(|p| std::fs::read_to_string(p).ok())
}

/// 会话构建器：未显式指定的部件按配置创建
pub struct SessionBuilder {
    config: AppConfig,
    llm: Option<Arc<dyn LlmClient>>,
    retriever: Option<Arc<dyn Retriever>>,
    dispatch_prompt: Option<String>,
    reflect_prompt: Option<String>,
}

impl SessionBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            llm: None,
            retriever: None,
            dispatch_prompt: None,
            reflect_prompt: None,
        }
    }

    /// 指定 LLM（测试中传入脚本化客户端）
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// 指定检索实现
    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// 从 config/prompts/ 加载提示词模板（文件不存在时保留内置模板）
    pub fn with_prompts_from_files(mut self) -> Self {
        self.dispatch_prompt =
            read_prompt(&["config/prompts/dispatch.md", "../config/prompts/dispatch.md"]);
        self.reflect_prompt =
            read_prompt(&["config/prompts/reflect.md", "../config/prompts/reflect.md"]);
        self
    }

    pub fn build(self) -> (Session, ResetReceiver) {
        let llm = self
            .llm
            .unwrap_or_else(|| create_llm_from_config(&self.config));
        let retriever = self
            .retriever
            .unwrap_or_else(|| Arc::new(MockRetriever::new(self.config.timing.search_delay())));

        let collaborators = Collaborators {
            dispatcher: Dispatcher::new(
                llm.clone(),
                self.dispatch_prompt
                    .unwrap_or_else(|| DEFAULT_DISPATCH_PROMPT.to_string()),
            ),
            reflector: Reflector::new(
                llm,
                self.reflect_prompt
                    .unwrap_or_else(|| DEFAULT_REFLECT_PROMPT.to_string()),
            ),
            retriever,
        };

        Session::new(
            self.config.agent.clone(),
            self.config.timing.clone(),
            self.config.app.log_capacity,
            collaborators,
        )
    }
}

/// 便捷函数：从默认路径加载配置并创建 SessionBuilder
pub fn create_session_builder(config_path: Option<PathBuf>) -> SessionBuilder {
    SessionBuilder::new(load_config_or_default(config_path)).with_prompts_from_files()
}
