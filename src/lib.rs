//! Spark - 智能体调度面板
//!
//! 模块划分：
//! - **agent**: Dispatcher、Reflector、可插拔检索与编排主循环
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 状态机、日志缓冲、会话上下文、复位计时、主控循环
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Gemini / Mock）
//! - **observability**: tracing 初始化
//! - **ui**: Ratatui TUI 界面

pub mod agent;
pub mod config;
pub mod core;
pub mod llm;
pub mod observability;
pub mod ui;

pub use crate::core::{Session, SessionBuilder};
