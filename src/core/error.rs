//! Agent 错误类型
//!
//! 均属于「协作方失败」：远端模型或检索后端的网络、鉴权、响应格式错误。

use thiserror::Error;

/// 一次运行中可能出现的错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    #[error("Reflection failed: {0}")]
    Reflection(String),

    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
