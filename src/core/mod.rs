//! 核心层：错误、状态、日志缓冲、会话上下文、复位计时、主控循环

pub mod builder;
pub mod error;
pub mod log_buffer;
pub mod orchestrator;
pub mod reset;
pub mod session;
pub mod state;

pub use builder::{create_session_builder, SessionBuilder};
pub use error::AgentError;
pub use log_buffer::{LogBuffer, LogEntry, LogLevel};
pub use orchestrator::{create_agent, spawn_session, Command};
pub use reset::{ResetReceiver, ResetTimer, RunId};
pub use session::{Collaborators, RunOutcome, Session};
pub use state::{AgentState, AgentStatus, Reflection, SessionSnapshot, VectorPoint};
