//! 认知层：Dispatcher、Reflector、可插拔检索与编排主循环

pub mod dispatcher;
pub mod loop_;
pub mod reflector;
pub mod retrieval;

pub use dispatcher::{parse_dispatch, DispatchOutcome, Dispatcher, DEFAULT_DISPATCH_PROMPT, TRIGGER_MARKER};
pub use loop_::run_task;
pub use reflector::{parse_reflection, Reflector, DEFAULT_REFLECT_PROMPT, DEGRADED_INSIGHT};
pub use retrieval::{MockRetriever, Retriever, StaticRetriever, MOCK_COLLECTIONS};
