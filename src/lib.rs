//! DeepTreeEcho - agent orchestration with a self-model
//!
//! The [`Engine`] owns agents, capabilities and the cognitive state. The
//! member crates are re-exported so callers need only this one.

pub mod config;
pub mod engine;

pub use config::EngineConfig;
pub use engine::Engine;

pub use deeptree_agent as agent;
pub use deeptree_cognition as cognition;
pub use deeptree_tools as tools;

pub use deeptree_agent::{Agent, CancellationToken, ExecOptions};
pub use deeptree_core::{
    AgentId, AgentType, Error, ErrorKind, ParamValue, Parameters, Result, Task, TaskResult,
    TaskStatus, TaskType,
};
