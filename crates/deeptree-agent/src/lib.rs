//! DeepTree Agent - agent store and task execution

pub mod config;
pub mod context;
pub mod runtime;
pub mod state;
pub mod store;

pub use config::{AgentConfig, ExecutionConfig};
pub use context::{ContextItem, ContextRole, ContextWindow};
pub use runtime::{ExecOptions, TaskExecutor};
pub use state::{Agent, AgentState, MemoryEntry};
pub use store::AgentStore;
pub use tokio_util::sync::CancellationToken;
