//! Agent and execution configuration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Context items kept per agent before the oldest are evicted.
    pub context_capacity: usize,
    /// Memory entries kept per agent. Unbounded when unset.
    pub memory_capacity: Option<usize>,
    /// Most recent context items handed to handlers.
    pub handler_context_items: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Deadline applied when the caller supplies none.
    pub default_timeout_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { context_capacity: 32, memory_capacity: None, handler_context_items: 4 }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self { default_timeout_ms: 30_000 }
    }
}
