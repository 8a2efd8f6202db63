//! Tool and plugin registries and trait definitions
//!
//! Each tool or plugin is a self-contained module implementing the `Tool` or
//! `Plugin` trait. Both kinds live in a [`Registry`], which binds each name
//! exactly once and enumerates names in lexical order.

use deeptree_core::{AgentId, Error, Parameters, Result};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Clone, Debug)]
pub enum ToolResult {
    Text(String),
    Json(Value),
    Error(String),
}

impl ToolResult {
    pub fn text(s: impl Into<String>) -> Self { Self::Text(s.into()) }
    pub fn error(s: impl Into<String>) -> Self { Self::Error(s.into()) }

    pub fn to_content_string(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Json(v) => serde_json::to_string_pretty(v).unwrap_or_default(),
            Self::Error(e) => format!("Error: {}", e),
        }
    }

    pub fn is_error(&self) -> bool { matches!(self, Self::Error(_)) }

    /// Convert into the handler output, attributing errors to `handler`.
    pub fn into_output(self, handler: &str) -> Result<String> {
        match self {
            Self::Error(e) => Err(Error::handler(handler, e)),
            other => Ok(other.to_content_string()),
        }
    }
}

impl From<Result<String>> for ToolResult {
    fn from(r: Result<String>) -> Self {
        match r {
            Ok(s) => Self::Text(s),
            Err(e) => Self::Error(e.to_string()),
        }
    }
}

/// What a handler is told about the task that invoked it.
#[derive(Clone, Debug)]
pub struct ToolContext {
    pub agent_id: AgentId,
    pub agent_name: String,
    pub task_id: String,
    pub input: String,
    /// Most recent context items of the calling agent, oldest first.
    pub recent_context: Vec<String>,
}

impl ToolContext {
    pub fn new(
        agent_id: AgentId,
        agent_name: impl Into<String>,
        task_id: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        Self {
            agent_id,
            agent_name: agent_name.into(),
            task_id: task_id.into(),
            input: input.into(),
            recent_context: Vec::new(),
        }
    }

    /// Context for direct invocation outside any agent.
    pub fn detached(input: impl Into<String>) -> Self {
        Self::new(AgentId::new("detached"), "detached", "direct", input)
    }

    pub fn with_recent_context(mut self, items: Vec<String>) -> Self {
        self.recent_context = items;
        self
    }

    /// `parameters["text"]` when given, otherwise the task input.
    pub fn text<'a>(&'a self, params: &'a Parameters) -> Result<&'a str> {
        Ok(params.opt_str("text")?.unwrap_or(&self.input))
    }
}

/// The Tool trait - implement this to add a new single-purpose capability.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name (e.g. "read", "glob").
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON Schema for input parameters.
    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    /// Whether this tool only reads state (no side effects).
    fn is_read_only(&self) -> bool { false }

    /// Whether this tool is currently enabled.
    fn is_enabled(&self) -> bool { true }

    async fn execute(&self, ctx: &ToolContext, params: &Parameters) -> ToolResult;

    /// Execute with cancellation support. Default: race execute() against cancellation.
    async fn execute_cancellable(
        &self,
        ctx: &ToolContext,
        params: &Parameters,
        cancel: CancellationToken,
    ) -> ToolResult {
        tokio::select! {
            result = self.execute(ctx, params) => result,
            _ = cancel.cancelled() => ToolResult::error("cancelled"),
        }
    }
}

/// The Plugin trait - a handler exposing several operations, selected by
/// `parameters["type"]`.
#[async_trait::async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Operation types this plugin accepts in `parameters["type"]`.
    fn operations(&self) -> &[&'static str];

    async fn execute(&self, ctx: &ToolContext, params: &Parameters) -> ToolResult;

    /// Resolve the requested operation, defaulting to the first advertised one.
    fn operation<'a>(&self, params: &'a Parameters) -> Result<&'a str>
    where
        Self: Sized,
    {
        resolve_operation(self.name(), self.operations(), params)
    }
}

pub(crate) fn resolve_operation<'a>(
    plugin: &str,
    operations: &[&'static str],
    params: &'a Parameters,
) -> Result<&'a str> {
    match params.opt_str("type")? {
        Some(op) if operations.iter().any(|o| *o == op) => Ok(op),
        Some(op) => Err(Error::InvalidParameter(format!(
            "plugin {} has no operation '{}' (available: {})",
            plugin,
            op,
            operations.join(", ")
        ))),
        None => operations
            .first()
            .copied()
            .ok_or_else(|| Error::Internal(format!("plugin {} advertises no operations", plugin))),
    }
}

/// Anything a [`Registry`] can hold.
pub trait Registrable: Send + Sync {
    /// Noun used in error messages ("tool", "plugin").
    const KIND: &'static str;

    fn registry_name(&self) -> &str;
    fn registry_description(&self) -> &str;

    /// Operations beyond the handler itself; empty for tools.
    fn registry_operations(&self) -> Vec<String> {
        Vec::new()
    }

    /// Parameter schema, when the handler publishes one.
    fn registry_schema(&self) -> Option<Value> {
        None
    }
}

impl Registrable for dyn Tool {
    const KIND: &'static str = "tool";

    fn registry_name(&self) -> &str { self.name() }
    fn registry_description(&self) -> &str { self.description() }
    fn registry_schema(&self) -> Option<Value> { Some(self.input_schema()) }
}

impl Registrable for dyn Plugin {
    const KIND: &'static str = "plugin";

    fn registry_name(&self) -> &str { self.name() }
    fn registry_description(&self) -> &str { self.description() }

    fn registry_operations(&self) -> Vec<String> {
        self.operations().iter().map(|s| s.to_string()).collect()
    }
}

/// One enumerated capability.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CapabilityInfo {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

/// Name → handler map. Names bind once; listing order is lexical.
pub struct Registry<T: ?Sized + Registrable> {
    entries: BTreeMap<String, Arc<T>>,
}

pub type ToolRegistry = Registry<dyn Tool>;
pub type PluginRegistry = Registry<dyn Plugin>;

impl<T: ?Sized + Registrable> Default for Registry<T> {
    fn default() -> Self { Self::new() }
}

impl<T: ?Sized + Registrable> Registry<T> {
    pub fn new() -> Self { Self { entries: BTreeMap::new() } }

    /// Bind a handler under its own name. Fails if the name is taken.
    pub fn register(&mut self, handler: Arc<T>) -> Result<()> {
        let name = handler.registry_name().to_string();
        if self.entries.contains_key(&name) {
            return Err(Error::duplicate(T::KIND, name));
        }
        debug!("registered {} '{}'", T::KIND, name);
        self.entries.insert(name, handler);
        Ok(())
    }

    /// Remove a handler by name.
    pub fn remove(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Result<Arc<T>> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found(T::KIND, name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn list(&self) -> Vec<&str> {
        self.entries.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn capabilities(&self) -> Vec<CapabilityInfo> {
        self.entries
            .values()
            .map(|h| CapabilityInfo {
                name: h.registry_name().to_string(),
                description: h.registry_description().to_string(),
                operations: h.registry_operations(),
                input_schema: h.registry_schema(),
            })
            .collect()
    }
}

impl Registry<dyn Tool> {
    pub fn add(&mut self, tool: impl Tool + 'static) -> Result<()> {
        self.register(Arc::new(tool))
    }

    pub async fn execute(&self, name: &str, ctx: &ToolContext, params: &Parameters) -> ToolResult {
        match self.entries.get(name) {
            Some(tool) if tool.is_enabled() => tool.execute(ctx, params).await,
            Some(_) => ToolResult::Error(format!("Tool '{}' is disabled", name)),
            None => ToolResult::Error(format!("Tool not found: {}", name)),
        }
    }

    /// List only read-only tools.
    pub fn list_read_only(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, t)| t.is_read_only())
            .map(|(k, _)| k.as_str())
            .collect()
    }
}

impl Registry<dyn Plugin> {
    pub fn add(&mut self, plugin: impl Plugin + 'static) -> Result<()> {
        self.register(Arc::new(plugin))
    }
}
