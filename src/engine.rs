//! Engine - the caller-facing facade
//!
//! Owns the registries, the agent store and the cognitive tracker, and wires
//! them into the task executor. Cheap to share behind an `Arc`.

use crate::config::EngineConfig;
use deeptree_agent::{Agent, AgentStore, ExecOptions, TaskExecutor};
use deeptree_cognition::state::{COGNITIVE_BACKEND, PLUGIN_REGISTRY, TOOL_REGISTRY};
use deeptree_cognition::{
    CapabilityProbe, CognitiveBackend, CognitiveTracker, DeepTreeEchoState, DiagnosticInputs,
    DiagnosticResult, IntrospectionResult, LocalEchoBackend, SalienceWeights, Scanner,
};
use deeptree_core::{AgentId, AgentType, Error, Result, Task, TaskResult};
use deeptree_tools::{CapabilityInfo, Plugin, PluginRegistry, Tool, ToolRegistry};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub struct Engine {
    config: EngineConfig,
    tools: Arc<RwLock<ToolRegistry>>,
    plugins: Arc<RwLock<PluginRegistry>>,
    store: Arc<AgentStore>,
    tracker: Arc<CognitiveTracker>,
    backend: Arc<dyn CognitiveBackend>,
    scanner: Arc<Scanner>,
    executor: TaskExecutor,
}

impl Engine {
    /// Engine with the local deterministic backend.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_backend(config, Arc::new(LocalEchoBackend))
    }

    pub fn with_backend(config: EngineConfig, backend: Arc<dyn CognitiveBackend>) -> Result<Self> {
        config.validate()?;
        let scanner = Arc::new(Scanner::new(config.introspection.clone())?);
        let tools = Arc::new(RwLock::new(ToolRegistry::new()));
        let plugins = Arc::new(RwLock::new(PluginRegistry::new()));
        let store = Arc::new(AgentStore::new(config.agents.clone()));
        let tracker = Arc::new(CognitiveTracker::new(
            config.cognition.clone(),
            config.graph.clone(),
        ));
        let executor = TaskExecutor::new(
            store.clone(),
            tools.clone(),
            plugins.clone(),
            tracker.clone(),
            backend.clone(),
            config.execution.clone(),
        );
        info!("Engine created (backend {})", backend.name());
        Ok(Self { config, tools, plugins, store, tracker, backend, scanner, executor })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // --- Capabilities ---

    pub async fn register_tool(&self, tool: Arc<dyn Tool>) -> Result<()> {
        self.tools.write().await.register(tool)
    }

    pub async fn register_plugin(&self, plugin: Arc<dyn Plugin>) -> Result<()> {
        self.plugins.write().await.register(plugin)
    }

    /// Register the builtin tools, with file tools confined to `workspace_root`.
    pub async fn register_default_tools(&self, workspace_root: impl AsRef<Path>) -> Result<()> {
        let mut tools = self.tools.write().await;
        deeptree_tools::register_default_tools(&mut tools, workspace_root)?;
        info!("{} tools registered", tools.len());
        Ok(())
    }

    pub async fn register_default_plugins(&self) -> Result<()> {
        let mut plugins = self.plugins.write().await;
        deeptree_tools::register_default_plugins(&mut plugins)?;
        info!("{} plugins registered", plugins.len());
        Ok(())
    }

    pub async fn available_tools(&self) -> Vec<CapabilityInfo> {
        self.tools.read().await.capabilities()
    }

    pub async fn available_plugins(&self) -> Vec<CapabilityInfo> {
        self.plugins.read().await.capabilities()
    }

    // --- Agents ---

    pub fn create_specialized_agent(&self, agent_type: AgentType, label: &str) -> Agent {
        self.store.create(agent_type, label)
    }

    /// Create an agent from a type name such as `"reflective"`.
    pub fn create_agent_named(&self, type_name: &str, label: &str) -> Result<Agent> {
        let agent_type = type_name.parse::<AgentType>()?;
        Ok(self.store.create(agent_type, label))
    }

    pub async fn get_agent(&self, id: &AgentId) -> Result<Agent> {
        self.store.get(id).await
    }

    pub async fn list_agents(&self) -> Vec<Agent> {
        self.store.list().await
    }

    // --- Tasks ---

    /// Execute with the configured default deadline and no cancellation.
    pub async fn execute_task(&self, task: &mut Task, agent: &Agent) -> TaskResult {
        self.executor.execute(task, agent, ExecOptions::default()).await
    }

    pub async fn execute_task_with(
        &self,
        task: &mut Task,
        agent: &Agent,
        opts: ExecOptions,
    ) -> TaskResult {
        self.executor.execute(task, agent, opts).await
    }

    // --- Cognitive state ---

    async fn probes(&self) -> Vec<CapabilityProbe> {
        let tools = !self.tools.read().await.is_empty();
        let plugins = !self.plugins.read().await.is_empty();
        vec![
            CapabilityProbe::new(TOOL_REGISTRY, tools),
            CapabilityProbe::new(PLUGIN_REGISTRY, plugins),
            CapabilityProbe::new(COGNITIVE_BACKEND, self.backend.is_available().await).required(),
        ]
    }

    /// Reset the cognitive state and probe integrations. On
    /// `CapabilityUnavailable` the engine keeps running in a degraded state.
    pub async fn initialize_deep_tree_echo(&self) -> Result<()> {
        let probes = self.probes().await;
        let result = self.tracker.initialize(&probes).await;
        if let Err(e) = &result {
            warn!("DeepTreeEcho initialized degraded: {}", e);
        }
        result
    }

    pub async fn refresh_deep_tree_echo_status(&self) -> Result<()> {
        let probes = self.probes().await;
        let result = self.tracker.refresh_status(&probes).await;
        if let Err(e) = &result {
            warn!("DeepTreeEcho refresh degraded: {}", e);
        }
        result
    }

    pub async fn deep_tree_echo(&self) -> DeepTreeEchoState {
        self.tracker.snapshot().await
    }

    pub async fn run_diagnostics(&self) -> DiagnosticResult {
        let inputs = DiagnosticInputs {
            tools: self.tools.read().await.len(),
            plugins: self.plugins.read().await.len(),
            agents: self.store.len(),
        };
        self.tracker.run_diagnostics(&inputs).await
    }

    /// Score the tree under `root` and fold its salient files into the
    /// memory graph. The walk runs on the blocking pool.
    pub async fn perform_introspection(
        &self,
        root: impl AsRef<Path>,
        coherence_weight: f64,
        novelty_weight: f64,
    ) -> Result<IntrospectionResult> {
        let weights = SalienceWeights::new(coherence_weight, novelty_weight)?;
        let scanner = self.scanner.clone();
        let root = root.as_ref().to_path_buf();
        let cognitive_snapshot = tokio::task::spawn_blocking(move || scanner.scan(&root, weights))
            .await
            .map_err(|e| Error::Internal(format!("introspection task failed: {}", e)))??;
        let echo_integration = self.tracker.fold_introspection(&cognitive_snapshot).await;
        Ok(IntrospectionResult { cognitive_snapshot, echo_integration })
    }
}
