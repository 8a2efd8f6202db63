//! Integration tests: the Engine facade end to end.
//!
//! Each test builds a fresh engine, registers the builtin capabilities where
//! it needs them, and drives agents, tasks, introspection and diagnostics
//! through the public API only.

use deeptree::cognition::{
    CheckStatus, CognitiveBackend, CoreStatus, EvolutionStage, IntegrationStatus, SystemHealth,
};
use deeptree::{
    AgentType, CancellationToken, Engine, EngineConfig, Error, ErrorKind, ExecOptions, Parameters,
    Task, TaskStatus, TaskType,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, body).unwrap();
}

fn project_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "Cargo.toml", "[package]\nname = \"echo\"\n");
    write(root, "README.md", "# echo\n");
    write(root, "src/lib.rs", "pub mod engine;\npub mod memory;\n");
    write(root, "src/engine.rs", "pub struct Engine;\n");
    write(root, "src/memory/mod.rs", "pub mod graph;\n");
    write(root, "src/memory/graph.rs", "pub struct Graph;\n");
    write(root, "docs/notes.txt", "notes\n");
    write(root, "target/debug/out.rs", "ignored");
    dir
}

async fn ready_engine(root: &Path) -> Engine {
    let engine = Engine::new(EngineConfig::default()).unwrap();
    engine.register_default_tools(root).await.unwrap();
    engine.register_default_plugins().await.unwrap();
    engine.initialize_deep_tree_echo().await.unwrap();
    engine
}

fn reflect(agent: &deeptree::Agent, input: &str) -> Task {
    Task::generated(TaskType::Reflect, input, agent.id.clone())
}

// ===========================================================================
// Introspection
// ===========================================================================

#[tokio::test]
async fn empty_directory_introspects_cleanly() {
    let dir = TempDir::new().unwrap();
    let engine = ready_engine(dir.path()).await;

    let result = engine.perform_introspection(dir.path(), 0.6, 0.4).await.unwrap();
    let snapshot = &result.cognitive_snapshot;
    assert_eq!(snapshot.processed_files, 0);
    assert!(snapshot.salient_files.is_empty());
    assert_eq!(result.echo_integration.nodes_created, 0);
}

#[tokio::test]
async fn missing_root_is_path_not_found() {
    let dir = TempDir::new().unwrap();
    let engine = ready_engine(dir.path()).await;

    let err = engine
        .perform_introspection(dir.path().join("nope"), 0.6, 0.4)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PathNotFound);
}

#[tokio::test]
async fn negative_weights_are_rejected() {
    let dir = project_tree();
    let engine = ready_engine(dir.path()).await;

    let err = engine.perform_introspection(dir.path(), -1.0, 0.4).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
}

#[tokio::test]
async fn salient_files_partition_and_order() {
    let dir = project_tree();
    let engine = ready_engine(dir.path()).await;

    let result = engine.perform_introspection(dir.path(), 0.6, 0.4).await.unwrap();
    let snapshot = &result.cognitive_snapshot;

    assert_eq!(snapshot.processed_files, 7);
    assert_eq!(
        snapshot.filtered_files + snapshot.salient_files.len(),
        snapshot.processed_files
    );
    assert!(!snapshot.salient_files.is_empty());
    for file in &snapshot.salient_files {
        assert!(file.salience >= snapshot.attention_threshold);
        assert!(!file.path.starts_with("target"));
    }
    for pair in snapshot.salient_files.windows(2) {
        assert!(pair[0].salience >= pair[1].salience);
    }
}

#[tokio::test]
async fn rescanning_an_unchanged_tree_is_stable() {
    let dir = project_tree();
    let engine = ready_engine(dir.path()).await;

    let first = engine.perform_introspection(dir.path(), 0.6, 0.4).await.unwrap();
    let second = engine.perform_introspection(dir.path(), 0.6, 0.4).await.unwrap();
    assert_eq!(first.cognitive_snapshot, second.cognitive_snapshot);
    // Folding the same snapshot twice adds nothing new.
    assert_eq!(second.echo_integration.nodes_created, 0);
    assert_eq!(second.echo_integration.edges_created, 0);
}

#[tokio::test]
async fn introspection_feeds_memory_resonance() {
    let dir = project_tree();
    let engine = ready_engine(dir.path()).await;

    let result = engine.perform_introspection(dir.path(), 0.6, 0.4).await.unwrap();
    let state = engine.deep_tree_echo().await;
    assert_eq!(state.memory_resonance.memory_nodes, result.echo_integration.nodes_created);
    assert_eq!(state.recursive_depth, result.echo_integration.tree_depth);

    // The evolution stage moves on refresh, not on the fold itself.
    assert_eq!(state.evolution_timeline.current_stage, EvolutionStage::Nascent);
    engine.refresh_deep_tree_echo_status().await.unwrap();
    let state = engine.deep_tree_echo().await;
    assert_eq!(state.evolution_timeline.current_stage, EvolutionStage::Emerging);
}

// ===========================================================================
// Tasks
// ===========================================================================

#[tokio::test]
async fn nonexistent_plugin_fails_with_not_found() {
    let dir = TempDir::new().unwrap();
    let engine = ready_engine(dir.path()).await;
    let agent = engine.create_specialized_agent(AgentType::Specialist, "analyst");

    let mut task = Task::generated(TaskType::Plugin, "some input", agent.id.clone())
        .with_param("plugin_name", "nonexistent");
    let result = engine.execute_task(&mut task, &agent).await;

    assert_eq!(result.status, TaskStatus::Failed);
    assert_eq!(result.error_kind(), Some(ErrorKind::NotFound));
    assert!(result.output.is_empty());
    assert_eq!(task.status(), TaskStatus::Failed);
}

#[tokio::test]
async fn results_are_exactly_one_of_output_or_error() {
    let dir = project_tree();
    let engine = ready_engine(dir.path()).await;
    let agent = engine.create_specialized_agent(AgentType::General, "worker");

    let tasks = vec![
        reflect(&agent, "What am I becoming?"),
        Task::generated(TaskType::ToolCall, "count these words", agent.id.clone())
            .with_param("tool_name", "text_stats"),
        Task::generated(TaskType::ToolCall, "x", agent.id.clone()).with_param("tool_name", "missing"),
        Task::generated(TaskType::Analyze, "", agent.id.clone()),
        Task::generated(TaskType::Plugin, "Trees echo. Echoes grow.", agent.id.clone())
            .with_param("plugin_name", "data_analysis")
            .with_param("type", "hypergraph_analysis"),
    ];
    for mut task in tasks {
        let result = engine.execute_task(&mut task, &agent).await;
        match result.status {
            TaskStatus::Completed => {
                assert!(!result.output.is_empty());
                assert!(result.error.is_none());
            }
            TaskStatus::Failed => {
                assert!(result.error.is_some());
                assert!(result.output.is_empty());
            }
            other => panic!("unexpected terminal status {other}"),
        }
    }
}

#[tokio::test]
async fn thought_count_tracks_completed_cognitive_tasks() {
    let dir = project_tree();
    let engine = ready_engine(dir.path()).await;
    let agent = engine.create_specialized_agent(AgentType::Reflective, "mirror");

    let mut ok = reflect(&agent, "Consider the shape of memory.");
    assert!(engine.execute_task(&mut ok, &agent).await.is_completed());
    assert_eq!(engine.deep_tree_echo().await.thought_count, 1);

    let mut bad = reflect(&agent, "Consider again.").with_param("depth_level", "bottomless");
    let result = engine.execute_task(&mut bad, &agent).await;
    assert_eq!(result.error_kind(), Some(ErrorKind::InvalidParameter));
    assert_eq!(engine.deep_tree_echo().await.thought_count, 1);

    let mut tool = Task::generated(TaskType::ToolCall, "plain words", agent.id.clone())
        .with_param("tool_name", "text_stats");
    assert!(engine.execute_task(&mut tool, &agent).await.is_completed());
    assert_eq!(engine.deep_tree_echo().await.thought_count, 1);

    let mut analyze = Task::generated(TaskType::Analyze, "Echoes within echoes.", agent.id.clone());
    assert!(engine.execute_task(&mut analyze, &agent).await.is_completed());
    assert_eq!(engine.deep_tree_echo().await.thought_count, 2);
}

#[tokio::test]
async fn failed_tasks_leave_agent_state_untouched() {
    let dir = project_tree();
    let engine = ready_engine(dir.path()).await;
    let agent = engine.create_specialized_agent(AgentType::General, "steady");

    let mut ok = reflect(&agent, "First light.");
    assert!(engine.execute_task(&mut ok, &agent).await.is_completed());
    let before = engine.get_agent(&agent.id).await.unwrap();
    assert_eq!(before.state.memory.len(), 1);
    assert_eq!(before.state.context.len(), 2);

    let mut missing = Task::generated(TaskType::Plugin, "x", agent.id.clone())
        .with_param("plugin_name", "nonexistent");
    assert!(!engine.execute_task(&mut missing, &agent).await.is_completed());

    let after = engine.get_agent(&agent.id).await.unwrap();
    assert_eq!(after.state, before.state);
}

#[tokio::test]
async fn concurrent_tasks_on_one_agent_lose_no_updates() {
    let dir = project_tree();
    let engine = Arc::new(ready_engine(dir.path()).await);
    let agent = engine.create_specialized_agent(AgentType::Orchestrator, "hub");

    let mut handles = Vec::new();
    for i in 0..8 {
        let engine = engine.clone();
        let agent = agent.clone();
        handles.push(tokio::spawn(async move {
            let mut task = if i % 2 == 0 {
                reflect(&agent, &format!("Reflection number {i}."))
            } else {
                Task::generated(TaskType::Plugin, "x", agent.id.clone())
                    .with_param("plugin_name", "nonexistent")
            };
            engine.execute_task(&mut task, &agent).await.is_completed()
        }));
    }
    let completed = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(completed, 4);
    let agent = engine.get_agent(&agent.id).await.unwrap();
    assert_eq!(agent.state.memory.len(), completed);
    assert_eq!(agent.state.context.len(), completed * 2);
    assert_eq!(engine.deep_tree_echo().await.thought_count, completed as u64);
}

#[tokio::test]
async fn task_for_another_agent_is_rejected() {
    let dir = TempDir::new().unwrap();
    let engine = ready_engine(dir.path()).await;
    let a = engine.create_specialized_agent(AgentType::General, "a");
    let b = engine.create_specialized_agent(AgentType::General, "b");

    let mut task = reflect(&a, "meant for a");
    let result = engine.execute_task(&mut task, &b).await;
    assert_eq!(result.error_kind(), Some(ErrorKind::AgentMismatch));
    assert!(engine.get_agent(&b.id).await.unwrap().state.memory.is_empty());
}

#[tokio::test]
async fn cancelled_task_fails_without_side_effects() {
    let dir = TempDir::new().unwrap();
    let engine = ready_engine(dir.path()).await;
    let agent = engine.create_specialized_agent(AgentType::General, "quiet");

    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut task = reflect(&agent, "never runs");
    let result = engine
        .execute_task_with(
            &mut task,
            &agent,
            ExecOptions::default()
                .with_cancel(cancel)
                .with_deadline(Duration::from_secs(5)),
        )
        .await;
    assert_eq!(result.error_kind(), Some(ErrorKind::Cancelled));
    assert!(engine.get_agent(&agent.id).await.unwrap().state.memory.is_empty());
    assert_eq!(engine.deep_tree_echo().await.thought_count, 0);
}

// ===========================================================================
// Agents
// ===========================================================================

#[tokio::test]
async fn named_agent_creation() {
    let engine = Engine::new(EngineConfig::default()).unwrap();

    let agent = engine.create_agent_named("Reflective", "echo").unwrap();
    assert_eq!(agent.agent_type, AgentType::Reflective);
    assert_eq!(agent.name, "reflective-echo");

    let err = engine.create_agent_named("oracle", "x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedAgentType);

    let listed = engine.list_agents().await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, agent.id);
}

#[tokio::test]
async fn unknown_agent_lookup_is_not_found() {
    let engine = Engine::new(EngineConfig::default()).unwrap();
    let err = engine
        .get_agent(&deeptree::AgentId::new("ghost"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ===========================================================================
// Cognitive state and diagnostics
// ===========================================================================

#[tokio::test]
async fn fresh_engine_is_dormant() {
    let engine = Engine::new(EngineConfig::default()).unwrap();
    let state = engine.deep_tree_echo().await;
    assert!(!state.initialized);
    assert_eq!(state.core_status, CoreStatus::Dormant);
    assert_eq!(state.evolution_timeline.current_stage, EvolutionStage::Nascent);
}

#[tokio::test]
async fn initialize_connects_registered_capabilities() {
    let dir = TempDir::new().unwrap();
    let engine = ready_engine(dir.path()).await;

    let state = engine.deep_tree_echo().await;
    assert!(state.initialized);
    assert_eq!(state.system_health, SystemHealth::Healthy);
    assert_eq!(state.core_status, CoreStatus::Active);
    assert!(state
        .integrations
        .values()
        .all(|i| i.status == IntegrationStatus::Connected));
    assert_eq!(engine.available_tools().await.len(), 4);
    assert_eq!(engine.available_plugins().await.len(), 2);
}

#[tokio::test]
async fn initialize_without_capabilities_still_succeeds() {
    let engine = Engine::new(EngineConfig::default()).unwrap();
    engine.initialize_deep_tree_echo().await.unwrap();

    let state = engine.deep_tree_echo().await;
    assert!(state.initialized);
    assert_eq!(state.integrations["tool_registry"].status, IntegrationStatus::Disconnected);
}

struct OfflineBackend;

#[async_trait::async_trait]
impl CognitiveBackend for OfflineBackend {
    fn name(&self) -> &str {
        "offline"
    }

    async fn is_available(&self) -> bool {
        false
    }

    async fn analyze(&self, _input: &str, _config: &Parameters) -> deeptree::Result<String> {
        Err(Error::CapabilityUnavailable("offline".into()))
    }
}

#[tokio::test]
async fn unavailable_backend_starts_degraded_and_keeps_running() {
    let dir = project_tree();
    let engine = Engine::with_backend(EngineConfig::default(), Arc::new(OfflineBackend)).unwrap();
    engine.register_default_tools(dir.path()).await.unwrap();

    let err = engine.initialize_deep_tree_echo().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CapabilityUnavailable);
    let state = engine.deep_tree_echo().await;
    assert!(state.initialized);
    assert_eq!(state.core_status, CoreStatus::Degraded);
    assert_eq!(state.integrations["cognitive_backend"].status, IntegrationStatus::Disconnected);

    // the engine still serves introspection and refreshes report the same condition
    let result = engine.perform_introspection(dir.path(), 0.6, 0.4).await.unwrap();
    assert!(!result.cognitive_snapshot.salient_files.is_empty());
    let err = engine.refresh_deep_tree_echo_status().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CapabilityUnavailable);
}

#[tokio::test]
async fn refresh_is_idempotent() {
    let dir = project_tree();
    let engine = ready_engine(dir.path()).await;
    let agent = engine.create_specialized_agent(AgentType::General, "g");
    let mut task = reflect(&agent, "once");
    engine.execute_task(&mut task, &agent).await;

    engine.refresh_deep_tree_echo_status().await.unwrap();
    let first = engine.deep_tree_echo().await;
    engine.refresh_deep_tree_echo_status().await.unwrap();
    let second = engine.deep_tree_echo().await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn diagnostics_warn_without_agents() {
    let dir = TempDir::new().unwrap();
    let engine = ready_engine(dir.path()).await;

    let report = engine.run_diagnostics().await;
    let agents = report.check("agent_pool").unwrap();
    assert_eq!(agents.status, CheckStatus::Warn);
    let worst = report.tests.iter().map(|t| t.status).max().unwrap();
    assert_eq!(report.overall_health, worst);
    assert!(report.overall_health >= CheckStatus::Warn);
}

#[tokio::test]
async fn diagnostics_fail_with_empty_registries() {
    let engine = Engine::new(EngineConfig::default()).unwrap();
    engine.initialize_deep_tree_echo().await.unwrap();

    let report = engine.run_diagnostics().await;
    assert_eq!(report.check("capability_registry").unwrap().status, CheckStatus::Fail);
    assert_eq!(report.overall_health, CheckStatus::Fail);
}

// ===========================================================================
// Configuration
// ===========================================================================

#[test]
fn config_round_trips_through_toml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("deeptree.toml");
    fs::write(
        &path,
        "[agents]\ncontext_capacity = 4\n\n[introspection]\nattention_percentile = 0.5\n",
    )
    .unwrap();

    let config = EngineConfig::load(&path);
    assert_eq!(config.agents.context_capacity, 4);
    assert_eq!(config.introspection.attention_percentile, 0.5);
    assert_eq!(config.execution.default_timeout_ms, 30_000);

    let rendered = config.to_toml();
    assert!(rendered.contains("context_capacity = 4"));
}

#[test]
fn missing_or_broken_config_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let defaults = EngineConfig::default();

    let missing = EngineConfig::load(&dir.path().join("absent.toml"));
    assert_eq!(missing.agents.context_capacity, defaults.agents.context_capacity);

    let path = dir.path().join("broken.toml");
    fs::write(&path, "[agents\ncontext_capacity = ").unwrap();
    let broken = EngineConfig::load(&path);
    assert_eq!(broken.agents.context_capacity, defaults.agents.context_capacity);
}

#[test]
fn invalid_config_is_rejected_by_engine() {
    let mut config = EngineConfig::default();
    config.introspection.attention_percentile = 1.5;
    let err = Engine::new(config).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[tokio::test]
async fn small_context_capacity_evicts_oldest() {
    let dir = TempDir::new().unwrap();
    let mut config = EngineConfig::default();
    config.agents.context_capacity = 2;
    let engine = Engine::new(config).unwrap();
    engine.register_default_tools(dir.path()).await.unwrap();
    let agent = engine.create_specialized_agent(AgentType::General, "small");

    for input in ["first input", "second input"] {
        let mut task = Task::generated(TaskType::ToolCall, input, agent.id.clone())
            .with_param("tool_name", "text_stats");
        assert!(engine.execute_task(&mut task, &agent).await.is_completed());
    }
    let agent = engine.get_agent(&agent.id).await.unwrap();
    assert_eq!(agent.state.context.len(), 2);
    assert_eq!(agent.state.memory.len(), 2);
    assert_eq!(agent.state.context.iter().next().unwrap().content, "second input");
}
