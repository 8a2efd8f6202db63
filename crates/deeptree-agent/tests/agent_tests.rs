//! Tests for deeptree-agent: store, context window, task executor

use deeptree_agent::*;
use deeptree_cognition::{CognitionConfig, CognitiveTracker, GraphConfig, LocalEchoBackend};
use deeptree_core::{AgentId, AgentType, ErrorKind, Parameters, Task, TaskStatus, TaskType};
use deeptree_tools::{
    create_default_plugins, create_default_tools, Tool, ToolContext, ToolResult,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

// ===========================================================================
// Test handlers
// ===========================================================================

struct SlowTool;

#[async_trait::async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &str { "slow" }
    fn description(&self) -> &str { "Sleeps before answering" }
    async fn execute(&self, _ctx: &ToolContext, params: &Parameters) -> ToolResult {
        let ms = params.opt_i64("ms").ok().flatten().unwrap_or(5_000);
        tokio::time::sleep(Duration::from_millis(ms as u64)).await;
        ToolResult::text("finally")
    }
}

struct EmptyTool;

#[async_trait::async_trait]
impl Tool for EmptyTool {
    fn name(&self) -> &str { "empty" }
    fn description(&self) -> &str { "Answers with nothing" }
    async fn execute(&self, _ctx: &ToolContext, _params: &Parameters) -> ToolResult {
        ToolResult::text("   ")
    }
}

struct EchoContextTool;

#[async_trait::async_trait]
impl Tool for EchoContextTool {
    fn name(&self) -> &str { "echo_context" }
    fn description(&self) -> &str { "Reports how much recent context it was given" }
    async fn execute(&self, ctx: &ToolContext, _params: &Parameters) -> ToolResult {
        ToolResult::text(format!("{} recent items for {}", ctx.recent_context.len(), ctx.agent_name))
    }
}

// ===========================================================================
// Harness
// ===========================================================================

struct Harness {
    store: Arc<AgentStore>,
    tracker: Arc<CognitiveTracker>,
    exec: TaskExecutor,
    _workspace: TempDir,
}

fn harness_with(config: AgentConfig) -> Harness {
    let workspace = TempDir::new().unwrap();
    std::fs::write(workspace.path().join("notes.txt"), "alpha\nbeta\n").unwrap();

    let mut tools = create_default_tools(workspace.path()).unwrap();
    tools.add(SlowTool).unwrap();
    tools.add(EmptyTool).unwrap();
    tools.add(EchoContextTool).unwrap();
    let plugins = create_default_plugins().unwrap();

    let store = Arc::new(AgentStore::new(config));
    let tracker = Arc::new(CognitiveTracker::new(CognitionConfig::default(), GraphConfig::default()));
    let exec = TaskExecutor::new(
        store.clone(),
        Arc::new(RwLock::new(tools)),
        Arc::new(RwLock::new(plugins)),
        tracker.clone(),
        Arc::new(LocalEchoBackend),
        ExecutionConfig::default(),
    );
    Harness { store, tracker, exec, _workspace: workspace }
}

fn harness() -> Harness {
    harness_with(AgentConfig::default())
}

fn plugin_task(agent: &Agent, plugin: &str) -> Task {
    Task::generated(TaskType::Plugin, "Memory echoes memory. Echoes shape identity.", agent.id.clone())
        .with_param("plugin_name", plugin)
        .with_param("type", "hypergraph_analysis")
}

fn tool_task(agent: &Agent, tool: &str) -> Task {
    Task::generated(TaskType::ToolCall, "quiet words", agent.id.clone())
        .with_param("tool_name", tool)
        .with_param("operation", "upper")
}

// ===========================================================================
// AgentStore
// ===========================================================================

#[tokio::test]
async fn store_creates_named_agents_with_empty_state() {
    let h = harness();
    let agent = h.store.create(AgentType::Reflective, "deep-analysis");
    assert!(agent.id.as_str().starts_with("agent-"));
    assert_eq!(agent.name, "reflective-deep-analysis");
    assert!(agent.state.context.is_empty());
    assert!(agent.state.memory.is_empty());
    assert!(agent.state.last_interaction.is_none());
    assert_eq!(h.store.len(), 1);
}

#[tokio::test]
async fn store_ids_are_unique() {
    let h = harness();
    let a = h.store.create(AgentType::General, "x");
    let b = h.store.create(AgentType::General, "x");
    assert_ne!(a.id, b.id);
    assert_eq!(h.store.list().await.len(), 2);
}

#[tokio::test]
async fn store_get_unknown_is_not_found() {
    let h = harness();
    let err = h.store.get(&AgentId::new("agent-missing")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.to_string(), "agent not found: agent-missing");
}

#[tokio::test]
async fn agent_snapshot_serializes() {
    let h = harness();
    let agent = h.store.create(AgentType::Specialist, "json");
    let value = serde_json::to_value(&agent).unwrap();
    assert_eq!(value["agent_type"], "specialist");
    assert_eq!(value["name"], "specialist-json");
}

// ===========================================================================
// Dispatch
// ===========================================================================

#[tokio::test]
async fn reflect_task_completes_and_counts_a_thought() {
    let h = harness();
    let agent = h.store.create(AgentType::Reflective, "r");
    let mut task = Task::generated(TaskType::Reflect, "Analyze identity coherence.", agent.id.clone())
        .with_param("depth_level", "recursive");
    let result = h.exec.execute(&mut task, &agent, ExecOptions::default()).await;

    assert!(result.is_completed(), "{:?}", result.error);
    assert!(result.output.contains("self-model"));
    assert_eq!(task.status(), TaskStatus::Completed);
    assert_eq!(h.tracker.thought_count().await, 1);
}

#[tokio::test]
async fn analyze_task_uses_backend() {
    let h = harness();
    let agent = h.store.create(AgentType::General, "a");
    let mut task = Task::generated(TaskType::Analyze, "echo echo tree", agent.id.clone());
    let result = h.exec.execute(&mut task, &agent, ExecOptions::default()).await;
    assert!(result.output.starts_with("analysis [depth=surface"));
    assert_eq!(h.tracker.thought_count().await, 1);
}

#[tokio::test]
async fn plugin_task_routes_by_plugin_name() {
    let h = harness();
    let agent = h.store.create(AgentType::Specialist, "s");
    let mut task = plugin_task(&agent, "data_analysis");
    let result = h.exec.execute(&mut task, &agent, ExecOptions::default()).await;
    assert!(result.is_completed(), "{:?}", result.error);
    assert!(result.output.contains("hypergraph_analysis"));
    assert_eq!(h.tracker.thought_count().await, 0);
}

#[tokio::test]
async fn unknown_plugin_fails_with_not_found() {
    let h = harness();
    let agent = h.store.create(AgentType::Specialist, "s");
    let mut task = plugin_task(&agent, "nonexistent");
    let result = h.exec.execute(&mut task, &agent, ExecOptions::default()).await;
    assert_eq!(result.status, TaskStatus::Failed);
    assert_eq!(result.error_kind(), Some(ErrorKind::NotFound));
    assert!(result.output.is_empty());
    assert_eq!(task.status(), TaskStatus::Failed);
}

#[tokio::test]
async fn missing_plugin_name_is_missing_parameter() {
    let h = harness();
    let agent = h.store.create(AgentType::General, "g");
    let mut task = Task::generated(TaskType::Plugin, "x", agent.id.clone());
    let result = h.exec.execute(&mut task, &agent, ExecOptions::default()).await;
    assert_eq!(result.error_kind(), Some(ErrorKind::MissingParameter));
}

#[tokio::test]
async fn tool_task_routes_by_tool_name() {
    let h = harness();
    let agent = h.store.create(AgentType::General, "g");
    let mut task = tool_task(&agent, "text_transform");
    let result = h.exec.execute(&mut task, &agent, ExecOptions::default()).await;
    assert_eq!(result.into_result().unwrap(), "QUIET WORDS");
}

#[tokio::test]
async fn tool_error_becomes_handler_failure() {
    let h = harness();
    let agent = h.store.create(AgentType::General, "g");
    let mut task = Task::generated(TaskType::ToolCall, "x", agent.id.clone())
        .with_param("tool_name", "read")
        .with_param("file_path", "missing.txt");
    let result = h.exec.execute(&mut task, &agent, ExecOptions::default()).await;
    assert_eq!(result.error_kind(), Some(ErrorKind::Handler));
}

#[tokio::test]
async fn empty_output_is_a_failure() {
    let h = harness();
    let agent = h.store.create(AgentType::General, "g");
    let mut task = tool_task(&agent, "empty");
    let result = h.exec.execute(&mut task, &agent, ExecOptions::default()).await;
    assert_eq!(result.error_kind(), Some(ErrorKind::Handler));
    assert!(result.error.unwrap().message.contains("empty"));
}

#[tokio::test]
async fn handlers_see_recent_context() {
    let h = harness();
    let agent = h.store.create(AgentType::General, "ctx");
    let mut first = tool_task(&agent, "text_transform");
    h.exec.execute(&mut first, &agent, ExecOptions::default()).await;
    let mut second = tool_task(&agent, "echo_context");
    let result = h.exec.execute(&mut second, &agent, ExecOptions::default()).await;
    assert_eq!(result.output, "2 recent items for general-ctx");
}

// ===========================================================================
// Validation
// ===========================================================================

#[tokio::test]
async fn agent_mismatch_fails_task() {
    let h = harness();
    let owner = h.store.create(AgentType::General, "owner");
    let other = h.store.create(AgentType::General, "other");
    let mut task = tool_task(&owner, "text_transform");
    let result = h.exec.execute(&mut task, &other, ExecOptions::default()).await;
    assert_eq!(result.error_kind(), Some(ErrorKind::AgentMismatch));
    assert_eq!(task.status(), TaskStatus::Failed);
    assert!(h.store.get(&other.id).await.unwrap().state.memory.is_empty());
}

#[tokio::test]
async fn non_pending_task_is_rejected_without_transition() {
    let h = harness();
    let agent = h.store.create(AgentType::General, "g");
    let mut task = tool_task(&agent, "text_transform");
    assert!(h.exec.execute(&mut task, &agent, ExecOptions::default()).await.is_completed());

    let again = h.exec.execute(&mut task, &agent, ExecOptions::default()).await;
    assert_eq!(again.error_kind(), Some(ErrorKind::InvalidState));
    assert_eq!(task.status(), TaskStatus::Completed);
    assert_eq!(h.store.get(&agent.id).await.unwrap().state.memory.len(), 1);
}

#[tokio::test]
async fn agent_unknown_to_store_is_not_found() {
    let h = harness();
    let other = harness();
    let stranger = other.store.create(AgentType::General, "stranger");
    let mut task = tool_task(&stranger, "text_transform");
    let result = h.exec.execute(&mut task, &stranger, ExecOptions::default()).await;
    assert_eq!(result.error_kind(), Some(ErrorKind::NotFound));
}

// ===========================================================================
// State commit
// ===========================================================================

#[tokio::test]
async fn success_appends_context_and_memory() {
    let h = harness();
    let agent = h.store.create(AgentType::General, "g");
    let mut task = tool_task(&agent, "text_transform");
    h.exec.execute(&mut task, &agent, ExecOptions::default()).await;

    let agent = h.store.get(&agent.id).await.unwrap();
    assert_eq!(agent.state.context.len(), 2);
    assert_eq!(agent.state.context.get(0).map(|i| i.role), Some(ContextRole::Input));
    assert_eq!(agent.state.context.get(1).map(|i| i.content.as_str()), Some("QUIET WORDS"));
    assert_eq!(agent.state.memory.len(), 1);
    assert_eq!(agent.state.memory[0].task_id, task.id());
    assert!(agent.state.last_interaction.is_some());
}

#[tokio::test]
async fn failure_leaves_state_untouched() {
    let h = harness();
    let agent = h.store.create(AgentType::General, "g");
    let mut ok = tool_task(&agent, "text_transform");
    h.exec.execute(&mut ok, &agent, ExecOptions::default()).await;
    let before = h.store.get(&agent.id).await.unwrap();

    let mut bad = plugin_task(&agent, "nonexistent");
    h.exec.execute(&mut bad, &agent, ExecOptions::default()).await;
    let after = h.store.get(&agent.id).await.unwrap();
    assert_eq!(before.state, after.state);
}

#[tokio::test]
async fn context_is_bounded_fifo() {
    let h = harness_with(AgentConfig { context_capacity: 4, ..Default::default() });
    let agent = h.store.create(AgentType::General, "g");
    for _ in 0..3 {
        let mut task = tool_task(&agent, "text_transform");
        assert!(h.exec.execute(&mut task, &agent, ExecOptions::default()).await.is_completed());
    }
    let agent = h.store.get(&agent.id).await.unwrap();
    assert_eq!(agent.state.context.len(), 4);
    assert_eq!(agent.state.context.evicted(), 2);
    assert_eq!(agent.state.memory.len(), 3);
}

// ===========================================================================
// Deadlines, cancellation, concurrency
// ===========================================================================

#[tokio::test]
async fn deadline_overrun_is_timeout() {
    let h = harness();
    let agent = h.store.create(AgentType::General, "g");
    let mut task = tool_task(&agent, "slow");
    let opts = ExecOptions::default().with_deadline(Duration::from_millis(20));
    let result = h.exec.execute(&mut task, &agent, opts).await;
    assert_eq!(result.error_kind(), Some(ErrorKind::Timeout));
    assert_eq!(task.status(), TaskStatus::Failed);
    assert!(h.store.get(&agent.id).await.unwrap().state.context.is_empty());
}

#[tokio::test]
async fn cancelled_task_fails_without_state_change() {
    let h = harness();
    let agent = h.store.create(AgentType::General, "g");
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });
    let mut task = tool_task(&agent, "slow");
    let result = h.exec.execute(&mut task, &agent, ExecOptions::default().with_cancel(cancel)).await;
    assert_eq!(result.error_kind(), Some(ErrorKind::Cancelled));
    assert_eq!(task.status(), TaskStatus::Failed);
    assert!(h.store.get(&agent.id).await.unwrap().state.memory.is_empty());
}

#[tokio::test]
async fn concurrent_tasks_on_one_agent_lose_no_updates() {
    let h = Arc::new(harness());
    let agent = h.store.create(AgentType::General, "shared");

    let runs = (0..16).map(|i| {
        let h = h.clone();
        let agent = agent.clone();
        tokio::spawn(async move {
            let mut task = Task::generated(TaskType::ToolCall, format!("item {}", i), agent.id.clone())
                .with_param("tool_name", "slow")
                .with_param("ms", (i % 4) as i64 * 5);
            h.exec.execute(&mut task, &agent, ExecOptions::default()).await
        })
    });
    let results = futures::future::join_all(runs).await;
    let completed = results.into_iter().filter(|r| r.as_ref().unwrap().is_completed()).count();
    assert_eq!(completed, 16);

    let agent = h.store.get(&agent.id).await.unwrap();
    assert_eq!(agent.state.memory.len(), 16);
    assert_eq!(agent.state.context.len(), 32);
}

#[tokio::test]
async fn distinct_agents_run_in_parallel() {
    let h = Arc::new(harness());
    let agents: Vec<Agent> = (0..4).map(|i| h.store.create(AgentType::General, &i.to_string())).collect();
    let started = std::time::Instant::now();
    let runs = agents.iter().cloned().map(|agent| {
        let h = h.clone();
        tokio::spawn(async move {
            let mut task = Task::generated(TaskType::ToolCall, "x", agent.id.clone())
                .with_param("tool_name", "slow")
                .with_param("ms", 200);
            h.exec.execute(&mut task, &agent, ExecOptions::default()).await
        })
    });
    let results = futures::future::join_all(runs).await;
    assert!(results.iter().all(|r| r.as_ref().unwrap().is_completed()));
    assert!(started.elapsed() < Duration::from_millis(700));
}
