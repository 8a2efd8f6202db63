//! Task executor - validates, dispatches and commits one task at a time
//!
//! Handlers run without any agent lock held. Only the commit of a successful
//! result takes the agent's mutex, so concurrent tasks on one agent overlap
//! in their handlers and serialize in their state updates.

use crate::config::ExecutionConfig;
use crate::state::Agent;
use crate::store::AgentStore;
use chrono::Utc;
use deeptree_cognition::{CognitiveBackend, CognitiveTracker, TaskOutcome};
use deeptree_core::{Error, Result, Task, TaskResult, TaskStatus, TaskType};
use deeptree_tools::{PluginRegistry, ToolContext, ToolRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Per-call execution controls.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Overrides the configured default deadline.
    pub deadline: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

impl ExecOptions {
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

pub struct TaskExecutor {
    store: Arc<AgentStore>,
    tools: Arc<RwLock<ToolRegistry>>,
    plugins: Arc<RwLock<PluginRegistry>>,
    tracker: Arc<CognitiveTracker>,
    backend: Arc<dyn CognitiveBackend>,
    config: ExecutionConfig,
}

impl TaskExecutor {
    pub fn new(
        store: Arc<AgentStore>,
        tools: Arc<RwLock<ToolRegistry>>,
        plugins: Arc<RwLock<PluginRegistry>>,
        tracker: Arc<CognitiveTracker>,
        backend: Arc<dyn CognitiveBackend>,
        config: ExecutionConfig,
    ) -> Self {
        Self { store, tools, plugins, tracker, backend, config }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Run `task` on `agent`. Always yields exactly one result: Completed
    /// with non-empty output, or Failed with an error. Failed tasks leave the
    /// agent's state untouched.
    pub async fn execute(&self, task: &mut Task, agent: &Agent, opts: ExecOptions) -> TaskResult {
        if task.status() != TaskStatus::Pending {
            let err = Error::InvalidState(format!(
                "task {} is {}, only pending tasks can be executed",
                task.id(),
                task.status()
            ));
            return TaskResult::failed(task.id(), err);
        }

        if task.agent_id() != &agent.id {
            let err = Error::AgentMismatch {
                expected: task.agent_id().to_string(),
                actual: agent.id.to_string(),
            };
            return self.reject(task, err);
        }

        let cell = match self.store.cell(&agent.id) {
            Ok(cell) => cell,
            Err(e) => return self.reject(task, e),
        };

        if let Err(e) = task.transition(TaskStatus::Running) {
            return TaskResult::failed(task.id(), e);
        }
        info!("Task {} ({}) dispatched to {}", task.id(), task.task_type(), cell.name);

        let recent = cell.state.lock().await.context.recent(self.store.config().handler_context_items);
        let ctx = ToolContext::new(cell.id.clone(), cell.name.clone(), task.id(), task.input())
            .with_recent_context(recent);

        let deadline = opts
            .deadline
            .unwrap_or_else(|| Duration::from_millis(self.config.default_timeout_ms));
        let cancel = opts.cancel.unwrap_or_default();

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            r = tokio::time::timeout(deadline, self.dispatch(task, &ctx)) => match r {
                Ok(result) => result,
                Err(_) => Err(timeout_error(deadline)),
            },
        };
        let outcome = outcome.and_then(|output| {
            if output.trim().is_empty() {
                Err(Error::handler(self.handler_label(task), "handler returned empty output"))
            } else {
                Ok(output)
            }
        });

        match outcome {
            Ok(output) => {
                cell.state.lock().await.commit(task, &output, Utc::now());
                if let Err(e) = task.transition(TaskStatus::Completed) {
                    return TaskResult::failed(task.id(), e);
                }
                self.tracker
                    .record_task(TaskOutcome {
                        agent_id: cell.id.clone(),
                        task_id: task.id().to_string(),
                        task_type: task.task_type(),
                        completed: true,
                        summary: format!("{} {}", task.input(), output),
                    })
                    .await;
                info!("Task {} completed ({} chars)", task.id(), output.len());
                TaskResult::completed(task.id(), output)
            }
            Err(e) => {
                warn!("Task {} failed: {}", task.id(), e);
                let _ = task.transition(TaskStatus::Failed);
                self.tracker
                    .record_task(TaskOutcome {
                        agent_id: cell.id.clone(),
                        task_id: task.id().to_string(),
                        task_type: task.task_type(),
                        completed: false,
                        summary: String::new(),
                    })
                    .await;
                TaskResult::failed(task.id(), e)
            }
        }
    }

    /// Fail a task that never reached a handler.
    fn reject(&self, task: &mut Task, err: Error) -> TaskResult {
        warn!("Task {} rejected: {}", task.id(), err);
        let _ = task.transition(TaskStatus::Failed);
        TaskResult::failed(task.id(), err)
    }

    fn handler_label(&self, task: &Task) -> String {
        let key = match task.task_type() {
            TaskType::Plugin => "plugin_name",
            TaskType::ToolCall => "tool_name",
            TaskType::Reflect => return "reflect".to_string(),
            TaskType::Analyze => return self.backend.name().to_string(),
        };
        task.parameters()
            .opt_str(key)
            .ok()
            .flatten()
            .unwrap_or(task.task_type().as_str())
            .to_string()
    }

    async fn dispatch(&self, task: &Task, ctx: &ToolContext) -> Result<String> {
        let params = task.parameters();
        match task.task_type() {
            TaskType::Reflect => {
                self.tracker.reflect(self.backend.as_ref(), task.input(), params).await
            }
            TaskType::Plugin => {
                let name = params.get_str("plugin_name")?;
                let plugin = self.plugins.read().await.get(name)?;
                debug!("plugin {} handling task {}", name, task.id());
                plugin.execute(ctx, params).await.into_output(name)
            }
            TaskType::ToolCall => {
                let name = params.get_str("tool_name")?;
                let tool = self.tools.read().await.get(name)?;
                if !tool.is_enabled() {
                    return Err(Error::handler(name, "tool is disabled"));
                }
                debug!("tool {} handling task {}", name, task.id());
                tool.execute(ctx, params).await.into_output(name)
            }
            TaskType::Analyze => self.backend.analyze(task.input(), params).await,
        }
    }
}

/// Deadlines too long for `u64` milliseconds saturate.
fn timeout_error(deadline: Duration) -> Error {
    Error::Timeout { after_ms: u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX) }
}
