//! Core types for DeepTree

use crate::error::{Error, ErrorKind, Result};
use crate::params::Parameters;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// Agent identifier - cheaply cloneable
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct AgentId(Arc<str>);

impl AgentId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(Arc::from(s.into()))
    }

    /// Fresh random id of the form `agent-<uuid>`.
    pub fn generate() -> Self {
        Self::new(format!("agent-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<AgentId> for String {
    fn from(id: AgentId) -> Self {
        id.0.to_string()
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Agent specialization
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    General,
    Reflective,
    Orchestrator,
    Specialist,
}

impl AgentType {
    pub const ALL: [AgentType; 4] = [
        AgentType::General,
        AgentType::Reflective,
        AgentType::Orchestrator,
        AgentType::Specialist,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Reflective => "reflective",
            Self::Orchestrator => "orchestrator",
            Self::Specialist => "specialist",
        }
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| Error::UnsupportedAgentType(s.to_string()))
    }
}

/// Task type - selects the handler a task is dispatched to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Introspective analysis through the cognitive tracker
    Reflect,
    /// Registered plugin, named by `parameters["plugin_name"]`
    Plugin,
    /// Registered tool, named by `parameters["tool_name"]`
    ToolCall,
    /// Direct call to the cognitive backend
    Analyze,
}

impl TaskType {
    /// Cognitive tasks advance the thought counter when they complete.
    pub fn is_cognitive(self) -> bool {
        matches!(self, Self::Reflect | Self::Analyze)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reflect => "reflect",
            Self::Plugin => "plugin",
            Self::ToolCall => "tool_call",
            Self::Analyze => "analyze",
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Pending may fail validation before it ever runs.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Pending, Self::Failed)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A unit of work addressed to one agent.
///
/// Type, input and target agent are fixed at construction; only the status
/// moves, and only forward.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    id: String,
    task_type: TaskType,
    input: String,
    status: TaskStatus,
    agent_id: AgentId,
    #[serde(default)]
    parameters: Parameters,
}

impl Task {
    pub fn new(
        id: impl Into<String>,
        task_type: TaskType,
        input: impl Into<String>,
        agent_id: AgentId,
    ) -> Self {
        Self {
            id: id.into(),
            task_type,
            input: input.into(),
            status: TaskStatus::Pending,
            agent_id,
            parameters: Parameters::new(),
        }
    }

    /// Same as [`Task::new`] with a generated `task-<uuid>` id.
    pub fn generated(task_type: TaskType, input: impl Into<String>, agent_id: AgentId) -> Self {
        Self::new(
            format!("task-{}", uuid::Uuid::new_v4()),
            task_type,
            input,
            agent_id,
        )
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_param(
        mut self,
        key: impl Into<String>,
        value: impl Into<crate::params::ParamValue>,
    ) -> Self {
        self.parameters.insert(key, value);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn task_type(&self) -> TaskType {
        self.task_type
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Move to `next`, rejecting anything but a forward transition.
    pub fn transition(&mut self, next: TaskStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::InvalidState(format!(
                "task {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }
}

/// Cloneable projection of an [`Error`] carried by a failed [`TaskResult`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&Error> for TaskFailure {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<Error> for TaskFailure {
    fn from(err: Error) -> Self {
        Self::from(&err)
    }
}

impl std::fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Outcome of one task execution: either output or an error, never both.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub status: TaskStatus,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskFailure>,
}

impl TaskResult {
    pub fn completed(task_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Completed,
            output: output.into(),
            error: None,
        }
    }

    pub fn failed(task_id: impl Into<String>, error: impl Into<TaskFailure>) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Failed,
            output: String::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    /// Collapse into a `Result`, for callers that prefer `?`.
    pub fn into_result(self) -> std::result::Result<String, TaskFailure> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.output),
        }
    }
}
