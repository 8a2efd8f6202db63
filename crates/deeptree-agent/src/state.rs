//! Agent snapshot and per-agent mutable state

use crate::config::AgentConfig;
use crate::context::{ContextItem, ContextRole, ContextWindow};
use chrono::{DateTime, Utc};
use deeptree_core::{AgentId, AgentType, Task, TaskType};
use serde::{Deserialize, Serialize};

const INPUT_SUMMARY_CHARS: usize = 80;
const OUTPUT_SUMMARY_CHARS: usize = 160;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub task_id: String,
    pub task_type: TaskType,
    pub summary: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub context: ContextWindow,
    pub memory: Vec<MemoryEntry>,
    pub last_interaction: Option<DateTime<Utc>>,
    #[serde(skip)]
    memory_capacity: Option<usize>,
}

impl AgentState {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            context: ContextWindow::new(config.context_capacity),
            memory: Vec::new(),
            last_interaction: None,
            memory_capacity: config.memory_capacity,
        }
    }

    /// Record a completed task: input and output into the context, one
    /// memory entry, and the interaction time.
    pub(crate) fn commit(&mut self, task: &Task, output: &str, at: DateTime<Utc>) {
        self.context.push(ContextItem {
            role: ContextRole::Input,
            content: task.input().to_string(),
            task_id: task.id().to_string(),
            at,
        });
        self.context.push(ContextItem {
            role: ContextRole::Output,
            content: output.to_string(),
            task_id: task.id().to_string(),
            at,
        });

        self.memory.push(MemoryEntry {
            task_id: task.id().to_string(),
            task_type: task.task_type(),
            summary: format!(
                "{}: {} => {}",
                task.task_type(),
                clip(task.input(), INPUT_SUMMARY_CHARS),
                clip(output, OUTPUT_SUMMARY_CHARS)
            ),
            at,
        });
        if let Some(cap) = self.memory_capacity {
            let excess = self.memory.len().saturating_sub(cap.max(1));
            self.memory.drain(..excess);
        }
        self.last_interaction = Some(at);
    }
}

/// First `max` characters of the first line of `s`.
fn clip(s: &str, max: usize) -> String {
    let line = s.lines().next().unwrap_or("").trim();
    match line.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &line[..idx]),
        None => line.to_string(),
    }
}

/// Point-in-time copy of an agent handed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub agent_type: AgentType,
    pub created_at: DateTime<Utc>,
    pub state: AgentState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_respects_char_boundaries() {
        assert_eq!(clip("héllo wörld", 4), "héll...");
        assert_eq!(clip("short", 10), "short");
        assert_eq!(clip("first\nsecond", 10), "first");
    }

    #[test]
    fn memory_cap_drops_oldest() {
        let config = AgentConfig { memory_capacity: Some(2), ..Default::default() };
        let mut state = AgentState::new(&config);
        for n in 0..3 {
            let task = Task::new(format!("t{}", n), TaskType::Analyze, "x", AgentId::new("a"));
            state.commit(&task, "out", Utc::now());
        }
        let ids: Vec<&str> = state.memory.iter().map(|m| m.task_id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2"]);
        assert_eq!(state.context.len(), 6);
    }
}
