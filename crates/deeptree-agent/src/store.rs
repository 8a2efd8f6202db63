//! Agent store - owns every agent for the lifetime of the engine

use crate::config::AgentConfig;
use crate::state::{Agent, AgentState};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use deeptree_core::{AgentId, AgentType, Error, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Live agent: immutable identity plus state behind the per-agent lock.
pub(crate) struct AgentCell {
    pub(crate) id: AgentId,
    pub(crate) name: String,
    pub(crate) agent_type: AgentType,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) state: Mutex<AgentState>,
}

impl AgentCell {
    async fn snapshot(&self) -> Agent {
        Agent {
            id: self.id.clone(),
            name: self.name.clone(),
            agent_type: self.agent_type,
            created_at: self.created_at,
            state: self.state.lock().await.clone(),
        }
    }
}

pub struct AgentStore {
    agents: DashMap<AgentId, Arc<AgentCell>>,
    config: AgentConfig,
}

impl Default for AgentStore {
    fn default() -> Self {
        Self::new(AgentConfig::default())
    }
}

impl AgentStore {
    pub fn new(config: AgentConfig) -> Self {
        Self { agents: DashMap::new(), config }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Create an agent named `<type>-<label>` with a fresh id and empty state.
    pub fn create(&self, agent_type: AgentType, label: &str) -> Agent {
        let id = AgentId::generate();
        let cell = AgentCell {
            id: id.clone(),
            name: format!("{}-{}", agent_type, label),
            agent_type,
            created_at: Utc::now(),
            state: Mutex::new(AgentState::new(&self.config)),
        };
        let agent = Agent {
            id: cell.id.clone(),
            name: cell.name.clone(),
            agent_type,
            created_at: cell.created_at,
            state: AgentState::new(&self.config),
        };
        info!("Agent {} created: {}", id, agent.name);
        self.agents.insert(id, Arc::new(cell));
        agent
    }

    pub(crate) fn cell(&self, id: &AgentId) -> Result<Arc<AgentCell>> {
        self.agents
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::not_found("agent", id.as_str()))
    }

    /// Snapshot of one agent.
    pub async fn get(&self, id: &AgentId) -> Result<Agent> {
        let cell = self.cell(id)?;
        Ok(cell.snapshot().await)
    }

    /// Snapshots of all agents, oldest first.
    pub async fn list(&self) -> Vec<Agent> {
        let cells: Vec<Arc<AgentCell>> = self.agents.iter().map(|e| e.value().clone()).collect();
        let mut agents = Vec::with_capacity(cells.len());
        for cell in cells {
            agents.push(cell.snapshot().await);
        }
        agents.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        agents
    }

    pub fn contains(&self, id: &AgentId) -> bool {
        self.agents.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
