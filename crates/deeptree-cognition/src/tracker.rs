//! Cognitive state tracker
//!
//! One `RwLock` guards the DeepTreeEcho state together with everything it is
//! derived from: the rolling outcome window, per-agent tallies, recent
//! introspection coherence and the memory graph. Writers hold the lock only
//! for in-memory bookkeeping, never across a backend call or a filesystem walk.

use crate::backend::CognitiveBackend;
use crate::config::{CognitionConfig, GraphConfig};
use crate::diagnostics::{self, DiagnosticInputs, DiagnosticResult};
use crate::graph::{FoldPlan, MemoryGraph};
use crate::introspection::{CognitiveSnapshot, EchoIntegration};
use crate::state::{
    CapabilityProbe, CoreStatus, DeepTreeEchoState, EvolutionStage, IdentityCoherence,
    MemoryResonance, SystemHealth,
};
use chrono::Utc;
use deeptree_core::{AgentId, Error, Parameters, Result, TaskType};
use std::collections::{BTreeMap, VecDeque};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// What the executor reports after each task reaches a terminal state.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub agent_id: AgentId,
    pub task_id: String,
    pub task_type: TaskType,
    pub completed: bool,
    /// Text the memory node is derived from (input and output of the task).
    pub summary: String,
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    completed: u64,
    failed: u64,
}

struct Inner {
    state: DeepTreeEchoState,
    outcomes: VecDeque<bool>,
    tallies: BTreeMap<AgentId, Tally>,
    coherence_history: VecDeque<f64>,
    completed_total: u64,
    introspections: u64,
    graph: MemoryGraph,
}

impl Inner {
    fn sync_resonance(&mut self) {
        self.state.memory_resonance = MemoryResonance {
            memory_nodes: self.graph.node_count(),
            connections: self.graph.edge_count(),
            hyperedges: self.graph.hyperedge_count(),
        };
    }

    fn outcome_ratio(&self) -> Option<f64> {
        if self.outcomes.is_empty() {
            return None;
        }
        let completed = self.outcomes.iter().filter(|ok| **ok).count();
        Some(completed as f64 / self.outcomes.len() as f64)
    }

    fn memory_consistency(&self) -> f64 {
        let ratios: Vec<f64> = self
            .tallies
            .values()
            .filter(|t| t.completed + t.failed > 0)
            .map(|t| t.completed as f64 / (t.completed + t.failed) as f64)
            .collect();
        if ratios.is_empty() {
            1.0
        } else {
            ratios.iter().sum::<f64>() / ratios.len() as f64
        }
    }

    fn introspection_coherence(&self) -> Option<f64> {
        if self.coherence_history.is_empty() {
            return None;
        }
        Some(self.coherence_history.iter().sum::<f64>() / self.coherence_history.len() as f64)
    }

    /// Recompute every derived field. Pure in the tracked data, so repeated
    /// calls without new activity leave the state unchanged.
    fn recompute(&mut self) {
        let ratio = self.outcome_ratio();
        let mut health = ratio.map_or(SystemHealth::Healthy, SystemHealth::from_ratio);
        if !self.state.required_down().is_empty() {
            health = health.max(SystemHealth::Degraded);
        }
        self.state.system_health = health;
        self.state.core_status = if !self.state.initialized {
            CoreStatus::Dormant
        } else if health == SystemHealth::Healthy {
            CoreStatus::Active
        } else {
            CoreStatus::Degraded
        };

        self.state.identity_coherence = IdentityCoherence::derive(
            self.memory_consistency(),
            self.introspection_coherence(),
            ratio.unwrap_or(1.0),
        );

        let earned = EvolutionStage::earned(
            self.completed_total,
            self.introspections,
            self.state.identity_coherence.overall_coherence,
        );
        if self.state.evolution_timeline.advance(earned) {
            info!("evolution stage advanced to {}", earned);
        }
        self.sync_resonance();
    }
}

pub struct CognitiveTracker {
    config: CognitionConfig,
    inner: RwLock<Inner>,
}

impl CognitiveTracker {
    pub fn new(config: CognitionConfig, graph: GraphConfig) -> Self {
        Self {
            inner: RwLock::new(Inner {
                state: DeepTreeEchoState::default(),
                outcomes: VecDeque::with_capacity(config.outcome_window),
                tallies: BTreeMap::new(),
                coherence_history: VecDeque::with_capacity(config.introspection_history),
                completed_total: 0,
                introspections: 0,
                graph: MemoryGraph::new(graph),
            }),
            config,
        }
    }

    /// Reset counters to baseline and set integrations from `probes`.
    ///
    /// The memory graph survives re-initialization. A required probe that is
    /// unavailable yields `CapabilityUnavailable`, but the state is still
    /// initialized (degraded) and usable.
    pub async fn initialize(&self, probes: &[CapabilityProbe]) -> Result<()> {
        let mut inner = self.inner.write().await;
        let graph = std::mem::replace(&mut inner.graph, MemoryGraph::new(GraphConfig::default()));
        *inner = Inner {
            state: DeepTreeEchoState::default(),
            outcomes: VecDeque::with_capacity(self.config.outcome_window),
            tallies: BTreeMap::new(),
            coherence_history: VecDeque::with_capacity(self.config.introspection_history),
            completed_total: 0,
            introspections: 0,
            graph,
        };

        let down = inner.state.apply_probes(probes);
        inner.state.initialized = true;
        inner.state.initialized_at = Some(Utc::now());
        inner.state.open_timeline();
        inner.recompute();

        info!(
            "cognitive core initialized: health {}, core {}",
            inner.state.system_health, inner.state.core_status
        );
        if down.is_empty() {
            Ok(())
        } else {
            Err(Error::CapabilityUnavailable(down.join(", ")))
        }
    }

    /// Re-probe integrations and recompute health, coherence and stage.
    pub async fn refresh_status(&self, probes: &[CapabilityProbe]) -> Result<()> {
        let mut inner = self.inner.write().await;
        let down = inner.state.apply_probes(probes);
        inner.recompute();
        debug!(
            "status refreshed: health {}, coherence {:.3}",
            inner.state.system_health, inner.state.identity_coherence.overall_coherence
        );
        if down.is_empty() {
            Ok(())
        } else {
            Err(Error::CapabilityUnavailable(down.join(", ")))
        }
    }

    /// Clone of the current state.
    pub async fn snapshot(&self) -> DeepTreeEchoState {
        self.inner.read().await.state.clone()
    }

    pub async fn thought_count(&self) -> u64 {
        self.inner.read().await.state.thought_count
    }

    /// Feed a terminal task outcome into the tracked data.
    pub async fn record_task(&self, outcome: TaskOutcome) {
        let mut inner = self.inner.write().await;
        if inner.outcomes.len() >= self.config.outcome_window {
            inner.outcomes.pop_front();
        }
        inner.outcomes.push_back(outcome.completed);

        let tally = inner.tallies.entry(outcome.agent_id.clone()).or_default();
        if outcome.completed {
            tally.completed += 1;
        } else {
            tally.failed += 1;
        }

        if !outcome.completed {
            return;
        }
        inner.completed_total += 1;
        if outcome.task_type.is_cognitive() {
            inner.state.thought_count += 1;
        }
        inner
            .graph
            .record_memory(&outcome.agent_id, &outcome.task_id, &outcome.summary);
        inner.sync_resonance();
    }

    /// Merge a scan into the memory graph. The fold plan is built before the
    /// write lock is taken; only the merge runs under it.
    pub async fn fold_introspection(&self, snapshot: &CognitiveSnapshot) -> EchoIntegration {
        let plan = FoldPlan::from_snapshot(snapshot);
        debug!(
            "fold plan: {} files across {} directories",
            plan.file_count(),
            plan.directory_count()
        );
        let mut inner = self.inner.write().await;
        let stats = inner.graph.apply(plan);
        if let Some(coherence) = snapshot.mean_coherence() {
            if inner.coherence_history.len() >= self.config.introspection_history {
                inner.coherence_history.pop_front();
            }
            inner.coherence_history.push_back(coherence);
        }
        let tree_depth = snapshot.tree_depth();
        inner.state.recursive_depth = inner.state.recursive_depth.max(tree_depth);
        inner.introspections += 1;
        inner.sync_resonance();

        info!(
            "folded introspection: {} nodes, {} edges created (depth {})",
            stats.nodes_created, stats.edges_created, tree_depth
        );
        EchoIntegration {
            nodes_created: stats.nodes_created,
            edges_created: stats.edges_created,
            tree_depth,
        }
    }

    /// Reflective analysis for Reflect tasks: the backend's analysis of the
    /// input followed by a summary of the current self-model.
    pub async fn reflect(
        &self,
        backend: &dyn CognitiveBackend,
        input: &str,
        parameters: &Parameters,
    ) -> Result<String> {
        let analysis = backend.analyze(input, parameters).await?;
        let state = self.snapshot().await;
        Ok(format!(
            "{}\nself-model: stage {}, coherence {:.3}, {} thoughts, {} memory nodes, {} connections",
            analysis,
            state.evolution_timeline.current_stage,
            state.identity_coherence.overall_coherence,
            state.thought_count,
            state.memory_resonance.memory_nodes,
            state.memory_resonance.connections,
        ))
    }

    pub async fn run_diagnostics(&self, inputs: &DiagnosticInputs) -> DiagnosticResult {
        let inner = self.inner.read().await;
        let result = diagnostics::run(&inner.state, inputs);
        if result.overall_health > diagnostics::CheckStatus::Pass {
            warn!("diagnostics overall health: {}", result.overall_health);
        }
        result
    }

    /// Read access to the memory graph.
    pub async fn with_graph<R>(&self, f: impl FnOnce(&MemoryGraph) -> R) -> R {
        let inner = self.inner.read().await;
        f(&inner.graph)
    }
}
