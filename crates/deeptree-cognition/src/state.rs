//! DeepTreeEcho state - the engine's aggregated self-model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Integration names probed by the engine.
pub const TOOL_REGISTRY: &str = "tool_registry";
pub const PLUGIN_REGISTRY: &str = "plugin_registry";
pub const COGNITIVE_BACKEND: &str = "cognitive_backend";

pub const KNOWN_INTEGRATIONS: [&str; 3] = [TOOL_REGISTRY, PLUGIN_REGISTRY, COGNITIVE_BACKEND];

/// Ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemHealth {
    Healthy,
    Degraded,
    Critical,
}

impl SystemHealth {
    /// Health for a completed/total ratio.
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= 0.8 {
            Self::Healthy
        } else if ratio >= 0.5 {
            Self::Degraded
        } else {
            Self::Critical
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for SystemHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoreStatus {
    Dormant,
    Active,
    Degraded,
}

impl std::fmt::Display for CoreStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Dormant => "dormant",
            Self::Active => "active",
            Self::Degraded => "degraded",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IdentityCoherence {
    pub overall_coherence: f64,
    /// Mean per-agent completed/(completed + failed).
    pub memory_consistency: f64,
    /// Mean salient-file coherence over recent introspections.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub introspection_coherence: Option<f64>,
    /// Completed share of the outcome window.
    pub outcome_stability: f64,
}

impl Default for IdentityCoherence {
    fn default() -> Self {
        Self {
            overall_coherence: 1.0,
            memory_consistency: 1.0,
            introspection_coherence: None,
            outcome_stability: 1.0,
        }
    }
}

impl IdentityCoherence {
    /// Mean of the available factors, clamped to `[0, 1]`.
    pub fn derive(
        memory_consistency: f64,
        introspection_coherence: Option<f64>,
        outcome_stability: f64,
    ) -> Self {
        let mut factors = vec![memory_consistency, outcome_stability];
        factors.extend(introspection_coherence);
        let overall = factors.iter().sum::<f64>() / factors.len() as f64;
        Self {
            overall_coherence: overall.clamp(0.0, 1.0),
            memory_consistency,
            introspection_coherence,
            outcome_stability,
        }
    }

    pub fn in_range(&self) -> bool {
        let unit = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
        unit(self.overall_coherence)
            && unit(self.memory_consistency)
            && unit(self.outcome_stability)
            && self.introspection_coherence.map_or(true, unit)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryResonance {
    pub memory_nodes: usize,
    pub connections: usize,
    pub hyperedges: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvolutionStage {
    Nascent,
    Emerging,
    Developing,
    Integrating,
    Resonant,
}

impl EvolutionStage {
    /// Stage earned by the activity so far.
    pub fn earned(completed_tasks: u64, introspections: u64, coherence: f64) -> Self {
        if completed_tasks >= 100 && introspections >= 3 && coherence >= 0.9 {
            Self::Resonant
        } else if completed_tasks >= 25 && introspections >= 1 && coherence >= 0.75 {
            Self::Integrating
        } else if completed_tasks >= 5 {
            Self::Developing
        } else if completed_tasks >= 1 || introspections >= 1 {
            Self::Emerging
        } else {
            Self::Nascent
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::Nascent => "cognitive core initialized",
            Self::Emerging => "first experiences recorded",
            Self::Developing => "sustained task activity",
            Self::Integrating => "coherent activity integrated with introspection",
            Self::Resonant => "stable, highly coherent self-model",
        }
    }
}

impl std::fmt::Display for EvolutionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Nascent => "nascent",
            Self::Emerging => "emerging",
            Self::Developing => "developing",
            Self::Integrating => "integrating",
            Self::Resonant => "resonant",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub stage: EvolutionStage,
    pub reached_at: DateTime<Utc>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionTimeline {
    pub current_stage: EvolutionStage,
    pub milestones: Vec<Milestone>,
}

impl Default for EvolutionTimeline {
    fn default() -> Self {
        Self { current_stage: EvolutionStage::Nascent, milestones: Vec::new() }
    }
}

impl EvolutionTimeline {
    /// Move to `stage` if it is ahead of the current one. Never moves back.
    pub fn advance(&mut self, stage: EvolutionStage) -> bool {
        if stage <= self.current_stage {
            return false;
        }
        self.current_stage = stage;
        self.mark(stage);
        true
    }

    fn mark(&mut self, stage: EvolutionStage) {
        self.milestones.push(Milestone {
            stage,
            reached_at: Utc::now(),
            description: stage.description().to_string(),
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationStatus {
    Pending,
    Connected,
    Disconnected,
}

impl std::fmt::Display for IntegrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationHealth {
    Unknown,
    Good,
    Down,
}

impl std::fmt::Display for IntegrationHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Unknown => "unknown",
            Self::Good => "good",
            Self::Down => "down",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Integration {
    pub status: IntegrationStatus,
    pub health: IntegrationHealth,
    pub required: bool,
}

impl Integration {
    pub fn pending(required: bool) -> Self {
        Self { status: IntegrationStatus::Pending, health: IntegrationHealth::Unknown, required }
    }

    pub fn is_down(&self) -> bool {
        self.status == IntegrationStatus::Disconnected
    }
}

/// Result of checking one integration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityProbe {
    pub name: String,
    pub available: bool,
    pub required: bool,
}

impl CapabilityProbe {
    pub fn new(name: impl Into<String>, available: bool) -> Self {
        Self { name: name.into(), available, required: false }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeepTreeEchoState {
    pub system_health: SystemHealth,
    pub core_status: CoreStatus,
    pub thought_count: u64,
    pub recursive_depth: usize,
    pub identity_coherence: IdentityCoherence,
    pub memory_resonance: MemoryResonance,
    pub evolution_timeline: EvolutionTimeline,
    pub integrations: BTreeMap<String, Integration>,
    pub initialized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initialized_at: Option<DateTime<Utc>>,
}

impl Default for DeepTreeEchoState {
    fn default() -> Self {
        Self {
            system_health: SystemHealth::Healthy,
            core_status: CoreStatus::Dormant,
            thought_count: 0,
            recursive_depth: 0,
            identity_coherence: IdentityCoherence::default(),
            memory_resonance: MemoryResonance::default(),
            evolution_timeline: EvolutionTimeline::default(),
            integrations: KNOWN_INTEGRATIONS
                .iter()
                .map(|name| (name.to_string(), Integration::pending(*name == COGNITIVE_BACKEND)))
                .collect(),
            initialized: false,
            initialized_at: None,
        }
    }
}

impl DeepTreeEchoState {
    /// Apply probe results. Returns the names of required integrations that
    /// are down.
    pub fn apply_probes(&mut self, probes: &[CapabilityProbe]) -> Vec<String> {
        for probe in probes {
            let entry = self
                .integrations
                .entry(probe.name.clone())
                .or_insert_with(|| Integration::pending(probe.required));
            entry.required |= probe.required;
            if probe.available {
                entry.status = IntegrationStatus::Connected;
                entry.health = IntegrationHealth::Good;
            } else {
                entry.status = IntegrationStatus::Disconnected;
                entry.health = IntegrationHealth::Down;
            }
        }
        self.required_down()
    }

    pub fn required_down(&self) -> Vec<String> {
        self.integrations
            .iter()
            .filter(|(_, i)| i.required && i.is_down())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Record the Nascent milestone that opens the timeline.
    pub(crate) fn open_timeline(&mut self) {
        self.evolution_timeline = EvolutionTimeline::default();
        self.evolution_timeline.mark(EvolutionStage::Nascent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_thresholds() {
        assert_eq!(SystemHealth::from_ratio(1.0), SystemHealth::Healthy);
        assert_eq!(SystemHealth::from_ratio(0.8), SystemHealth::Healthy);
        assert_eq!(SystemHealth::from_ratio(0.5), SystemHealth::Degraded);
        assert_eq!(SystemHealth::from_ratio(0.49), SystemHealth::Critical);
        assert!(SystemHealth::Critical > SystemHealth::Degraded);
    }

    #[test]
    fn coherence_is_mean_of_present_factors() {
        let c = IdentityCoherence::derive(1.0, None, 0.5);
        assert_eq!(c.overall_coherence, 0.75);
        let c = IdentityCoherence::derive(1.0, Some(0.4), 0.7);
        assert!((c.overall_coherence - 0.7).abs() < 1e-9);
        assert!(c.in_range());
    }

    #[test]
    fn timeline_never_regresses() {
        let mut t = EvolutionTimeline::default();
        assert!(t.advance(EvolutionStage::Developing));
        assert!(!t.advance(EvolutionStage::Emerging));
        assert_eq!(t.current_stage, EvolutionStage::Developing);
        assert_eq!(t.milestones.len(), 1);
    }
}
