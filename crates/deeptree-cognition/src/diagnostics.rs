//! Self-check battery over the cognitive state
//!
//! Checks never fail as errors; every outcome is a [`DiagnosticCheck`].

use crate::state::{CoreStatus, DeepTreeEchoState, IntegrationStatus, SystemHealth};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordered from best to worst, so the overall health is the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pass => "pass",
            Self::Warn => "warn",
            Self::Fail => "fail",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticCheck {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticResult {
    pub overall_health: CheckStatus,
    pub timestamp: DateTime<Utc>,
    pub tests: Vec<DiagnosticCheck>,
}

impl DiagnosticResult {
    pub fn check(&self, name: &str) -> Option<&DiagnosticCheck> {
        self.tests.iter().find(|t| t.name == name)
    }

    pub fn count(&self, status: CheckStatus) -> usize {
        self.tests.iter().filter(|t| t.status == status).count()
    }
}

/// Engine-side facts the checks need besides the cognitive state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticInputs {
    pub tools: usize,
    pub plugins: usize,
    pub agents: usize,
}

fn check(name: &str, status: CheckStatus, message: impl Into<String>) -> DiagnosticCheck {
    DiagnosticCheck { name: name.to_string(), status, message: message.into() }
}

fn capability_registry(inputs: &DiagnosticInputs) -> DiagnosticCheck {
    let summary = format!("{} tools, {} plugins registered", inputs.tools, inputs.plugins);
    let status = match (inputs.tools, inputs.plugins) {
        (0, 0) => CheckStatus::Fail,
        (0, _) | (_, 0) => CheckStatus::Warn,
        _ => CheckStatus::Pass,
    };
    check("capability_registry", status, summary)
}

fn agent_pool(inputs: &DiagnosticInputs) -> DiagnosticCheck {
    match inputs.agents {
        0 => check("agent_pool", CheckStatus::Warn, "no agents registered"),
        n => check("agent_pool", CheckStatus::Pass, format!("{} agents reachable", n)),
    }
}

fn cognitive_state_ranges(state: &DeepTreeEchoState) -> DiagnosticCheck {
    if state.identity_coherence.in_range() {
        check(
            "cognitive_state_ranges",
            CheckStatus::Pass,
            format!(
                "coherence {:.3} within [0, 1]",
                state.identity_coherence.overall_coherence
            ),
        )
    } else {
        check(
            "cognitive_state_ranges",
            CheckStatus::Fail,
            format!("coherence factors out of range: {:?}", state.identity_coherence),
        )
    }
}

fn integrations(state: &DeepTreeEchoState) -> DiagnosticCheck {
    let down = state.required_down();
    if !down.is_empty() {
        return check(
            "integrations",
            CheckStatus::Fail,
            format!("required integrations down: {}", down.join(", ")),
        );
    }
    let unsettled: Vec<&str> = state
        .integrations
        .iter()
        .filter(|(_, i)| i.status != IntegrationStatus::Connected)
        .map(|(name, _)| name.as_str())
        .collect();
    if unsettled.is_empty() {
        check(
            "integrations",
            CheckStatus::Pass,
            format!("{} integrations connected", state.integrations.len()),
        )
    } else {
        check(
            "integrations",
            CheckStatus::Warn,
            format!("not connected: {}", unsettled.join(", ")),
        )
    }
}

fn cognitive_core(state: &DeepTreeEchoState) -> DiagnosticCheck {
    match (state.core_status, state.system_health) {
        (_, SystemHealth::Critical) => {
            check("cognitive_core", CheckStatus::Fail, "system health is critical")
        }
        (CoreStatus::Dormant, _) => {
            check("cognitive_core", CheckStatus::Warn, "cognitive core not initialized")
        }
        (CoreStatus::Degraded, health) => check(
            "cognitive_core",
            CheckStatus::Warn,
            format!("cognitive core degraded (health {})", health),
        ),
        (CoreStatus::Active, _) => check(
            "cognitive_core",
            CheckStatus::Pass,
            format!("active at stage {}", state.evolution_timeline.current_stage),
        ),
    }
}

fn memory_resonance(state: &DeepTreeEchoState) -> DiagnosticCheck {
    let r = state.memory_resonance;
    let max_edges = r.memory_nodes.saturating_mul(r.memory_nodes.saturating_sub(1)) / 2;
    if r.connections > max_edges {
        check(
            "memory_resonance",
            CheckStatus::Fail,
            format!("{} connections exceed what {} nodes allow", r.connections, r.memory_nodes),
        )
    } else if r.memory_nodes == 0 {
        check("memory_resonance", CheckStatus::Warn, "memory graph is empty")
    } else {
        check(
            "memory_resonance",
            CheckStatus::Pass,
            format!(
                "{} nodes, {} connections, {} hyperedges",
                r.memory_nodes, r.connections, r.hyperedges
            ),
        )
    }
}

/// Run the full battery.
pub fn run(state: &DeepTreeEchoState, inputs: &DiagnosticInputs) -> DiagnosticResult {
    let tests = vec![
        capability_registry(inputs),
        agent_pool(inputs),
        cognitive_state_ranges(state),
        integrations(state),
        cognitive_core(state),
        memory_resonance(state),
    ];
    let overall_health = tests.iter().map(|t| t.status).max().unwrap_or(CheckStatus::Pass);
    DiagnosticResult { overall_health, timestamp: Utc::now(), tests }
}
