//! DeepTree Cognition - the engine's self-model
//!
//! - `introspection`: salience scoring of a directory tree
//! - `graph`: memory-resonance graph fed by introspection and task activity
//! - `state`: the DeepTreeEcho state snapshot types
//! - `tracker`: lock-guarded owner of the state
//! - `diagnostics`: self-check battery
//! - `backend`: analysis backend used by Reflect and Analyze tasks

pub mod backend;
pub mod config;
pub mod diagnostics;
pub mod graph;
pub mod introspection;
pub mod state;
pub mod tracker;

pub use backend::{CognitiveBackend, DepthLevel, LocalEchoBackend};
pub use config::{CognitionConfig, GraphConfig, IntrospectionConfig};
pub use diagnostics::{CheckStatus, DiagnosticCheck, DiagnosticInputs, DiagnosticResult};
pub use graph::{FoldPlan, FoldStats, MemoryGraph, MemoryNode, NodeKind};
pub use introspection::{
    CognitiveSnapshot, EchoIntegration, IntrospectionResult, SalienceWeights, SalientFile,
    Scanner, SkippedPath,
};
pub use state::{
    CapabilityProbe, CoreStatus, DeepTreeEchoState, EvolutionStage, IdentityCoherence,
    Integration, IntegrationHealth, IntegrationStatus, MemoryResonance, SystemHealth,
};
pub use tracker::{CognitiveTracker, TaskOutcome};
