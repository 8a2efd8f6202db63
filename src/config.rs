//! Engine configuration
//!
//! All tunable parameters in one place. Loaded from TOML at startup,
//! falls back to defaults if no config file exists.

use deeptree_agent::{AgentConfig, ExecutionConfig};
use deeptree_cognition::{CognitionConfig, GraphConfig, IntrospectionConfig};
use deeptree_core::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Per-agent context and memory bounds.
    pub agents: AgentConfig,
    /// Task deadlines.
    pub execution: ExecutionConfig,
    /// Salience scan parameters.
    pub introspection: IntrospectionConfig,
    /// Memory graph edge rules.
    pub graph: GraphConfig,
    /// Rolling windows behind health and coherence.
    pub cognition: CognitionConfig,
}

impl EngineConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {} - using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {} - using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.introspection.validate()?;
        self.graph.validate()?;
        self.cognition.validate()?;
        Ok(())
    }
}
