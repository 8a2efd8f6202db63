//! Cognitive layer configuration
//!
//! Sections are composed into the engine-wide config file. Every section
//! falls back to its defaults field-by-field.

use deeptree_core::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntrospectionConfig {
    /// Nearest-rank percentile of the score distribution used as the
    /// attention threshold (0.0 - 1.0).
    pub attention_percentile: f64,
    /// Age, relative to the newest file in the scan, at which novelty halves.
    pub half_life_secs: u64,
    /// Deepest directory nesting visited below the root.
    pub max_depth: usize,
    /// Skip dot-files and dot-directories.
    pub skip_hidden: bool,
    /// Glob patterns matched against each entry's path relative to the root
    /// and against its bare name. Matching directories are not descended.
    pub ignore: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Link each file to its directory node and each directory to its
    /// parent, up to the scan root.
    pub ancestry_edges: bool,
    /// Link nodes whose names share topic tokens.
    pub topic_edges: bool,
    /// Shared topic tokens needed for a topical edge.
    pub min_shared_topics: usize,
    /// Topic tokens carried by more files than this are too common to link by.
    pub max_topic_fanout: usize,
    /// Memory nodes kept across all agents. The oldest are evicted first.
    pub memory_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CognitionConfig {
    /// Task outcomes kept for health and stability.
    pub outcome_window: usize,
    /// Introspection coherence samples kept for identity coherence.
    pub introspection_history: usize,
}

// ============================================================
// Defaults
// ============================================================

impl Default for IntrospectionConfig {
    fn default() -> Self {
        Self {
            attention_percentile: 0.6,
            half_life_secs: 7 * 24 * 60 * 60,
            max_depth: 32,
            skip_hidden: true,
            ignore: vec![".git".into(), "target".into(), "node_modules".into()],
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            ancestry_edges: true,
            topic_edges: true,
            min_shared_topics: 1,
            max_topic_fanout: 8,
            memory_capacity: 4096,
        }
    }
}

impl Default for CognitionConfig {
    fn default() -> Self {
        Self { outcome_window: 64, introspection_history: 8 }
    }
}

// ============================================================
// Validation
// ============================================================

impl IntrospectionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.attention_percentile) {
            return Err(Error::Config(format!(
                "introspection.attention_percentile must be within [0, 1], got {}",
                self.attention_percentile
            )));
        }
        if self.half_life_secs == 0 {
            return Err(Error::Config("introspection.half_life_secs must be positive".into()));
        }
        Ok(())
    }
}

impl GraphConfig {
    pub fn validate(&self) -> Result<()> {
        if self.topic_edges && self.min_shared_topics == 0 {
            return Err(Error::Config("graph.min_shared_topics must be at least 1".into()));
        }
        if self.topic_edges && self.max_topic_fanout < 2 {
            return Err(Error::Config("graph.max_topic_fanout must be at least 2".into()));
        }
        if self.memory_capacity == 0 {
            return Err(Error::Config("graph.memory_capacity must be positive".into()));
        }
        Ok(())
    }
}

impl CognitionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.outcome_window == 0 || self.introspection_history == 0 {
            return Err(Error::Config(
                "cognition.outcome_window and cognition.introspection_history must be positive".into(),
            ));
        }
        Ok(())
    }
}
