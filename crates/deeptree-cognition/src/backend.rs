//! Cognitive backend trait
//!
//! Reflect and Analyze tasks hand their text to a backend. The default
//! backend is local and deterministic; other backends plug in behind the
//! same trait.

use deeptree_core::{Error, Parameters, Result};
use deeptree_tools::text;

/// Analysis depth requested through `parameters["depth_level"]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthLevel {
    Surface,
    Deep,
    Recursive,
}

impl DepthLevel {
    pub fn from_params(params: &Parameters) -> Result<Self> {
        match params.opt_str("depth_level")? {
            None | Some("surface") => Ok(Self::Surface),
            Some("deep") => Ok(Self::Deep),
            Some("recursive") => Ok(Self::Recursive),
            Some(other) => Err(Error::InvalidParameter(format!(
                "depth_level must be surface, deep or recursive, got '{}'",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Surface => "surface",
            Self::Deep => "deep",
            Self::Recursive => "recursive",
        }
    }

    fn keyword_limit(self) -> usize {
        match self {
            Self::Surface => 3,
            Self::Deep => 5,
            Self::Recursive => 8,
        }
    }
}

#[async_trait::async_trait]
pub trait CognitiveBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the backend can serve requests right now.
    async fn is_available(&self) -> bool {
        true
    }

    async fn analyze(&self, text: &str, config: &Parameters) -> Result<String>;
}

/// Keyword and structure summary computed in-process.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalEchoBackend;

#[async_trait::async_trait]
impl CognitiveBackend for LocalEchoBackend {
    fn name(&self) -> &str {
        "local_echo"
    }

    async fn analyze(&self, input: &str, config: &Parameters) -> Result<String> {
        if input.trim().is_empty() {
            return Err(Error::InvalidParameter("nothing to analyze: input is empty".into()));
        }
        let depth = DepthLevel::from_params(config)?;
        let scope = config.opt_str("analysis_scope")?.unwrap_or("focused");

        let themes: Vec<String> = text::keywords(input, depth.keyword_limit())
            .into_iter()
            .map(|(term, count)| format!("{} ({})", term, count))
            .collect();
        let terms = text::token_set(input).len();
        let sentences = text::sentences(input).len();

        Ok(format!(
            "analysis [depth={}, scope={}]: {} sentences, {} distinct terms; themes: {}",
            depth.as_str(),
            scope,
            sentences,
            terms,
            if themes.is_empty() { "none".to_string() } else { themes.join(", ") }
        ))
    }
}
