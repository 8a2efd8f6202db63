//! Introspection - salience scoring of a directory tree
//!
//! Every visited file gets a score in `[0, 1)`:
//!
//! ```text
//! c     = 0.7 * category_weight(file) + 0.3 * 1 / (1 + depth)
//! n     = 0.5 ^ ((newest_mtime - mtime) / half_life)
//! s     = coherence_weight * c + novelty_weight * n
//! score = s / (1 + s)
//! ```
//!
//! `c` and `n` are both in `[0, 1]` and the weights are non-negative, so the
//! score never decreases when either weight grows. Novelty is measured
//! against the newest file of the same scan, which makes re-scanning an
//! unchanged tree reproduce the same scores.
//!
//! The attention threshold is the nearest-rank percentile of the score
//! distribution. Files scoring at or above it are salient.

use crate::config::IntrospectionConfig;
use deeptree_core::{Error, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Weights of the two salience signals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SalienceWeights {
    pub coherence: f64,
    pub novelty: f64,
}

impl SalienceWeights {
    pub fn new(coherence: f64, novelty: f64) -> Result<Self> {
        for (name, w) in [("coherence_weight", coherence), ("novelty_weight", novelty)] {
            if !w.is_finite() || w < 0.0 {
                return Err(Error::InvalidParameter(format!(
                    "{} must be a finite, non-negative number, got {}",
                    name, w
                )));
            }
        }
        Ok(Self { coherence, novelty })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalientFile {
    /// Path relative to the scan root, `/`-separated.
    pub path: String,
    pub salience: f64,
    pub coherence: f64,
    pub novelty: f64,
    /// Directories between the root and the file.
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedPath {
    pub path: String,
    pub reason: String,
}

/// Result of one scan, before it is folded into the memory graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CognitiveSnapshot {
    pub root: PathBuf,
    pub processed_files: usize,
    pub filtered_files: usize,
    pub attention_threshold: f64,
    pub salient_files: Vec<SalientFile>,
    pub skipped: Vec<SkippedPath>,
}

impl CognitiveSnapshot {
    /// Mean coherence of the salient files, if any.
    pub fn mean_coherence(&self) -> Option<f64> {
        if self.salient_files.is_empty() {
            return None;
        }
        let sum: f64 = self.salient_files.iter().map(|f| f.coherence).sum();
        Some(sum / self.salient_files.len() as f64)
    }

    /// Deepest nesting among salient files.
    pub fn tree_depth(&self) -> usize {
        self.salient_files.iter().map(|f| f.depth).max().unwrap_or(0)
    }
}

/// What folding a snapshot did to the memory graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoIntegration {
    pub nodes_created: usize,
    pub edges_created: usize,
    pub tree_depth: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntrospectionResult {
    pub cognitive_snapshot: CognitiveSnapshot,
    pub echo_integration: EchoIntegration,
}

const SOURCE_EXTENSIONS: &[&str] = &[
    "rs", "go", "py", "ts", "tsx", "js", "jsx", "c", "h", "cc", "cpp", "hpp", "java", "kt",
    "swift", "rb", "sh",
];
const CONFIG_EXTENSIONS: &[&str] = &["toml", "json", "yaml", "yml", "mod", "ini", "cfg"];
const CONFIG_NAMES: &[&str] = &["Makefile", "Dockerfile", "CMakeLists.txt"];
const DOC_EXTENSIONS: &[&str] = &["md", "txt", "rst", "adoc"];
const OPAQUE_EXTENSIONS: &[&str] = &[
    "lock", "sum", "png", "jpg", "jpeg", "gif", "ico", "pdf", "zip", "gz", "tar", "so", "dylib",
    "dll", "exe", "bin", "wasm", "o", "a", "class", "jar",
];

/// Structural weight of a file by kind: source 1.0, config/build 0.8,
/// docs 0.6, lockfiles and binaries 0.1, anything else 0.3.
pub fn category_weight(path: &Path) -> f64 {
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    if CONFIG_NAMES.contains(&&*name) {
        return 0.8;
    }
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        e if SOURCE_EXTENSIONS.contains(&e) => 1.0,
        e if CONFIG_EXTENSIONS.contains(&e) => 0.8,
        e if DOC_EXTENSIONS.contains(&e) => 0.6,
        e if OPAQUE_EXTENSIONS.contains(&e) => 0.1,
        _ => 0.3,
    }
}

/// Nearest-rank percentile of `scores`; 0.0 when there are none.
pub fn attention_threshold(scores: &[f64], percentile: f64) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (percentile.clamp(0.0, 1.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

fn score(weights: SalienceWeights, coherence: f64, novelty: f64) -> f64 {
    let s = weights.coherence * coherence + weights.novelty * novelty;
    s / (1.0 + s)
}

struct Candidate {
    path: String,
    depth: usize,
    category: f64,
    mtime: SystemTime,
}

/// Walks a tree and scores its files. Holds no state between scans.
pub struct Scanner {
    config: IntrospectionConfig,
    ignore: GlobSet,
}

impl Scanner {
    pub fn new(config: IntrospectionConfig) -> Result<Self> {
        config.validate()?;
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.ignore {
            let glob = Glob::new(pattern)
                .map_err(|e| Error::Config(format!("invalid ignore pattern '{}': {}", pattern, e)))?;
            builder.add(glob);
        }
        let ignore = builder
            .build()
            .map_err(|e| Error::Config(format!("invalid ignore patterns: {}", e)))?;
        Ok(Self { config, ignore })
    }

    pub fn config(&self) -> &IntrospectionConfig {
        &self.config
    }

    fn is_ignored(&self, root: &Path, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        if self.config.skip_hidden && name.starts_with('.') {
            return true;
        }
        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        self.ignore.is_match(rel) || self.ignore.is_match(&*name)
    }

    /// Score every reachable file under `root`. Blocking; run it off the
    /// async executor.
    pub fn scan(&self, root: &Path, weights: SalienceWeights) -> Result<CognitiveSnapshot> {
        if !root.exists() {
            return Err(Error::PathNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(Error::InvalidParameter(format!(
                "introspection root is not a directory: {}",
                root.display()
            )));
        }
        let root = root.canonicalize()?;

        let mut candidates = Vec::new();
        let mut skipped = Vec::new();

        let walker = WalkDir::new(&root)
            .follow_links(false)
            .max_depth(self.config.max_depth.saturating_add(1))
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_ignored(&root, e));

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| relative(&root, p))
                        .unwrap_or_else(|| ".".to_string());
                    warn!("introspection skipped {}: {}", path, e);
                    skipped.push(SkippedPath { path, reason: e.to_string() });
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = relative(&root, entry.path());
            let mtime = match entry.metadata().map_err(|e| e.to_string()).and_then(|m| {
                m.modified().map_err(|e| e.to_string())
            }) {
                Ok(t) => t,
                Err(reason) => {
                    warn!("introspection skipped {}: {}", path, reason);
                    skipped.push(SkippedPath { path, reason });
                    continue;
                }
            };
            candidates.push(Candidate {
                depth: entry.depth().saturating_sub(1),
                category: category_weight(entry.path()),
                path,
                mtime,
            });
        }

        let newest = candidates.iter().map(|c| c.mtime).max();
        let half_life = self.config.half_life_secs as f64;
        let scored: Vec<SalientFile> = candidates
            .into_iter()
            .map(|c| {
                let age = newest
                    .and_then(|n| n.duration_since(c.mtime).ok())
                    .map(|d| d.as_secs_f64())
                    .unwrap_or(0.0);
                let coherence = 0.7 * c.category + 0.3 / (1.0 + c.depth as f64);
                let novelty = 0.5_f64.powf(age / half_life);
                SalientFile {
                    salience: score(weights, coherence, novelty),
                    coherence,
                    novelty,
                    depth: c.depth,
                    path: c.path,
                }
            })
            .collect();

        let processed_files = scored.len();
        let scores: Vec<f64> = scored.iter().map(|f| f.salience).collect();
        let threshold = attention_threshold(&scores, self.config.attention_percentile);

        let mut salient_files: Vec<SalientFile> =
            scored.into_iter().filter(|f| f.salience >= threshold).collect();
        salient_files.sort_by(|a, b| {
            b.salience.total_cmp(&a.salience).then_with(|| a.path.cmp(&b.path))
        });
        let filtered_files = processed_files - salient_files.len();

        info!(
            "introspection of {}: {} processed, {} salient, {} filtered, {} skipped (threshold {:.3})",
            root.display(),
            processed_files,
            salient_files.len(),
            filtered_files,
            skipped.len(),
            threshold
        );
        debug!("top salient: {:?}", salient_files.first().map(|f| &f.path));

        Ok(CognitiveSnapshot {
            root,
            processed_files,
            filtered_files,
            attention_threshold: threshold,
            salient_files,
            skipped,
        })
    }
}

fn relative(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
