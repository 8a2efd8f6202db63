//! Confinement of file tools to one workspace directory

use deeptree_core::{Error, Result};
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self { root: root.canonicalize().unwrap_or_else(|_| root.to_path_buf()) }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Canonical path of an existing file or directory inside the workspace.
    /// Relative paths are taken from the root; symlinks are followed before
    /// the containment check.
    pub fn existing(&self, path: &str) -> Result<PathBuf> {
        let candidate = self.root.join(path);
        let resolved = candidate
            .canonicalize()
            .map_err(|_| Error::PathNotFound(candidate.clone()))?;
        if resolved.starts_with(&self.root) {
            Ok(resolved)
        } else {
            Err(Error::InvalidParameter(format!("path escapes workspace: {}", path)))
        }
    }

    /// A workspace-relative directory, checked lexically. Absolute paths and
    /// parent components are refused.
    pub fn subdir(&self, rel: Option<&str>) -> Result<PathBuf> {
        let Some(rel) = rel else {
            return Ok(self.root.clone());
        };
        let lexical_ok = Path::new(rel)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !lexical_ok {
            return Err(Error::InvalidParameter(format!(
                "path must be workspace-relative: {}",
                rel
            )));
        }
        Ok(self.root.join(rel))
    }
}
