//! Glob tool - workspace files matching a pattern

use super::workspace::Workspace;
use crate::registry::{Tool, ToolContext, ToolResult};
use deeptree_core::{Error, Parameters, Result};
use globset::GlobBuilder;
use serde_json::{json, Value};
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

const MAX_RESULTS: usize = 200;
const SKIPPED_DIRS: [&str; 2] = ["node_modules", "target"];

pub struct GlobTool {
    workspace: Workspace,
}

impl GlobTool {
    pub fn new(workspace_root: impl AsRef<Path>) -> Self {
        Self { workspace: Workspace::new(workspace_root) }
    }

    fn find(&self, params: &Parameters) -> Result<Vec<String>> {
        let pattern = params.get_str("pattern")?;
        let base = self.workspace.subdir(params.opt_str("path")?)?;
        let matcher = GlobBuilder::new(pattern)
            .literal_separator(false)
            .build()
            .map_err(|e| Error::InvalidParameter(format!("invalid glob pattern: {}", e)))?
            .compile_matcher();

        let walker = WalkDir::new(&base).sort_by_file_name().into_iter();
        let mut found = Vec::new();
        for entry in walker
            .filter_entry(|e| {
                let name = e.file_name().to_string_lossy();
                e.depth() == 0 || !(name.starts_with('.') || SKIPPED_DIRS.contains(&&*name))
            })
            .flatten()
        {
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(rel) = entry.path().strip_prefix(&base) {
                if matcher.is_match(rel) {
                    found.push(rel.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        found.sort();
        debug!("glob '{}': {} matches", pattern, found.len());
        Ok(found)
    }
}

#[async_trait::async_trait]
impl Tool for GlobTool {
    fn name(&self) -> &str { "glob" }

    fn description(&self) -> &str {
        "Workspace-relative paths matching a glob (`**` recurses), in lexical order."
    }

    fn is_read_only(&self) -> bool { true }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": { "type": "string", "description": "e.g. '**/*.rs'" },
                "path": { "type": "string", "description": "Subdirectory to search (default: root)" }
            },
            "required": ["pattern"]
        })
    }

    async fn execute(&self, _ctx: &ToolContext, params: &Parameters) -> ToolResult {
        let found = match self.find(params) {
            Ok(found) => found,
            Err(e) => return ToolResult::error(e.to_string()),
        };
        if found.is_empty() {
            return ToolResult::text("No files found");
        }
        let mut out = found.iter().take(MAX_RESULTS).cloned().collect::<Vec<_>>().join("\n");
        if found.len() > MAX_RESULTS {
            out.push_str(&format!("\n... ({} more)", found.len() - MAX_RESULTS));
        }
        ToolResult::text(out)
    }
}
