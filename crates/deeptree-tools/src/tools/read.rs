//! Read tool - numbered lines of one workspace file

use super::workspace::Workspace;
use crate::registry::{Tool, ToolContext, ToolResult};
use deeptree_core::{Parameters, Result};
use serde_json::{json, Value};
use std::path::Path;
use tracing::debug;

const DEFAULT_LIMIT: usize = 2000;

pub struct ReadTool {
    workspace: Workspace,
}

impl ReadTool {
    pub fn new(workspace_root: impl AsRef<Path>) -> Self {
        Self { workspace: Workspace::new(workspace_root) }
    }

    async fn read(&self, params: &Parameters) -> Result<String> {
        let path = match params.opt_str("file_path")? {
            Some(p) => p,
            None => params.get_str("path")?,
        };
        let first = params.opt_i64("offset")?.unwrap_or(1).max(1) as usize;
        let limit = params
            .opt_i64("limit")?
            .map_or(DEFAULT_LIMIT, |l| l.max(0) as usize);

        let file = self.workspace.existing(path)?;
        let content = tokio::fs::read_to_string(&file).await?;

        let mut out = Vec::new();
        let mut total = 0;
        for (n, line) in content.lines().enumerate() {
            total = n + 1;
            if total >= first && out.len() < limit {
                out.push(format!("{:>6}\t{}", total, line));
            }
        }
        debug!("read {}: {} of {} lines", path, out.len(), total);

        if out.is_empty() {
            Ok(format!("(no lines in range; file has {} lines)", total))
        } else {
            Ok(out.join("\n"))
        }
    }
}

#[async_trait::async_trait]
impl Tool for ReadTool {
    fn name(&self) -> &str { "read" }

    fn description(&self) -> &str {
        "Numbered lines of a workspace file, optionally windowed by offset and limit."
    }

    fn is_read_only(&self) -> bool { true }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": { "type": "string", "description": "Path inside the workspace" },
                "offset": { "type": "integer", "description": "First line, 1-indexed" },
                "limit": { "type": "integer", "description": "Line cap (default 2000)" }
            },
            "required": ["file_path"]
        })
    }

    async fn execute(&self, _ctx: &ToolContext, params: &Parameters) -> ToolResult {
        match self.read(params).await {
            Ok(text) => ToolResult::text(text),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}
