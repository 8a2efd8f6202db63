//! Text stats tool - counts over the task input or `text` parameter

use crate::registry::{Tool, ToolContext, ToolResult};
use crate::text;
use deeptree_core::Parameters;
use serde_json::{json, Value};

pub struct TextStatsTool;

#[async_trait::async_trait]
impl Tool for TextStatsTool {
    fn name(&self) -> &str { "text_stats" }

    fn description(&self) -> &str {
        "Count characters, words, lines, sentences and distinct terms of a text."
    }

    fn is_read_only(&self) -> bool { true }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "Text to measure (default: task input)"
                }
            }
        })
    }

    async fn execute(&self, ctx: &ToolContext, params: &Parameters) -> ToolResult {
        let body = match ctx.text(params) {
            Ok(t) => t,
            Err(e) => return ToolResult::error(e.to_string()),
        };

        ToolResult::Json(json!({
            "characters": body.chars().count(),
            "words": body.split_whitespace().count(),
            "lines": body.lines().count(),
            "sentences": text::sentences(body).len(),
            "distinct_terms": text::token_set(body).len(),
        }))
    }
}
