//! Text processing plugin - keyword extraction and sentence segmentation

use crate::registry::{Plugin, ToolContext, ToolResult};
use crate::text;
use deeptree_core::Parameters;
use serde_json::json;

const DEFAULT_KEYWORDS: i64 = 5;

pub struct TextProcessingPlugin;

#[async_trait::async_trait]
impl Plugin for TextProcessingPlugin {
    fn name(&self) -> &str { "text_processing" }

    fn description(&self) -> &str {
        "Extract ranked keywords or split a text into sentences."
    }

    fn operations(&self) -> &[&'static str] {
        &["keywords", "sentences"]
    }

    async fn execute(&self, ctx: &ToolContext, params: &Parameters) -> ToolResult {
        let operation = match self.operation(params) {
            Ok(op) => op,
            Err(e) => return ToolResult::error(e.to_string()),
        };
        let body = match ctx.text(params) {
            Ok(t) => t,
            Err(e) => return ToolResult::error(e.to_string()),
        };

        match operation {
            "sentences" => {
                let sentences = text::sentences(body);
                ToolResult::Json(json!({
                    "operation": operation,
                    "count": sentences.len(),
                    "sentences": sentences,
                }))
            }
            _ => {
                let limit = match params.opt_i64("limit") {
                    Ok(l) => l.unwrap_or(DEFAULT_KEYWORDS).max(1) as usize,
                    Err(e) => return ToolResult::error(e.to_string()),
                };
                let keywords: Vec<_> = text::keywords(body, limit)
                    .into_iter()
                    .map(|(term, count)| json!({"term": term, "count": count}))
                    .collect();
                ToolResult::Json(json!({
                    "operation": operation,
                    "keywords": keywords,
                }))
            }
        }
    }
}
