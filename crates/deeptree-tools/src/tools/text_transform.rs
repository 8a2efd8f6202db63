//! Text transform tool - deterministic string rewrites

use crate::registry::{Tool, ToolContext, ToolResult};
use deeptree_core::Parameters;
use serde_json::{json, Value};

const OPERATIONS: &[&str] = &["upper", "lower", "reverse", "title", "trim"];

pub struct TextTransformTool;

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait::async_trait]
impl Tool for TextTransformTool {
    fn name(&self) -> &str { "text_transform" }

    fn description(&self) -> &str {
        "Apply a string operation (upper, lower, reverse, title, trim) to a text."
    }

    fn is_read_only(&self) -> bool { true }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "operation": {
                    "type": "string",
                    "enum": OPERATIONS,
                    "description": "Operation to apply"
                },
                "text": {
                    "type": "string",
                    "description": "Text to transform (default: task input)"
                }
            },
            "required": ["operation"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, params: &Parameters) -> ToolResult {
        let operation = match params.get_str("operation") {
            Ok(op) => op,
            Err(e) => return ToolResult::error(e.to_string()),
        };
        let body = match ctx.text(params) {
            Ok(t) => t,
            Err(e) => return ToolResult::error(e.to_string()),
        };

        let out = match operation {
            "upper" => body.to_uppercase(),
            "lower" => body.to_lowercase(),
            "reverse" => body.chars().rev().collect(),
            "title" => title_case(body),
            "trim" => body.trim().to_string(),
            other => {
                return ToolResult::error(format!(
                    "Unknown operation '{}' (expected one of: {})",
                    other,
                    OPERATIONS.join(", ")
                ))
            }
        };
        ToolResult::text(out)
    }
}
