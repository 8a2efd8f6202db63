//! Data analysis plugin - numeric statistics and hypergraph structure of a text
//!
//! `hypergraph_analysis` treats every distinct term as a node and every
//! sentence as a hyperedge joining the terms it contains.

use crate::registry::{Plugin, ToolContext, ToolResult};
use crate::text;
use deeptree_core::Parameters;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

const HUB_LIMIT: usize = 5;

pub struct DataAnalysisPlugin;

fn numbers(body: &str) -> Vec<f64> {
    body.split(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .filter(|s| s.chars().any(|c| c.is_ascii_digit()))
        .filter_map(|s| s.trim_matches('.').parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .collect()
}

fn statistics(body: &str) -> Value {
    let values = numbers(body);
    if values.is_empty() {
        let tokens = text::tokens(body);
        let distinct = tokens.iter().collect::<BTreeSet<_>>().len();
        let mean_len = if tokens.is_empty() {
            0.0
        } else {
            tokens.iter().map(|t| t.len()).sum::<usize>() as f64 / tokens.len() as f64
        };
        return json!({
            "kind": "terms",
            "count": tokens.len(),
            "distinct": distinct,
            "mean_length": mean_len,
        });
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    json!({
        "kind": "numeric",
        "count": values.len(),
        "min": min,
        "max": max,
        "mean": mean,
        "std_dev": variance.sqrt(),
    })
}

fn hypergraph(body: &str) -> Value {
    let edges: Vec<BTreeSet<String>> = text::sentences(body)
        .into_iter()
        .map(text::token_set)
        .filter(|set| !set.is_empty())
        .collect();

    let mut degree: BTreeMap<&str, usize> = BTreeMap::new();
    for edge in &edges {
        for node in edge {
            *degree.entry(node.as_str()).or_default() += 1;
        }
    }

    let incidences: usize = edges.iter().map(|e| e.len()).sum();
    let density = if degree.is_empty() || edges.is_empty() {
        0.0
    } else {
        incidences as f64 / (degree.len() * edges.len()) as f64
    };

    let mut hubs: Vec<(&str, usize)> = degree.iter().map(|(k, v)| (*k, *v)).collect();
    hubs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    hubs.truncate(HUB_LIMIT);

    json!({
        "nodes": degree.len(),
        "hyperedges": edges.len(),
        "mean_edge_size": if edges.is_empty() { 0.0 } else { incidences as f64 / edges.len() as f64 },
        "density": density,
        "hubs": hubs.into_iter().map(|(term, d)| json!({"term": term, "degree": d})).collect::<Vec<_>>(),
    })
}

#[async_trait::async_trait]
impl Plugin for DataAnalysisPlugin {
    fn name(&self) -> &str { "data_analysis" }

    fn description(&self) -> &str {
        "Numeric/term statistics and hypergraph structure (terms as nodes, sentences as hyperedges)."
    }

    fn operations(&self) -> &[&'static str] {
        &["statistics", "hypergraph_analysis"]
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

        let mut report = match operation {
            "hypergraph_analysis" => hypergraph(body),
            _ => statistics(body),
        };
        report["operation"] = json!(operation);
        if let Ok(Some(integration)) = params.opt_str("cognitive_integration") {
            report["integration"] = json!(integration);
        }
        ToolResult::Json(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_extracts_signed_and_decimal() {
        assert_eq!(numbers("a 3, b -2.5 and 10."), vec![3.0, -2.5, 10.0]);
    }

    #[test]
    fn hypergraph_counts_sentences_as_edges() {
        let report = hypergraph("Echo trees grow. Trees remember echoes. Memory grows.");
        assert_eq!(report["hyperedges"], 3);
        assert_eq!(report["hubs"][0]["term"], "trees");
    }
}
