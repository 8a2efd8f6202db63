//! Small text utilities shared by tools, plugins and the cognitive layer.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

const STOPWORDS: &[&str] = &[
    "about", "after", "also", "and", "are", "been", "but", "can", "for", "from", "had", "has",
    "have", "into", "its", "not", "our", "than", "that", "the", "their", "them", "then", "there",
    "these", "they", "this", "those", "using", "was", "were", "what", "when", "which", "while",
    "with", "would", "you", "your",
];

fn word_re() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"[A-Za-z][A-Za-z0-9]*").expect("word pattern is valid"))
}

fn sentence_re() -> &'static Regex {
    static SENTENCE: OnceLock<Regex> = OnceLock::new();
    SENTENCE.get_or_init(|| Regex::new(r"[^.!?\n]+[.!?]*").expect("sentence pattern is valid"))
}

/// Lowercased words of at least three characters, stopwords removed, in order.
pub fn tokens(text: &str) -> Vec<String> {
    word_re()
        .find_iter(text)
        .map(|m| m.as_str().to_ascii_lowercase())
        .filter(|w| w.len() >= 3 && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Distinct tokens of `text`.
pub fn token_set(text: &str) -> BTreeSet<String> {
    tokens(text).into_iter().collect()
}

/// Split an identifier-ish string (`salience_engine`, `MemoryGraph.rs`) into topic tokens.
pub fn identifier_topics(name: &str) -> BTreeSet<String> {
    let mut spaced = String::with_capacity(name.len() + 8);
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch.is_ascii_uppercase() && prev_lower {
            spaced.push(' ');
        }
        prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        spaced.push(if ch.is_alphanumeric() { ch } else { ' ' });
    }
    token_set(&spaced)
}

/// Non-empty trimmed sentences.
pub fn sentences(text: &str) -> Vec<&str> {
    sentence_re()
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Top `limit` tokens by frequency, ties broken alphabetically.
pub fn keywords(text: &str, limit: usize) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for t in tokens(text) {
        *counts.entry(t).or_default() += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}
