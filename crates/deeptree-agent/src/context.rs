//! Bounded context window with FIFO eviction

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextRole {
    Input,
    Output,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextItem {
    pub role: ContextRole,
    pub content: String,
    pub task_id: String,
    pub at: DateTime<Utc>,
}

/// Ring buffer of context items. Holds at most `capacity` items; pushing
/// into a full window evicts the oldest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextWindow {
    capacity: usize,
    items: VecDeque<ContextItem>,
    evicted: u64,
}

impl ContextWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { capacity, items: VecDeque::with_capacity(capacity), evicted: 0 }
    }

    /// Append an item, returning the evicted one if the window was full.
    pub fn push(&mut self, item: ContextItem) -> Option<ContextItem> {
        let evicted = if self.items.len() >= self.capacity {
            self.evicted += 1;
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items dropped so far to stay within capacity.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ContextItem> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&ContextItem> {
        self.items.get(index)
    }

    pub fn last(&self) -> Option<&ContextItem> {
        self.items.back()
    }

    /// Contents of the `n` newest items, oldest first.
    pub fn recent(&self, n: usize) -> Vec<String> {
        let skip = self.items.len().saturating_sub(n);
        self.items.iter().skip(skip).map(|i| i.content.clone()).collect()
    }
}
