//! Memory-resonance graph
//!
//! Nodes are keyed by identity string:
//!   directories   `<canonical root>[/<relative dir>]`
//!   file nodes    `<canonical root>/<relative path>`
//!   agent hubs    `agent://<agent id>`
//!   memories      `memory://<agent id>/<task id>`
//!
//! Edges are undirected. Ancestry runs file → directory → parent directory
//! up to the scan root, so files anywhere in one tree are connected. Topical
//! edges join files whose names share tokens, skipping tokens too common to
//! say anything. Each directory holding salient files also forms a hyperedge
//! over its file nodes.

use crate::config::GraphConfig;
use crate::introspection::CognitiveSnapshot;
use deeptree_core::AgentId;
use deeptree_tools::text;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Directory,
    Agent,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryNode {
    pub kind: NodeKind,
    /// Parent directory (file and directory nodes) or agent hub (memory nodes).
    pub group: Option<String>,
    pub topics: BTreeSet<String>,
    /// Latest salience for file nodes, 1.0 otherwise.
    pub weight: f64,
    pub visits: u32,
}

/// Counts produced by one fold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FoldStats {
    pub nodes_created: usize,
    pub edges_created: usize,
}

#[derive(Debug, Clone)]
struct PlannedFile {
    key: String,
    directory: String,
    topics: BTreeSet<String>,
    weight: f64,
}

/// Nodes and ancestry derived from a scan, built without touching a graph so
/// the string work happens outside any lock. [`MemoryGraph::apply`] merges it.
#[derive(Debug, Clone, Default)]
pub struct FoldPlan {
    files: Vec<PlannedFile>,
    /// Directory key → parent directory key, `None` at the scan root.
    directories: BTreeMap<String, Option<String>>,
}

impl FoldPlan {
    pub fn from_snapshot(snapshot: &CognitiveSnapshot) -> Self {
        let root = snapshot.root.to_string_lossy();
        let root = match root.trim_end_matches('/') {
            "" => "/".to_string(),
            trimmed => trimmed.to_string(),
        };
        let under_root = |rel: &str| -> String {
            if root.ends_with('/') {
                format!("{}{}", root, rel)
            } else {
                format!("{}/{}", root, rel)
            }
        };

        let mut plan = FoldPlan::default();
        if !snapshot.salient_files.is_empty() {
            plan.directories.insert(root.clone(), None);
        }
        for file in &snapshot.salient_files {
            let (dir_rel, name) = match file.path.rsplit_once('/') {
                Some((dir, name)) => (Some(dir), name),
                None => (None, file.path.as_str()),
            };
            let directory = dir_rel.map(|d| under_root(d)).unwrap_or_else(|| root.clone());

            // Register the directory and every ancestor below the root once.
            let mut current = dir_rel;
            while let Some(rel) = current {
                let key = under_root(rel);
                if plan.directories.contains_key(&key) {
                    break;
                }
                let parent_rel = rel.rsplit_once('/').map(|(p, _)| p);
                let parent = parent_rel.map(|p| under_root(p)).unwrap_or_else(|| root.clone());
                plan.directories.insert(key, Some(parent));
                current = parent_rel;
            }

            let stem = name.split('.').next().unwrap_or(name);
            plan.files.push(PlannedFile {
                key: under_root(file.path.as_str()),
                directory,
                topics: text::identifier_topics(stem),
                weight: file.salience,
            });
        }
        plan
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn directory_count(&self) -> usize {
        self.directories.len()
    }
}

#[derive(Debug, Clone)]
pub struct MemoryGraph {
    config: GraphConfig,
    nodes: BTreeMap<String, MemoryNode>,
    adjacency: BTreeMap<String, BTreeSet<String>>,
    edge_count: usize,
    hyperedges: BTreeMap<String, BTreeSet<String>>,
    /// Topic token → file nodes whose names carry it.
    topic_index: BTreeMap<String, BTreeSet<String>>,
    /// Memory node keys, oldest first.
    memories: VecDeque<String>,
}

impl MemoryGraph {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            nodes: BTreeMap::new(),
            adjacency: BTreeMap::new(),
            edge_count: 0,
            hyperedges: BTreeMap::new(),
            topic_index: BTreeMap::new(),
            memories: VecDeque::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn hyperedge_count(&self) -> usize {
        self.hyperedges.len()
    }

    pub fn node(&self, key: &str) -> Option<&MemoryNode> {
        self.nodes.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        self.adjacency.get(a).is_some_and(|n| n.contains(b))
    }

    /// Keys adjacent to `key`, in lexical order.
    pub fn neighbors(&self, key: &str) -> Vec<&str> {
        self.adjacency
            .get(key)
            .map(|n| n.iter().map(|s| s.as_str()).collect())
            .unwrap_or_default()
    }

    /// Members of the hyperedge for `directory`.
    pub fn hyperedge(&self, directory: &str) -> Option<&BTreeSet<String>> {
        self.hyperedges.get(directory)
    }

    fn upsert(&mut self, key: &str, node: MemoryNode) -> bool {
        match self.nodes.get_mut(key) {
            Some(existing) => {
                existing.visits += 1;
                existing.weight = node.weight;
                existing.topics.extend(node.topics);
                false
            }
            None => {
                self.nodes.insert(key.to_string(), node);
                true
            }
        }
    }

    fn link(&mut self, a: &str, b: &str) -> bool {
        if a == b || self.has_edge(a, b) {
            return false;
        }
        self.adjacency.entry(a.to_string()).or_default().insert(b.to_string());
        self.adjacency.entry(b.to_string()).or_default().insert(a.to_string());
        self.edge_count += 1;
        true
    }

    fn remove_node(&mut self, key: &str) {
        self.nodes.remove(key);
        for other in self.adjacency.remove(key).unwrap_or_default() {
            if let Some(back) = self.adjacency.get_mut(&other) {
                back.remove(key);
            }
            self.edge_count -= 1;
        }
    }

    /// Merge the salient files of a scan into the graph.
    pub fn fold_snapshot(&mut self, snapshot: &CognitiveSnapshot) -> FoldStats {
        self.apply(FoldPlan::from_snapshot(snapshot))
    }

    /// Merge a prepared plan. Work is proportional to the plan's files times
    /// their topics times `max_topic_fanout`.
    pub fn apply(&mut self, plan: FoldPlan) -> FoldStats {
        let mut stats = FoldStats::default();

        for (directory, parent) in &plan.directories {
            let node = MemoryNode {
                kind: NodeKind::Directory,
                group: parent.clone(),
                topics: BTreeSet::new(),
                weight: 1.0,
                visits: 1,
            };
            if self.upsert(directory, node) {
                stats.nodes_created += 1;
            }
            if let (true, Some(parent)) = (self.config.ancestry_edges, parent) {
                if self.link(directory, parent) {
                    stats.edges_created += 1;
                }
            }
        }

        let mut touched = Vec::with_capacity(plan.files.len());
        for file in plan.files {
            for topic in &file.topics {
                self.topic_index.entry(topic.clone()).or_default().insert(file.key.clone());
            }
            let node = MemoryNode {
                kind: NodeKind::File,
                group: Some(file.directory.clone()),
                topics: file.topics,
                weight: file.weight,
                visits: 1,
            };
            if self.upsert(&file.key, node) {
                stats.nodes_created += 1;
            }
            if self.config.ancestry_edges && self.link(&file.key, &file.directory) {
                stats.edges_created += 1;
            }
            self.hyperedges.entry(file.directory).or_default().insert(file.key.clone());
            touched.push(file.key);
        }

        if self.config.topic_edges {
            for key in &touched {
                for other in self.topical_partners(key) {
                    if self.link(key, &other) {
                        stats.edges_created += 1;
                    }
                }
            }
        }
        stats
    }

    /// Files sharing at least `min_shared_topics` uncommon tokens with `key`.
    fn topical_partners(&self, key: &str) -> Vec<String> {
        let Some(node) = self.nodes.get(key) else { return Vec::new() };
        let mut shared: BTreeMap<&str, usize> = BTreeMap::new();
        for topic in &node.topics {
            let Some(members) = self.topic_index.get(topic) else { continue };
            if members.len() > self.config.max_topic_fanout {
                continue;
            }
            for other in members.iter().filter(|m| m.as_str() != key) {
                *shared.entry(other.as_str()).or_default() += 1;
            }
        }
        shared
            .into_iter()
            .filter(|(_, n)| *n >= self.config.min_shared_topics)
            .map(|(other, _)| other.to_string())
            .collect()
    }

    /// Add a memory node for a completed task, linked to its agent's hub.
    /// Past `memory_capacity` the oldest memory is dropped with its edges.
    pub fn record_memory(&mut self, agent_id: &AgentId, task_id: &str, summary: &str) -> FoldStats {
        let mut stats = FoldStats::default();
        let hub = format!("agent://{}", agent_id);
        let hub_node = MemoryNode {
            kind: NodeKind::Agent,
            group: None,
            topics: BTreeSet::new(),
            weight: 1.0,
            visits: 1,
        };
        if self.upsert(&hub, hub_node) {
            stats.nodes_created += 1;
        }

        let key = format!("memory://{}/{}", agent_id, task_id);
        let memory = MemoryNode {
            kind: NodeKind::Memory,
            group: Some(hub.clone()),
            topics: text::keywords(summary, 5).into_iter().map(|(t, _)| t).collect(),
            weight: 1.0,
            visits: 1,
        };
        if self.upsert(&key, memory) {
            stats.nodes_created += 1;
            self.memories.push_back(key.clone());
        }
        if self.link(&key, &hub) {
            stats.edges_created += 1;
        }

        while self.memories.len() > self.config.memory_capacity {
            if let Some(oldest) = self.memories.pop_front() {
                self.remove_node(&oldest);
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspection::SalientFile;

    fn snapshot(paths: &[&str]) -> CognitiveSnapshot {
        CognitiveSnapshot {
            root: "/repo".into(),
            processed_files: paths.len(),
            filtered_files: 0,
            attention_threshold: 0.0,
            salient_files: paths
                .iter()
                .map(|p| SalientFile {
                    path: p.to_string(),
                    salience: 0.5,
                    coherence: 0.5,
                    novelty: 1.0,
                    depth: p.matches('/').count(),
                })
                .collect(),
            skipped: Vec::new(),
        }
    }

    #[test]
    fn files_hang_off_their_directory() {
        let mut graph = MemoryGraph::new(GraphConfig::default());
        let stats = graph.fold_snapshot(&snapshot(&["src/engine.rs", "src/config.rs", "README.md"]));
        // three files plus /repo and /repo/src
        assert_eq!(stats.nodes_created, 5);
        assert!(graph.has_edge("/repo/src/engine.rs", "/repo/src"));
        assert!(graph.has_edge("/repo/src/config.rs", "/repo/src"));
        assert!(graph.has_edge("/repo/src", "/repo"));
        assert!(graph.has_edge("/repo/README.md", "/repo"));
        assert_eq!(graph.node("/repo/src").map(|n| n.kind), Some(NodeKind::Directory));
        assert_eq!(graph.hyperedge_count(), 2);
        assert_eq!(graph.hyperedge("/repo/src").map(|h| h.len()), Some(2));
    }

    #[test]
    fn nested_directories_chain_to_parent() {
        let mut graph = MemoryGraph::new(GraphConfig::default());
        graph.fold_snapshot(&snapshot(&["src/alpha.rs", "src/tools/beta.rs"]));
        assert!(graph.has_edge("/repo/src/tools/beta.rs", "/repo/src/tools"));
        assert!(graph.has_edge("/repo/src/tools", "/repo/src"));
        assert!(graph.has_edge("/repo/src/alpha.rs", "/repo/src"));
        assert_eq!(graph.node("/repo/src/tools").and_then(|n| n.group.as_deref()), Some("/repo/src"));
    }

    #[test]
    fn deep_files_create_every_intermediate_directory() {
        let plan = FoldPlan::from_snapshot(&snapshot(&["a/b/c/d.rs"]));
        assert_eq!(plan.file_count(), 1);
        // /repo, /repo/a, /repo/a/b, /repo/a/b/c
        assert_eq!(plan.directory_count(), 4);
    }

    #[test]
    fn empty_snapshot_adds_nothing() {
        let mut graph = MemoryGraph::new(GraphConfig::default());
        assert_eq!(graph.fold_snapshot(&snapshot(&[])), FoldStats::default());
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn ancestry_can_be_switched_off() {
        let config = GraphConfig { ancestry_edges: false, topic_edges: false, ..GraphConfig::default() };
        let mut graph = MemoryGraph::new(config);
        let stats = graph.fold_snapshot(&snapshot(&["src/engine.rs", "src/config.rs"]));
        assert_eq!(stats.edges_created, 0);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn shared_topics_link_across_directories() {
        let mut graph = MemoryGraph::new(GraphConfig::default());
        graph.fold_snapshot(&snapshot(&["a/memory_graph.rs", "b/graph_view.rs"]));
        assert!(graph.has_edge("/repo/a/memory_graph.rs", "/repo/b/graph_view.rs"));
    }

    #[test]
    fn common_topics_do_not_link() {
        let mut graph = MemoryGraph::new(GraphConfig::default());
        let paths: Vec<String> = (0..20).map(|i| format!("d{}/handler_{}.rs", i, i)).collect();
        let refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
        graph.fold_snapshot(&snapshot(&refs));
        assert!(!graph.has_edge("/repo/d0/handler_0.rs", "/repo/d1/handler_1.rs"));
        // each file only reaches its own directory
        assert_eq!(graph.neighbors("/repo/d0/handler_0.rs"), vec!["/repo/d0"]);
    }

    #[test]
    fn edges_grow_linearly_with_files() {
        let mut graph = MemoryGraph::new(GraphConfig::default());
        let paths: Vec<String> = (0..2000).map(|i| format!("d{}/file_{}.rs", i % 10, i)).collect();
        let refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
        let stats = graph.fold_snapshot(&snapshot(&refs));
        assert_eq!(stats.nodes_created, 2000 + 11);
        // 2000 file→dir edges and 10 dir→root edges, "file" is too common to link
        assert_eq!(stats.edges_created, 2010);
    }

    #[test]
    fn refold_merges_by_path() {
        let mut graph = MemoryGraph::new(GraphConfig::default());
        let snap = snapshot(&["src/a.rs", "src/b.rs"]);
        graph.fold_snapshot(&snap);
        let again = graph.fold_snapshot(&snap);
        assert_eq!(again, FoldStats::default());
        assert_eq!(graph.node("/repo/src/a.rs").map(|n| n.visits), Some(2));
    }

    #[test]
    fn memories_hang_off_agent_hub() {
        let mut graph = MemoryGraph::new(GraphConfig::default());
        let agent = AgentId::new("agent-1");
        let first = graph.record_memory(&agent, "t1", "reflect on memory");
        let second = graph.record_memory(&agent, "t2", "analyze echoes");
        assert_eq!(first.nodes_created, 2);
        assert_eq!(second.nodes_created, 1);
        assert_eq!(graph.neighbors("agent://agent-1"), vec!["memory://agent-1/t1", "memory://agent-1/t2"]);
    }

    #[test]
    fn oldest_memories_are_evicted_past_capacity() {
        let config = GraphConfig { memory_capacity: 2, ..GraphConfig::default() };
        let mut graph = MemoryGraph::new(config);
        let agent = AgentId::new("agent-1");
        for t in ["t1", "t2", "t3"] {
            graph.record_memory(&agent, t, "reflect on memory");
        }
        assert!(!graph.contains("memory://agent-1/t1"));
        assert!(graph.contains("memory://agent-1/t3"));
        // hub plus two memories, one edge each
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.neighbors("agent://agent-1"), vec!["memory://agent-1/t2", "memory://agent-1/t3"]);
    }
}
