//! core::graph
//!
//! In-memory org graph built from a snapshot of node records.
//!
//! # Architecture
//!
//! The org graph is a forest where:
//! - Vertices are node ids
//! - Edges point from worker to boss (the `boss` field of each record)
//! - Nodes without a boss (the root, boss-less admins) have no outgoing edge
//!
//! The async ancestry walk in [`crate::hierarchy`] reads the store one hop
//! at a time. This graph answers the same structural questions over a
//! loaded snapshot and is used by verification, the doctor, and the tree
//! view.
//!
//! # Invariants
//!
//! - Every node has at most one parent
//! - Traversals terminate even if the snapshot contains a cycle

use std::collections::{HashMap, HashSet, VecDeque};

use super::node::Node;
use super::types::NodeId;

/// Worker-to-boss relation over a snapshot.
#[derive(Debug, Default, Clone)]
pub struct OrgGraph {
    /// Every node in the snapshot, with or without a boss
    nodes: HashSet<NodeId>,
    /// Boss pointer for each worker
    parents: HashMap<NodeId, NodeId>,
    /// Cached worker sets (derived from parents)
    children: HashMap<NodeId, HashSet<NodeId>>,
}

impl OrgGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from node records.
    ///
    /// Boss ids that do not appear in `nodes` still get an edge, so dangling
    /// references stay visible to callers.
    pub fn from_nodes<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> Self {
        let mut graph = Self::new();
        for node in nodes {
            graph.add_node(node.id);
            if let Some(boss) = node.boss {
                graph.add_edge(node.id, boss);
            }
        }
        graph
    }

    pub fn add_node(&mut self, id: NodeId) {
        self.nodes.insert(id);
    }

    /// Record that `worker` reports to `boss`.
    ///
    /// Replaces any previous boss of `worker` and keeps the children cache
    /// in sync.
    pub fn add_edge(&mut self, worker: NodeId, boss: NodeId) {
        if let Some(old) = self.parents.insert(worker, boss) {
            if let Some(set) = self.children.get_mut(&old) {
                set.remove(&worker);
            }
        }
        self.children.entry(boss).or_default().insert(worker);
        self.nodes.insert(worker);
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains(id)
    }

    pub fn parent(&self, id: &NodeId) -> Option<&NodeId> {
        self.parents.get(id)
    }

    pub fn children(&self, id: &NodeId) -> Option<&HashSet<NodeId>> {
        self.children.get(id)
    }

    /// Workers of `id`, sorted for stable output.
    pub fn sorted_children(&self, id: &NodeId) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self
            .children(id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        out.sort();
        out
    }

    /// Number of direct workers of `id`.
    pub fn child_count(&self, id: &NodeId) -> usize {
        self.children(id).map_or(0, HashSet::len)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.iter()
    }

    /// Nodes that have no boss edge.
    pub fn tops(&self) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|id| !self.parents.contains_key(id))
            .copied()
            .collect();
        out.sort();
        out
    }

    /// Check if the graph contains a cycle.
    ///
    /// Returns `Some(id)` for a node that lies on a cycle. Each node has at
    /// most one boss, so every walk is a simple chain and the search runs
    /// without recursion.
    pub fn find_cycle(&self) -> Option<NodeId> {
        let mut done: HashSet<NodeId> = HashSet::new();

        let mut starts: Vec<&NodeId> = self.parents.keys().collect();
        starts.sort();

        for start in starts {
            if done.contains(start) {
                continue;
            }
            let mut on_path: Vec<NodeId> = Vec::new();
            let mut on_path_set: HashSet<NodeId> = HashSet::new();
            let mut current = Some(*start);

            while let Some(id) = current {
                if on_path_set.contains(&id) {
                    return Some(id);
                }
                if done.contains(&id) {
                    break;
                }
                on_path.push(id);
                on_path_set.insert(id);
                current = self.parents.get(&id).copied();
            }
            done.extend(on_path);
        }
        None
    }

    /// All nodes below `id` (workers, their workers, and so on).
    ///
    /// # Example
    ///
    /// ```
    /// use orgtree::core::graph::OrgGraph;
    /// use orgtree::core::types::NodeId;
    ///
    /// let (root, a, b) = (NodeId::new(), NodeId::new(), NodeId::new());
    /// let mut graph = OrgGraph::new();
    /// graph.add_edge(a, root);
    /// graph.add_edge(b, a);
    ///
    /// let below = graph.descendants(&root);
    /// assert!(below.contains(&a));
    /// assert!(below.contains(&b));
    /// ```
    pub fn descendants(&self, id: &NodeId) -> HashSet<NodeId> {
        let mut result = HashSet::new();
        let mut queue = VecDeque::new();

        if let Some(children) = self.children(id) {
            queue.extend(children.iter().copied());
        }

        while let Some(current) = queue.pop_front() {
            if current != *id && result.insert(current) {
                if let Some(children) = self.children(&current) {
                    queue.extend(children.iter().copied());
                }
            }
        }

        result
    }

    /// Boss chain of `id`, nearest first.
    ///
    /// Stops before repeating a node, so a corrupted snapshot yields a
    /// finite list.
    ///
    /// # Example
    ///
    /// ```
    /// use orgtree::core::graph::OrgGraph;
    /// use orgtree::core::types::NodeId;
    ///
    /// let (root, a, b) = (NodeId::new(), NodeId::new(), NodeId::new());
    /// let mut graph = OrgGraph::new();
    /// graph.add_edge(a, root);
    /// graph.add_edge(b, a);
    ///
    /// assert_eq!(graph.ancestors(&b), vec![a, root]);
    /// ```
    pub fn ancestors(&self, id: &NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut seen = HashSet::from([*id]);
        let mut current = self.parent(id);

        while let Some(boss) = current {
            if !seen.insert(*boss) {
                break;
            }
            result.push(*boss);
            current = self.parent(boss);
        }

        result
    }

    /// Whether `candidate` appears on the boss chain of `id`.
    pub fn is_strict_ancestor(&self, candidate: &NodeId, id: &NodeId) -> bool {
        candidate != id && self.ancestors(id).contains(candidate)
    }

    /// Nodes sorted by depth from the top, then by id.
    ///
    /// Bosses come before their workers.
    pub fn topological_order(&self) -> Vec<NodeId> {
        let mut by_depth: Vec<(usize, NodeId)> = self
            .nodes
            .iter()
            .map(|id| (self.ancestors(id).len(), *id))
            .collect();

        by_depth.sort();

        by_depth.into_iter().map(|(_, id)| id).collect()
    }
}
