//! core::verify
//!
//! Verification of hierarchy invariants over a snapshot of node records.
//!
//! # Checks
//!
//! - Exactly one root, and the root has no boss
//! - No node is its own boss
//! - Every boss reference resolves to a stored node
//! - The boss relation is acyclic
//! - Each non-root node's `count_of_workers` matches its actual workers
//!
//! The root's own count is not tracked: workers attached to the root only
//! write the worker record.
//!
//! # Invariants
//!
//! - Never mutates anything
//! - Must be deterministic (errors are reported in id order)

use std::collections::HashMap;

use thiserror::Error;

use super::graph::OrgGraph;
use super::node::Node;
use super::types::NodeId;

/// A violated invariant.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("no root node found")]
    NoRoot,

    #[error("multiple root nodes found: {0:?}")]
    MultipleRoots(Vec<NodeId>),

    #[error("root node {0} has a boss")]
    RootHasBoss(NodeId),

    #[error("node {0} is its own boss")]
    SelfBoss(NodeId),

    #[error("node {node} references missing boss {boss}")]
    DanglingBoss { node: NodeId, boss: NodeId },

    #[error("cycle detected in boss links at node: {0}")]
    CycleDetected(NodeId),

    #[error("node {node} records {recorded} workers but has {actual}")]
    CountMismatch {
        node: NodeId,
        recorded: u32,
        actual: u32,
    },
}

/// Result of verification.
#[derive(Debug)]
pub struct VerifyResult {
    /// Whether verification passed
    pub ok: bool,
    /// Errors found during verification
    pub errors: Vec<VerifyError>,
}

impl VerifyResult {
    pub fn success() -> Self {
        Self {
            ok: true,
            errors: vec![],
        }
    }

    pub fn failure(errors: Vec<VerifyError>) -> Self {
        Self { ok: false, errors }
    }
}

/// Verify every invariant over `nodes`.
pub fn verify_nodes(nodes: &[Node]) -> VerifyResult {
    let mut errors = Vec::new();
    let by_id: HashMap<NodeId, &Node> = nodes.iter().map(|n| (n.id, n)).collect();

    let mut sorted: Vec<&Node> = nodes.iter().collect();
    sorted.sort_by_key(|n| n.id);

    let roots: Vec<NodeId> = sorted.iter().filter(|n| n.is_root()).map(|n| n.id).collect();
    match roots.len() {
        0 if !nodes.is_empty() => errors.push(VerifyError::NoRoot),
        0 | 1 => {}
        _ => errors.push(VerifyError::MultipleRoots(roots.clone())),
    }

    for node in &sorted {
        let Some(boss) = node.boss else { continue };
        if node.is_root() {
            errors.push(VerifyError::RootHasBoss(node.id));
        }
        if boss == node.id {
            errors.push(VerifyError::SelfBoss(node.id));
        } else if !by_id.contains_key(&boss) {
            errors.push(VerifyError::DanglingBoss {
                node: node.id,
                boss,
            });
        }
    }

    let graph = OrgGraph::from_nodes(nodes);
    if let Some(id) = graph.find_cycle() {
        // A self-boss is already reported above.
        if graph.parent(&id) != Some(&id) {
            errors.push(VerifyError::CycleDetected(id));
        }
    }

    for node in sorted.iter().filter(|n| !n.is_root()) {
        let actual = graph.child_count(&node.id) as u32;
        if node.count_of_workers != actual {
            errors.push(VerifyError::CountMismatch {
                node: node.id,
                recorded: node.count_of_workers,
                actual,
            });
        }
    }

    if errors.is_empty() {
        VerifyResult::success()
    } else {
        VerifyResult::failure(errors)
    }
}

/// Actual number of workers per node, derived from boss links.
///
/// Nodes with no workers map to zero.
pub fn actual_counts(nodes: &[Node]) -> HashMap<NodeId, u32> {
    let graph = OrgGraph::from_nodes(nodes);
    nodes
        .iter()
        .map(|n| (n.id, graph.child_count(&n.id) as u32))
        .collect()
}
