//! doctor::planner
//!
//! Plans count repairs from a snapshot.
//!
//! A repair sets a node's `count_of_workers` to the number of nodes whose
//! boss link points at it. Boss links are the source of truth and are never
//! changed. The root is skipped because its count is not tracked.

use serde::Serialize;

use crate::core::node::Node;
use crate::core::types::NodeId;
use crate::core::verify::actual_counts;

/// One count correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountRepair {
    pub node: NodeId,
    pub from: u32,
    pub to: u32,
}

/// Corrections needed to make every non-root count match its boss links.
///
/// Sorted by node id.
pub fn plan_count_repairs(nodes: &[Node]) -> Vec<CountRepair> {
    let counts = actual_counts(nodes);
    let mut repairs: Vec<CountRepair> = nodes
        .iter()
        .filter(|n| !n.is_root())
        .filter_map(|n| {
            let actual = counts.get(&n.id).copied().unwrap_or(0);
            (n.count_of_workers != actual).then_some(CountRepair {
                node: n.id,
                from: n.count_of_workers,
                to: actual,
            })
        })
        .collect();
    repairs.sort_by_key(|r| r.node);
    repairs
}
