//! hierarchy::ancestry
//!
//! Ancestor queries by walking boss links through the store.
//!
//! # Algorithm
//!
//! [`AncestryWalk::is_ancestor_of`]`(candidate, node)`:
//! 1. Same node: `false`.
//! 2. Candidate has no boss (the root, or a boss-less admin): `true`.
//! 3. Otherwise follow `node`'s boss links one load at a time. Reaching the
//!    candidate answers `true`. Reaching the candidate's own boss, the root,
//!    a node without a boss, or a dangling id answers `false`.
//!
//! [`AncestryWalk::chain_contains`] is step 3 alone. It is the exact cycle
//! condition used when attaching a worker: placing `worker` under `boss`
//! closes a loop iff `worker` is on `boss`'s chain.
//!
//! # Invariants
//!
//! - Iterative, with a visited set: revisiting a node fails with
//!   `CycleDetected` instead of looping
//! - At most `max_depth` nodes are loaded per walk, beyond that the walk
//!   fails with `DepthLimitExceeded`

use std::collections::HashSet;

use tracing::{trace, warn};

use super::error::{HierarchyError, Step, StoreResultExt};
use crate::core::node::Node;
use crate::core::types::NodeId;
use crate::store::NodeStore;

/// A bounded walk up the boss chain.
#[derive(Debug)]
pub struct AncestryWalk<'a, S: ?Sized> {
    store: &'a S,
    root_id: Option<NodeId>,
    max_depth: usize,
}

impl<'a, S> AncestryWalk<'a, S>
where
    S: NodeStore + ?Sized,
{
    /// `root_id` stops the walk early when known; without it the walk ends
    /// at the first node that has no boss.
    pub fn new(store: &'a S, root_id: Option<NodeId>, max_depth: usize) -> Self {
        Self {
            store,
            root_id,
            max_depth,
        }
    }

    /// Whether `candidate` is an ancestor of `node`.
    ///
    /// # Example
    ///
    /// ```
    /// use orgtree::hierarchy::AncestryWalk;
    /// use orgtree::store::{MemoryNodeStore, NodeStore};
    /// use orgtree::core::node::NewNode;
    /// use orgtree::core::types::{Password, Username};
    ///
    /// # tokio_test::block_on(async {
    /// let store = MemoryNodeStore::new();
    /// let root = store
    ///     .create(NewNode::root(Username::new("root").unwrap(), Password::new("pw")))
    ///     .await
    ///     .unwrap();
    /// let bob = store
    ///     .create(NewNode::user(Username::new("bob").unwrap(), Password::new("pw"), root.id))
    ///     .await
    ///     .unwrap();
    ///
    /// let walk = AncestryWalk::new(&store, Some(root.id), 100);
    /// assert!(walk.is_ancestor_of(&root, &bob).await.unwrap());
    /// assert!(!walk.is_ancestor_of(&bob, &root).await.unwrap());
    /// assert!(!walk.is_ancestor_of(&bob, &bob).await.unwrap());
    /// # });
    /// ```
    pub async fn is_ancestor_of(&self, candidate: &Node, node: &Node) -> Result<bool, HierarchyError> {
        if candidate.id == node.id {
            return Ok(false);
        }
        if candidate.boss.is_none() {
            return Ok(true);
        }
        self.chain_contains(candidate, node).await
    }

    /// Whether `candidate` appears on `node`'s boss chain.
    pub async fn chain_contains(&self, candidate: &Node, node: &Node) -> Result<bool, HierarchyError> {
        if candidate.id == node.id {
            return Ok(false);
        }

        let boundary = candidate.boss;
        let mut visited: HashSet<NodeId> = HashSet::from([node.id]);
        let mut current = node.boss;
        let mut loaded = 0usize;

        while let Some(id) = current {
            if id == candidate.id {
                return Ok(true);
            }
            if Some(id) == boundary || Some(id) == self.root_id {
                return Ok(false);
            }
            if !visited.insert(id) {
                return Err(HierarchyError::CycleDetected { node: id });
            }
            if loaded >= self.max_depth {
                return Err(HierarchyError::DepthLimitExceeded {
                    limit: self.max_depth,
                });
            }
            loaded += 1;

            trace!(%id, "ancestry step");
            match self.store.find_by_id(&id).await.during(Step::Traverse)? {
                Some(next) => current = next.boss,
                None => {
                    warn!(%id, "boss chain ends at a missing node");
                    return Ok(false);
                }
            }
        }

        Ok(false)
    }
}
