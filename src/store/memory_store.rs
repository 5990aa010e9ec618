//! store::memory_store
//!
//! In-memory node store for tests and embedding.
//!
//! # Design
//!
//! Records live in a `HashMap` behind `Arc<Mutex<...>>`, so clones share
//! state. Besides storing nodes, the store can:
//! - fail a chosen operation on demand ([`FailOn`])
//! - record every call it receives ([`StoreOperation`])
//! - yield to the scheduler on every call, widening race windows in
//!   concurrency tests
//!
//! # Example
//!
//! ```
//! use orgtree::store::{FailOn, MemoryNodeStore, NodeStore, StoreError, StoreOperation};
//! use orgtree::core::node::NewNode;
//! use orgtree::core::types::{Password, Username};
//!
//! # tokio_test::block_on(async {
//! let store = MemoryNodeStore::new();
//! let alice = store
//!     .create(NewNode::admin(Username::new("alice").unwrap(), Password::new("pw")))
//!     .await
//!     .unwrap();
//!
//! store.set_fail_on(FailOn::Save(StoreError::Unavailable("maintenance".into())));
//! assert!(store.save(&alice).await.is_err());
//!
//! assert!(matches!(store.operations()[0], StoreOperation::Create { .. }));
//! # });
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use super::traits::{sort_oldest_first, NodeFilter, NodeStore, StoreError};
use crate::core::node::{NewNode, Node};
use crate::core::types::NodeId;

/// In-memory store. Thread-safe; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryNodeStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    nodes: HashMap<NodeId, Node>,
    fail_on: Option<FailOn>,
    operations: Vec<StoreOperation>,
    yield_on_access: bool,
}

/// Which operation should fail, and with what error.
///
/// Stays armed until [`MemoryNodeStore::clear_fail_on`] is called.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail every `find_by_id`.
    FindById(StoreError),
    /// Fail `find_by_id` for one node only.
    FindNode(NodeId, StoreError),
    /// Fail every `find_one`.
    FindOne(StoreError),
    /// Fail every `save`.
    Save(StoreError),
    /// Fail `save` for one node only.
    SaveNode(NodeId, StoreError),
    /// Fail every `create`.
    Create(StoreError),
    /// Fail every `list`.
    List(StoreError),
}

/// A call received by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOperation {
    FindById { id: NodeId },
    FindOne { filter: NodeFilter },
    Save { id: NodeId },
    Create { username: String },
    List,
}

impl MemoryNodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with existing records, stored as given.
    pub fn with_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let store = Self::new();
        for node in nodes {
            store.insert(node);
        }
        store
    }

    /// Yield to the scheduler at the start of every call.
    pub fn with_yields(self) -> Self {
        self.lock().yield_on_access = true;
        self
    }

    pub fn set_fail_on(&self, fail_on: FailOn) {
        self.lock().fail_on = Some(fail_on);
    }

    pub fn clear_fail_on(&self) {
        self.lock().fail_on = None;
    }

    /// Calls received so far, in order.
    pub fn operations(&self) -> Vec<StoreOperation> {
        self.lock().operations.clone()
    }

    pub fn clear_operations(&self) {
        self.lock().operations.clear();
    }

    /// Ids passed to `save`, in order.
    pub fn saved_ids(&self) -> Vec<NodeId> {
        self.lock()
            .operations
            .iter()
            .filter_map(|op| match op {
                StoreOperation::Save { id } => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Put a record in place without validation or bookkeeping.
    ///
    /// Lets tests seed states the hierarchy would never produce.
    pub fn insert(&self, node: Node) {
        self.lock().nodes.insert(node.id, node);
    }

    /// Read a record without recording an operation.
    pub fn get_sync(&self, id: &NodeId) -> Option<Node> {
        self.lock().nodes.get(id).cloned()
    }

    /// Every record, oldest first, without recording an operation.
    pub fn all_nodes(&self) -> Vec<Node> {
        let mut nodes: Vec<Node> = self.lock().nodes.values().cloned().collect();
        sort_oldest_first(&mut nodes);
        nodes
    }

    pub fn len(&self) -> usize {
        self.lock().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn enter(&self, op: StoreOperation) -> Result<(), StoreError> {
        let should_yield = {
            let mut inner = self.lock();
            let failure = inner.fail_on.as_ref().and_then(|f| failure_for(f, &op));
            inner.operations.push(op);
            if let Some(err) = failure {
                return Err(err);
            }
            inner.yield_on_access
        };
        if should_yield {
            tokio::task::yield_now().await;
        }
        Ok(())
    }
}

fn failure_for(fail_on: &FailOn, op: &StoreOperation) -> Option<StoreError> {
    match (fail_on, op) {
        (FailOn::FindById(e), StoreOperation::FindById { .. }) => Some(e.clone()),
        (FailOn::FindNode(target, e), StoreOperation::FindById { id }) if target == id => {
            Some(e.clone())
        }
        (FailOn::FindOne(e), StoreOperation::FindOne { .. }) => Some(e.clone()),
        (FailOn::Save(e), StoreOperation::Save { .. }) => Some(e.clone()),
        (FailOn::SaveNode(target, e), StoreOperation::Save { id }) if target == id => {
            Some(e.clone())
        }
        (FailOn::Create(e), StoreOperation::Create { .. }) => Some(e.clone()),
        (FailOn::List(e), StoreOperation::List) => Some(e.clone()),
        _ => None,
    }
}

#[async_trait]
impl NodeStore for MemoryNodeStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn find_by_id(&self, id: &NodeId) -> Result<Option<Node>, StoreError> {
        self.enter(StoreOperation::FindById { id: *id }).await?;
        Ok(self.lock().nodes.get(id).cloned())
    }

    async fn find_one(&self, filter: &NodeFilter) -> Result<Option<Node>, StoreError> {
        self.enter(StoreOperation::FindOne {
            filter: filter.clone(),
        })
        .await?;
        let mut matching: Vec<Node> = self
            .lock()
            .nodes
            .values()
            .filter(|n| filter.matches(n))
            .cloned()
            .collect();
        sort_oldest_first(&mut matching);
        Ok(matching.into_iter().next())
    }

    async fn save(&self, node: &Node) -> Result<Node, StoreError> {
        self.enter(StoreOperation::Save { id: node.id }).await?;
        let mut inner = self.lock();
        let Some(slot) = inner.nodes.get_mut(&node.id) else {
            return Err(StoreError::NotFound(node.id));
        };
        let mut stored = node.clone();
        stored.timestamps.created_at = slot.timestamps.created_at.clone();
        stored.touch();
        *slot = stored.clone();
        debug!(id = %node.id, "memory store saved node");
        Ok(stored)
    }

    async fn create(&self, draft: NewNode) -> Result<Node, StoreError> {
        self.enter(StoreOperation::Create {
            username: draft.username.to_string(),
        })
        .await?;
        let mut inner = self.lock();
        if inner.nodes.values().any(|n| n.username == draft.username) {
            return Err(StoreError::AlreadyExists(draft.username.to_string()));
        }
        let node = Node::from_new(NodeId::new(), draft);
        inner.nodes.insert(node.id, node.clone());
        debug!(id = %node.id, username = %node.username, "memory store created node");
        Ok(node)
    }

    async fn list(&self) -> Result<Vec<Node>, StoreError> {
        self.enter(StoreOperation::List).await?;
        Ok(self.all_nodes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Password, Role, Username};

    fn admin(name: &str) -> NewNode {
        NewNode::admin(Username::new(name).unwrap(), Password::new("pw"))
    }

    #[tokio::test]
    async fn create_assigns_ids_and_stores() {
        let store = MemoryNodeStore::new();
        let a = store.create(admin("alice")).await.unwrap();
        let b = store.create(admin("bob")).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(store.len(), 2);
        assert_eq!(store.find_by_id(&a.id).await.unwrap(), Some(a));
    }

    #[tokio::test]
    async fn duplicate_username_rejected() {
        let store = MemoryNodeStore::new();
        store.create(admin("alice")).await.unwrap();
        let err = store.create(admin("alice")).await.unwrap_err();
        assert_eq!(err, StoreError::AlreadyExists("alice".into()));
    }

    #[tokio::test]
    async fn find_by_id_missing_is_none() {
        let store = MemoryNodeStore::new();
        assert_eq!(store.find_by_id(&NodeId::new()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_updates_and_refreshes_timestamp() {
        let store = MemoryNodeStore::new();
        let mut alice = store.create(admin("alice")).await.unwrap();
        alice.count_of_workers = 4;

        let saved = store.save(&alice).await.unwrap();
        assert_eq!(saved.count_of_workers, 4);
        assert_eq!(saved.timestamps.created_at, alice.timestamps.created_at);
        assert!(saved.timestamps.updated_at >= alice.timestamps.updated_at);
        assert_eq!(store.get_sync(&alice.id).unwrap().count_of_workers, 4);
    }

    #[tokio::test]
    async fn save_unknown_node_fails() {
        let store = MemoryNodeStore::new();
        let ghost = Node::from_new(NodeId::new(), admin("ghost"));
        let err = store.save(&ghost).await.unwrap_err();
        assert_eq!(err, StoreError::NotFound(ghost.id));
    }

    #[tokio::test]
    async fn find_one_by_role_and_username() {
        let store = MemoryNodeStore::new();
        let root = store
            .create(NewNode::root(Username::new("root").unwrap(), Password::new("pw")))
            .await
            .unwrap();
        store.create(admin("alice")).await.unwrap();

        let found = store.find_one(&NodeFilter::role(Role::Root)).await.unwrap();
        assert_eq!(found.map(|n| n.id), Some(root.id));

        let found = store
            .find_one(&NodeFilter::username(Username::new("alice").unwrap()))
            .await
            .unwrap();
        assert_eq!(found.map(|n| n.role), Some(Role::Admin));

        let none = store
            .find_one(&NodeFilter::username(Username::new("zed").unwrap()))
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn fail_on_save_node_targets_one_id() {
        let store = MemoryNodeStore::new();
        let a = store.create(admin("a")).await.unwrap();
        let b = store.create(admin("b")).await.unwrap();

        store.set_fail_on(FailOn::SaveNode(b.id, StoreError::Io("disk full".into())));
        assert!(store.save(&a).await.is_ok());
        assert_eq!(
            store.save(&b).await.unwrap_err(),
            StoreError::Io("disk full".into())
        );

        store.clear_fail_on();
        assert!(store.save(&b).await.is_ok());
    }

    #[tokio::test]
    async fn failed_calls_are_still_recorded() {
        let store = MemoryNodeStore::new();
        store.set_fail_on(FailOn::List(StoreError::Unavailable("down".into())));
        assert!(store.list().await.is_err());
        assert_eq!(store.operations(), vec![StoreOperation::List]);
    }

    #[tokio::test]
    async fn operations_recorded_in_order() {
        let store = MemoryNodeStore::new();
        let a = store.create(admin("a")).await.unwrap();
        store.find_by_id(&a.id).await.unwrap();
        store.save(&a).await.unwrap();

        let ops = store.operations();
        assert_eq!(ops.len(), 3);
        assert!(matches!(ops[0], StoreOperation::Create { .. }));
        assert_eq!(ops[1], StoreOperation::FindById { id: a.id });
        assert_eq!(store.saved_ids(), vec![a.id]);

        store.clear_operations();
        assert!(store.operations().is_empty());
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = MemoryNodeStore::new().with_yields();
        let other = store.clone();
        store.create(admin("a")).await.unwrap();
        assert_eq!(other.list().await.unwrap().len(), 1);
    }

    #[test]
    fn with_nodes_seeds_records() {
        let node = Node::from_new(NodeId::new(), admin("seed"));
        let store = MemoryNodeStore::with_nodes([node.clone()]);
        assert_eq!(store.get_sync(&node.id), Some(node));
        assert!(store.operations().is_empty());
    }
}
