//! store::traits
//!
//! The node store collaborator.
//!
//! # Design
//!
//! The hierarchy never talks to storage directly; it goes through
//! [`NodeStore`]. Every call is async because real backends do I/O, and each
//! call is a suspension point other tasks may interleave with.
//!
//! Guarantees a backend must give:
//! - `save` of one record is atomic (readers see the old or new record)
//! - `create` assigns a fresh id and rejects duplicate usernames
//!
//! There are no cross-record transactions. Sequencing multi-record updates
//! is the hierarchy's job.
//!
//! # Example
//!
//! ```
//! use orgtree::store::{MemoryNodeStore, NodeFilter, NodeStore};
//! use orgtree::core::node::NewNode;
//! use orgtree::core::types::{Password, Role, Username};
//!
//! # tokio_test::block_on(async {
//! let store = MemoryNodeStore::new();
//! let root = store
//!     .create(NewNode::root(Username::new("root").unwrap(), Password::new("pw")))
//!     .await
//!     .unwrap();
//!
//! let found = store.find_one(&NodeFilter::role(Role::Root)).await.unwrap();
//! assert_eq!(found.map(|n| n.id), Some(root.id));
//! # });
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::core::node::{NewNode, Node};
use crate::core::types::{NodeId, Role, Username};

/// Errors from store operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// `save` was called for a record that does not exist.
    #[error("node not found: {0}")]
    NotFound(NodeId),

    /// `create` was called with a username already in use.
    #[error("username already exists: {0}")]
    AlreadyExists(String),

    /// Reading or writing the backing medium failed.
    #[error("store i/o error: {0}")]
    Io(String),

    /// A stored record could not be decoded.
    #[error("corrupt record {location}: {message}")]
    Parse { location: String, message: String },

    /// A record could not be encoded.
    #[error("failed to encode node: {0}")]
    Serialize(String),

    /// Another process holds the store.
    #[error("store is locked by another process")]
    Locked,

    /// The backend is temporarily unable to serve requests.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Selection criteria for [`NodeStore::find_one`].
///
/// Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeFilter {
    pub role: Option<Role>,
    pub username: Option<Username>,
}

impl NodeFilter {
    pub fn role(role: Role) -> Self {
        Self {
            role: Some(role),
            ..Default::default()
        }
    }

    pub fn username(username: Username) -> Self {
        Self {
            username: Some(username),
            ..Default::default()
        }
    }

    pub fn matches(&self, node: &Node) -> bool {
        self.role.map_or(true, |r| node.role == r)
            && self.username.as_ref().map_or(true, |u| &node.username == u)
    }
}

/// Durable storage of node records keyed by id.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Backend name for logs (e.g., "memory", "file").
    fn name(&self) -> &'static str;

    /// Load a node by id. `Ok(None)` when absent.
    async fn find_by_id(&self, id: &NodeId) -> Result<Option<Node>, StoreError>;

    /// First node matching `filter`, oldest first. `Ok(None)` when absent.
    async fn find_one(&self, filter: &NodeFilter) -> Result<Option<Node>, StoreError>;

    /// Persist the full state of an existing node.
    ///
    /// Returns the stored form, with `updated_at` refreshed.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the node was never created
    async fn save(&self, node: &Node) -> Result<Node, StoreError>;

    /// Create a node from a draft and assign its id.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if the username is taken
    async fn create(&self, draft: NewNode) -> Result<Node, StoreError>;

    /// Every stored node, oldest first.
    async fn list(&self) -> Result<Vec<Node>, StoreError>;
}

/// Order used by `find_one` and `list`: creation time, then id.
pub(crate) fn sort_oldest_first(nodes: &mut [Node]) {
    nodes.sort_by(|a, b| {
        a.timestamps
            .created_at
            .cmp(&b.timestamps.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
