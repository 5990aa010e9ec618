//! core::node
//!
//! Node records: the unit of storage in the hierarchy.
//!
//! # Modules
//!
//! - [`schema`] - Versioned on-disk document for a node (v1)
//!
//! # Ownership
//!
//! A [`Node`] is a plain value. The hierarchy manager loads it, mutates the
//! structural fields (`boss`, `count_of_workers`) and hands it back to the
//! store. Nothing caches nodes across calls.
//!
//! # Example
//!
//! ```
//! use orgtree::core::node::{NewNode, Node};
//! use orgtree::core::types::{NodeId, Password, Role, Username};
//!
//! let root = NodeId::new();
//! let draft = NewNode::user(Username::new("bob").unwrap(), Password::new("pw"), root);
//! let node = Node::from_new(NodeId::new(), draft);
//! assert_eq!(node.boss, Some(root));
//! assert_eq!(node.count_of_workers, 0);
//! assert_eq!(node.role, Role::User);
//! ```

pub mod schema;

pub use schema::{parse_node, NodeDocumentV1, NodeError, NODE_KIND, SCHEMA_VERSION};

use serde::{Deserialize, Serialize};

use crate::core::types::{NodeId, Password, Role, Username, UtcTimestamp};

/// Creation and last-save times, maintained by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Timestamps {
    pub created_at: UtcTimestamp,
    pub updated_at: UtcTimestamp,
}

impl Timestamps {
    pub fn now() -> Self {
        let now = UtcTimestamp::now();
        Self {
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// A member of the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub username: Username,
    pub password: Password,
    pub role: Role,
    /// Parent link. `None` means the node hangs off the root implicitly
    /// (the root itself, or an admin created without a boss).
    pub boss: Option<NodeId>,
    /// Cached number of nodes whose `boss` is this node.
    pub count_of_workers: u32,
    pub timestamps: Timestamps,
}

impl Node {
    /// Materialize a draft with a store-assigned id.
    pub fn from_new(id: NodeId, draft: NewNode) -> Self {
        Self {
            id,
            username: draft.username,
            password: draft.password,
            role: draft.role,
            boss: draft.boss,
            count_of_workers: 0,
            timestamps: Timestamps::now(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.role == Role::Root
    }

    /// Bump `updated_at` to now.
    pub fn touch(&mut self) {
        self.timestamps.updated_at = UtcTimestamp::now();
    }
}

/// A node that has not been persisted yet.
///
/// New nodes are always leaves; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNode {
    pub username: Username,
    pub password: Password,
    pub role: Role,
    pub boss: Option<NodeId>,
}

impl NewNode {
    /// The root node: no boss.
    pub fn root(username: Username, password: Password) -> Self {
        Self {
            username,
            password,
            role: Role::Root,
            boss: None,
        }
    }

    /// An admin created without a boss.
    pub fn admin(username: Username, password: Password) -> Self {
        Self {
            username,
            password,
            role: Role::Admin,
            boss: None,
        }
    }

    /// A standard user attached directly to the root.
    pub fn user(username: Username, password: Password, root: NodeId) -> Self {
        Self {
            username,
            password,
            role: Role::User,
            boss: Some(root),
        }
    }
}
