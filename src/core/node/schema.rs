//! core::node::schema
//!
//! On-disk node document (v1).
//!
//! # Schema Design
//!
//! - Self-describing with `kind` and `schema_version`
//! - Strictly parsed (unknown fields rejected)
//! - Validated after parse: a node cannot name itself as its boss
//!
//! # Example
//!
//! ```
//! use orgtree::core::node::{parse_node, NodeDocumentV1, NewNode, Node};
//! use orgtree::core::types::{NodeId, Password, Username};
//!
//! let node = Node::from_new(
//!     NodeId::new(),
//!     NewNode::admin(Username::new("alice").unwrap(), Password::new("pw")),
//! );
//! let json = NodeDocumentV1::from_node(&node).to_json().unwrap();
//! let parsed = parse_node(&json).unwrap();
//! assert_eq!(parsed, node);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Node, Timestamps};
use crate::core::types::{NodeId, Password, Role, Username};

/// The kind identifier for node documents.
pub const NODE_KIND: &str = "orgtree.node";

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors from node document handling.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("failed to parse node: {0}")]
    ParseError(String),

    #[error("failed to serialize node: {0}")]
    SerializeError(String),

    #[error("invalid kind '{found}', expected '{}'", NODE_KIND)]
    InvalidKind { found: String },

    #[error("unsupported schema version {0}, supported: {SCHEMA_VERSION}")]
    UnsupportedVersion(u32),

    #[error("node {0} names itself as its boss")]
    SelfBoss(NodeId),
}

#[derive(Debug, Deserialize)]
struct NodeEnvelope {
    kind: String,
    schema_version: u32,
}

/// Parse a node document with version dispatch.
///
/// # Errors
///
/// Returns an error if:
/// - The JSON is malformed or has unknown fields
/// - The `kind` field doesn't match [`NODE_KIND`]
/// - The `schema_version` is not supported
/// - The node is its own boss
pub fn parse_node(json: &str) -> Result<Node, NodeError> {
    let envelope: NodeEnvelope =
        serde_json::from_str(json).map_err(|e| NodeError::ParseError(e.to_string()))?;

    if envelope.kind != NODE_KIND {
        return Err(NodeError::InvalidKind {
            found: envelope.kind,
        });
    }

    match envelope.schema_version {
        1 => {
            let doc: NodeDocumentV1 =
                serde_json::from_str(json).map_err(|e| NodeError::ParseError(e.to_string()))?;
            doc.into_node()
        }
        v => Err(NodeError::UnsupportedVersion(v)),
    }
}

/// Node document (v1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NodeDocumentV1 {
    /// Always [`NODE_KIND`]
    pub kind: String,
    /// Always 1 for this struct
    pub schema_version: u32,
    pub id: NodeId,
    pub username: Username,
    pub password: Password,
    pub role: Role,
    pub boss: Option<NodeId>,
    pub count_of_workers: u32,
    pub timestamps: Timestamps,
}

impl NodeDocumentV1 {
    pub fn from_node(node: &Node) -> Self {
        Self {
            kind: NODE_KIND.to_string(),
            schema_version: SCHEMA_VERSION,
            id: node.id,
            username: node.username.clone(),
            password: node.password.clone(),
            role: node.role,
            boss: node.boss,
            count_of_workers: node.count_of_workers,
            timestamps: node.timestamps.clone(),
        }
    }

    /// Check envelope fields and structural sanity.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.kind != NODE_KIND {
            return Err(NodeError::InvalidKind {
                found: self.kind.clone(),
            });
        }
        if self.schema_version != SCHEMA_VERSION {
            return Err(NodeError::UnsupportedVersion(self.schema_version));
        }
        if self.boss == Some(self.id) {
            return Err(NodeError::SelfBoss(self.id));
        }
        Ok(())
    }

    pub fn into_node(self) -> Result<Node, NodeError> {
        self.validate()?;
        Ok(Node {
            id: self.id,
            username: self.username,
            password: self.password,
            role: self.role,
            boss: self.boss,
            count_of_workers: self.count_of_workers,
            timestamps: self.timestamps,
        })
    }

    /// Serialize to pretty JSON with a trailing newline.
    pub fn to_json(&self) -> Result<String, NodeError> {
        let mut json = serde_json::to_string_pretty(self)
            .map_err(|e| NodeError::SerializeError(e.to_string()))?;
        json.push('\n');
        Ok(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "0b6f2a51-8c1e-4d5a-9f3b-2c7d8e9f0a1b";
    const BOSS: &str = "7d1c3e44-2a9b-4f61-8e05-b3c2d1a0f9e8";

    fn doc(kind: &str, version: u32, boss: &str) -> String {
        format!(
            r#"{{
                "kind": "{kind}",
                "schema_version": {version},
                "id": "{ID}",
                "username": "bob",
                "password": "secret",
                "role": "user",
                "boss": {boss},
                "count_of_workers": 2,
                "timestamps": {{
                    "created_at": "2024-01-01T00:00:00Z",
                    "updated_at": "2024-01-02T00:00:00Z"
                }}
            }}"#
        )
    }

    mod parse_node_fn {
        use super::*;

        #[test]
        fn valid_document() {
            let node = parse_node(&doc(NODE_KIND, 1, &format!("\"{BOSS}\""))).unwrap();
            assert_eq!(node.username.as_str(), "bob");
            assert_eq!(node.boss, Some(BOSS.parse().unwrap()));
            assert_eq!(node.count_of_workers, 2);
            assert_eq!(node.role, Role::User);
        }

        #[test]
        fn null_boss() {
            let node = parse_node(&doc(NODE_KIND, 1, "null")).unwrap();
            assert_eq!(node.boss, None);
        }

        #[test]
        fn invalid_kind() {
            let result = parse_node(&doc("something.else", 1, "null"));
            assert!(matches!(result, Err(NodeError::InvalidKind { .. })));
        }

        #[test]
        fn unsupported_version() {
            let result = parse_node(&doc(NODE_KIND, 2, "null"));
            assert!(matches!(result, Err(NodeError::UnsupportedVersion(2))));
        }

        #[test]
        fn self_boss_rejected() {
            let result = parse_node(&doc(NODE_KIND, 1, &format!("\"{ID}\"")));
            assert!(matches!(result, Err(NodeError::SelfBoss(_))));
        }

        #[test]
        fn unknown_fields_rejected() {
            let json = doc(NODE_KIND, 1, "null").replacen(
                "\"count_of_workers\"",
                "\"extra\": true, \"count_of_workers\"",
                1,
            );
            assert!(matches!(parse_node(&json), Err(NodeError::ParseError(_))));
        }

        #[test]
        fn malformed_json() {
            assert!(matches!(parse_node("{"), Err(NodeError::ParseError(_))));
        }
    }

    #[test]
    fn written_document_carries_envelope() {
        let node = parse_node(&doc(NODE_KIND, 1, "null")).unwrap();
        let json = NodeDocumentV1::from_node(&node).to_json().unwrap();
        assert!(json.contains("\"kind\": \"orgtree.node\""));
        assert!(json.contains("\"schema_version\": 1"));
        assert!(json.ends_with('\n'));
    }
}
