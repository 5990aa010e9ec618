//! doctor::issues
//!
//! Issues the doctor reports, derived from verification errors.
//!
//! # Architecture
//!
//! Every [`VerifyError`] maps to exactly one [`Issue`] with a stable
//! [`IssueId`] of the form `type` or `type:<short node id>`, so scripts can
//! match on issue ids across runs.
//!
//! Only count mismatches are repairable. Broken boss links need a human to
//! decide where the affected workers belong.

use std::fmt;

use serde::Serialize;

use crate::core::types::NodeId;
use crate::core::verify::VerifyError;

/// How bad an issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The tree is structurally broken; ancestry answers may be wrong.
    Blocking,

    /// Derived data is stale but the tree itself is sound.
    Warning,
}

impl Severity {
    pub fn is_blocking(&self) -> bool {
        matches!(self, Severity::Blocking)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Blocking => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// Stable identifier for an issue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct IssueId(String);

impl IssueId {
    /// Issue about one node.
    pub fn for_node(issue_type: &str, node: &NodeId) -> Self {
        Self(format!("{}:{}", issue_type, node.short()))
    }

    /// Issue about the tree as a whole.
    pub fn singleton(issue_type: &str) -> Self {
        Self(issue_type.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A diagnosed problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub id: IssueId,
    pub severity: Severity,
    pub message: String,
    /// Node the issue is about, if any.
    pub node: Option<NodeId>,
    /// Whether `doctor --fix` can repair it.
    pub fixable: bool,
}

impl Issue {
    pub fn is_blocking(&self) -> bool {
        self.severity.is_blocking()
    }
}

impl From<&VerifyError> for Issue {
    fn from(err: &VerifyError) -> Self {
        let message = err.to_string();
        let (id, severity, node) = match err {
            VerifyError::NoRoot => (IssueId::singleton("no-root"), Severity::Blocking, None),
            VerifyError::MultipleRoots(_) => (
                IssueId::singleton("multiple-roots"),
                Severity::Blocking,
                None,
            ),
            VerifyError::RootHasBoss(id) => (
                IssueId::for_node("root-has-boss", id),
                Severity::Blocking,
                Some(*id),
            ),
            VerifyError::SelfBoss(id) => (
                IssueId::for_node("self-boss", id),
                Severity::Blocking,
                Some(*id),
            ),
            VerifyError::DanglingBoss { node, .. } => (
                IssueId::for_node("dangling-boss", node),
                Severity::Blocking,
                Some(*node),
            ),
            VerifyError::CycleDetected(id) => (
                IssueId::for_node("cycle", id),
                Severity::Blocking,
                Some(*id),
            ),
            VerifyError::CountMismatch { node, .. } => (
                IssueId::for_node("count-mismatch", node),
                Severity::Warning,
                Some(*node),
            ),
        };

        Self {
            id,
            severity,
            message,
            node,
            fixable: matches!(err, VerifyError::CountMismatch { .. }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_mismatch_is_fixable_warning() {
        let node: NodeId = "0b6f2a51-8c1e-4d5a-9f3b-2c7d8e9f0a1b".parse().unwrap();
        let issue = Issue::from(&VerifyError::CountMismatch {
            node,
            recorded: 2,
            actual: 1,
        });
        assert_eq!(issue.id.as_str(), "count-mismatch:0b6f2a51");
        assert_eq!(issue.severity, Severity::Warning);
        assert!(issue.fixable);
        assert_eq!(issue.node, Some(node));
    }

    #[test]
    fn structural_issues_block() {
        let id = NodeId::new();
        for err in [
            VerifyError::NoRoot,
            VerifyError::SelfBoss(id),
            VerifyError::CycleDetected(id),
            VerifyError::DanglingBoss {
                node: id,
                boss: NodeId::new(),
            },
        ] {
            let issue = Issue::from(&err);
            assert!(issue.is_blocking(), "{}", issue.id);
            assert!(!issue.fixable);
        }
    }

    #[test]
    fn singleton_ids_have_no_suffix() {
        assert_eq!(Issue::from(&VerifyError::NoRoot).id.as_str(), "no-root");
    }
}
