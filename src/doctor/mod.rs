//! doctor
//!
//! Consistency checks and explicit repair.
//!
//! # Architecture
//!
//! `orgtree doctor` loads a snapshot, runs [`crate::core::verify`] over it,
//! and reports each violation as an [`Issue`]. With `--fix` it repairs the
//! only thing that can be repaired mechanically: worker counts that drifted
//! from the boss links (after a failed save, for example).
//!
//! # Design Principles
//!
//! - Never change a boss link
//! - Never repair without an explicit `--fix`
//! - Repairs run with the topology frozen, so no reassignment interleaves
//!
//! # Example
//!
//! ```
//! use orgtree::doctor::Doctor;
//!
//! let report = Doctor::new().diagnose(&[]);
//! assert!(report.is_healthy());
//! ```

mod issues;
mod planner;

pub use issues::{Issue, IssueId, Severity};
pub use planner::{plan_count_repairs, CountRepair};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::node::Node;
use crate::core::verify::verify_nodes;
use crate::hierarchy::{HierarchyError, HierarchyManager};
use crate::store::{NodeStore, StoreError};

/// Errors from doctor operations.
#[derive(Debug, Error)]
pub enum DoctorError {
    /// The snapshot could not be read.
    #[error("failed to load nodes: {0}")]
    Snapshot(#[from] HierarchyError),

    /// The tree is structurally broken; counts cannot be trusted yet.
    #[error("refusing to repair counts: {0} blocking issue(s) must be fixed by hand first")]
    BlockingIssues(usize),

    /// A repaired node could not be saved.
    #[error("failed to save repaired node: {0}")]
    Save(#[from] StoreError),
}

/// Summary of a diagnosis.
#[derive(Debug, Default, Clone, Serialize)]
pub struct DiagnosisSummary {
    pub node_count: usize,
    pub issue_count: usize,
    pub blocking_count: usize,
    pub warning_count: usize,
    pub fixable_count: usize,
}

/// Result of diagnosing a snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosisReport {
    pub issues: Vec<Issue>,
    pub summary: DiagnosisSummary,
}

impl DiagnosisReport {
    pub fn has_blocking_issues(&self) -> bool {
        self.summary.blocking_count > 0
    }

    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn blocking_issues(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.is_blocking())
    }

    /// Format the diagnosis for display.
    pub fn format(&self) -> String {
        if self.is_healthy() {
            return format!(
                "Hierarchy is healthy: {} node(s), no issues found.",
                self.summary.node_count
            );
        }

        let mut lines = vec![
            format!(
                "Found {} issue(s) in {} node(s): {} blocking, {} warnings",
                self.summary.issue_count,
                self.summary.node_count,
                self.summary.blocking_count,
                self.summary.warning_count
            ),
            String::new(),
        ];

        for issue in &self.issues {
            let severity = if issue.is_blocking() { "ERROR" } else { "WARN" };
            lines.push(format!("[{}] {} ({})", severity, issue.message, issue.id));
        }

        if self.summary.fixable_count > 0 {
            lines.push(String::new());
            lines.push("Run 'orgtree doctor --fix' to recompute worker counts.".to_string());
        }

        lines.join("\n")
    }
}

/// Outcome of a count repair.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepairOutcome {
    /// Corrections that were saved.
    pub applied: Vec<CountRepair>,
}

impl RepairOutcome {
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct Doctor;

impl Doctor {
    pub fn new() -> Self {
        Self
    }

    /// Diagnose a snapshot. Never writes.
    pub fn diagnose(&self, nodes: &[Node]) -> DiagnosisReport {
        let result = verify_nodes(nodes);
        let issues: Vec<Issue> = result.errors.iter().map(Issue::from).collect();

        let blocking_count = issues.iter().filter(|i| i.is_blocking()).count();
        DiagnosisReport {
            summary: DiagnosisSummary {
                node_count: nodes.len(),
                issue_count: issues.len(),
                blocking_count,
                warning_count: issues.len() - blocking_count,
                fixable_count: issues.iter().filter(|i| i.fixable).count(),
            },
            issues,
        }
    }

    /// Diagnose the manager's store.
    pub async fn check<S>(&self, manager: &HierarchyManager<S>) -> Result<DiagnosisReport, DoctorError>
    where
        S: NodeStore + ?Sized,
    {
        let nodes = manager.snapshot().await?;
        Ok(self.diagnose(&nodes))
    }

    /// Recompute every non-root worker count from the boss links and save
    /// the nodes that changed.
    ///
    /// # Errors
    ///
    /// - `BlockingIssues` if the tree is structurally broken
    /// - `Save` if a corrected node could not be written; earlier
    ///   corrections stay applied and a rerun picks up the rest
    pub async fn repair_counts<S>(
        &self,
        manager: &HierarchyManager<S>,
    ) -> Result<RepairOutcome, DoctorError>
    where
        S: NodeStore + ?Sized,
    {
        let _frozen = manager.freeze().await;

        let nodes = manager.snapshot().await?;
        let report = self.diagnose(&nodes);
        if report.has_blocking_issues() {
            return Err(DoctorError::BlockingIssues(report.summary.blocking_count));
        }

        let plan = plan_count_repairs(&nodes);
        let mut outcome = RepairOutcome::default();
        for repair in plan {
            let Some(node) = nodes.iter().find(|n| n.id == repair.node) else {
                warn!(node = %repair.node, "node vanished during repair");
                continue;
            };
            let mut node = node.clone();
            node.count_of_workers = repair.to;
            manager.store().save(&node).await?;
            info!(node = %repair.node, from = repair.from, to = repair.to, "repaired worker count");
            outcome.applied.push(repair);
        }

        Ok(outcome)
    }
}
