//! hierarchy::error
//!
//! Errors surfaced by hierarchy operations.
//!
//! Structural errors (`SelfAssignment`, `CyclicAssignment`, `RootImmutable`,
//! `NotFound`, and the corruption guards `CycleDetected` and
//! `DepthLimitExceeded`) are raised from loaded data before anything is
//! written, so they leave the store untouched. `Persistence` may follow earlier
//! successful writes in the same operation; its [`Step`] says how far the
//! operation got.

use std::fmt;

use thiserror::Error;

use crate::core::types::NodeId;
use crate::store::StoreError;

/// Sub-step of an operation that touched the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    LoadWorker,
    LoadBoss,
    LoadOldBoss,
    SaveOldBoss,
    SaveWorker,
    SaveBoss,
    Traverse,
    Create,
    LookupRoot,
    SaveRoot,
    List,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::LoadWorker => "load worker",
            Step::LoadBoss => "load boss",
            Step::LoadOldBoss => "load previous boss",
            Step::SaveOldBoss => "save previous boss",
            Step::SaveWorker => "save worker",
            Step::SaveBoss => "save boss",
            Step::Traverse => "ancestry walk",
            Step::Create => "create node",
            Step::LookupRoot => "look up root",
            Step::SaveRoot => "save root",
            Step::List => "list nodes",
        }
    }

    /// Whether a failure at this step can follow an earlier write in the
    /// same reassignment.
    pub fn may_be_partial(&self) -> bool {
        matches!(self, Step::SaveWorker | Step::SaveBoss)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from hierarchy operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("node {id} cannot be its own boss")]
    SelfAssignment { id: NodeId },

    #[error("cannot place {worker} under {boss}: {worker} is above {boss} in the hierarchy")]
    CyclicAssignment { worker: NodeId, boss: NodeId },

    #[error("cycle detected in boss links at node {node}")]
    CycleDetected { node: NodeId },

    #[error("ancestry walk exceeded {limit} steps")]
    DepthLimitExceeded { limit: usize },

    #[error("node not found: {0}")]
    NotFound(NodeId),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("root has not been initialized")]
    NotInitialized,

    #[error("the root node cannot be given a boss")]
    RootImmutable,

    #[error("node {id} kept changing bosses; gave up after {attempts} attempts")]
    Contention { id: NodeId, attempts: u32 },

    #[error("store failure during {step}: {source}")]
    Persistence {
        step: Step,
        #[source]
        source: StoreError,
    },
}

impl HierarchyError {
    /// Rejected from loaded data before any write.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            HierarchyError::SelfAssignment { .. }
                | HierarchyError::CyclicAssignment { .. }
                | HierarchyError::CycleDetected { .. }
                | HierarchyError::DepthLimitExceeded { .. }
                | HierarchyError::RootImmutable
                | HierarchyError::NotFound(_)
                | HierarchyError::UserNotFound(_)
        )
    }

    /// Whether the failed operation may have left some of its writes behind.
    pub fn may_be_partial(&self) -> bool {
        match self {
            HierarchyError::Persistence { step, .. } => step.may_be_partial(),
            _ => false,
        }
    }
}

/// Attach a [`Step`] to store results.
pub(crate) trait StoreResultExt<T> {
    fn during(self, step: Step) -> Result<T, HierarchyError>;
}

impl<T> StoreResultExt<T> for Result<T, StoreError> {
    fn during(self, step: Step) -> Result<T, HierarchyError> {
        self.map_err(|source| HierarchyError::Persistence { step, source })
    }
}
