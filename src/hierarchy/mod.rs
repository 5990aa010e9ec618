//! hierarchy
//!
//! Tree maintenance: boss links, worker counts, cycle prevention, ancestry.
//!
//! # Modules
//!
//! - [`manager`] - [`HierarchyManager`], the only writer of structure
//! - [`registry`] - [`RootRegistry`], the published root identity
//! - [`ancestry`] - [`AncestryWalk`], bounded walks up the boss chain
//! - [`error`] - [`HierarchyError`] and the [`Step`] a failure happened in
//!
//! # Invariants
//!
//! After every committed reassignment:
//! - Boss links form a tree under the root (no cycles, no self-bosses)
//! - Each non-root node's `count_of_workers` equals its number of workers
//! - The root has no boss

pub mod ancestry;
pub mod error;
pub mod manager;
pub mod registry;

pub use ancestry::AncestryWalk;
pub use error::{HierarchyError, Step};
pub use manager::{HierarchyManager, NewUser, Reassignment};
pub use registry::{RootRef, RootRegistry};

use crate::core::config::{Config, DEFAULT_LOCK_RETRIES, DEFAULT_MAX_DEPTH};

/// Bounds applied by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HierarchySettings {
    /// Maximum nodes loaded by one ancestry walk.
    pub max_depth: usize,
    /// Attempts to lock a worker whose boss keeps changing.
    pub lock_retries: u32,
}

impl Default for HierarchySettings {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            lock_retries: DEFAULT_LOCK_RETRIES,
        }
    }
}

impl HierarchySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_depth: config.max_depth(),
            lock_retries: config.lock_retries(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_config_defaults() {
        let from_config = HierarchySettings::from_config(&Config::default());
        assert_eq!(from_config, HierarchySettings::default());
        assert_eq!(from_config.max_depth, 10_000);
    }

    #[test]
    fn config_overrides_apply() {
        let mut config = Config::default();
        config.set_value("hierarchy.max_depth", "7").unwrap();
        config.set_value("hierarchy.lock_retries", "2").unwrap();
        let settings = HierarchySettings::from_config(&config);
        assert_eq!(settings.max_depth, 7);
        assert_eq!(settings.lock_retries, 2);
    }
}
