//! orgtree - Organizational hierarchy manager
//!
//! orgtree keeps users in a single-rooted tree. Every user except the root
//! has a boss, every boss knows how many direct workers it has, and no
//! reassignment may ever place a user beneath one of their own workers.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to hierarchy)
//! - [`hierarchy`] - Root registry, reassignment, cycle prevention, ancestry
//! - [`store`] - The async node store trait with memory and file backends
//! - [`core`] - Domain types, node schema, config, graph, verification, locks
//! - [`doctor`] - Consistency checks and explicit count repair
//!
//! # Correctness Invariants
//!
//! orgtree maintains the following invariants:
//!
//! 1. Boss links never form a cycle
//! 2. The root never has a boss
//! 3. Each non-root node's `count_of_workers` equals its number of workers
//! 4. Rejected reassignments leave the store untouched
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use orgtree::hierarchy::{HierarchyManager, HierarchySettings, RootRegistry};
//! use orgtree::store::MemoryNodeStore;
//! use orgtree::core::types::{Password, Username};
//!
//! # tokio_test::block_on(async {
//! let manager = HierarchyManager::new(
//!     Arc::new(MemoryNodeStore::new()),
//!     Arc::new(RootRegistry::new()),
//!     HierarchySettings::default(),
//! );
//! let root = manager
//!     .initialize_root(Username::new("root").unwrap(), Password::new("pw"))
//!     .await
//!     .unwrap();
//! assert!(manager.boss_of(root.id).await.unwrap().is_none());
//! # });
//! ```

pub mod cli;
pub mod core;
pub mod doctor;
pub mod hierarchy;
pub mod store;
