//! store
//!
//! Node storage behind the [`NodeStore`] trait.
//!
//! # Modules
//!
//! - [`traits`] - The `NodeStore` trait, filters and errors
//! - [`memory_store`] - In-memory store with failure injection
//! - [`file_store`] - One JSON document per node under a data directory

pub mod file_store;
pub mod memory_store;
pub mod traits;

pub use file_store::FileNodeStore;
pub use memory_store::{FailOn, MemoryNodeStore, StoreOperation};
pub use traits::{NodeFilter, NodeStore, StoreError};
