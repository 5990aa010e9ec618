//! core::ops
//!
//! Locking primitives.
//!
//! # Modules
//!
//! - [`lock`] - Exclusive data directory lock (cross-process)
//! - [`keyed`] - Per-node async locks (in-process)
//!
//! # Architecture
//!
//! A mutating hierarchy operation:
//! 1. Runs against a store that holds the data directory lock (file store)
//! 2. Locks the ids of every node it will write, in ascending order
//! 3. Re-reads those nodes under lock before validating and writing

pub mod keyed;
pub mod lock;

pub use keyed::{KeyedGuard, KeyedLocks};
pub use lock::{LockError, StoreLock};
