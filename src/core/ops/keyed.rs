//! core::ops::keyed
//!
//! Per-key async mutual exclusion.
//!
//! # Architecture
//!
//! A table maps each key to an `Arc<tokio::sync::Mutex<()>>`. Callers lock a
//! *set* of keys at once: the set is sorted and de-duplicated first, so any
//! two callers acquire overlapping keys in the same order and cannot
//! deadlock. Entries are created on demand and removed when the last guard
//! referencing them is dropped, so the table only holds keys that are in
//! use.
//!
//! # Invariants
//!
//! - Keys within one acquisition are locked in ascending order
//! - The table lock is never held across an `.await`
//!
//! # Example
//!
//! ```
//! use orgtree::core::ops::keyed::KeyedLocks;
//!
//! tokio_test::block_on(async {
//!     let locks = KeyedLocks::new();
//!     let guard = locks.acquire([3, 1, 3]).await;
//!     assert_eq!(guard.keys(), &[1, 3]);
//!     drop(guard);
//!     assert!(locks.is_empty());
//! });
//! ```

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

type Table<K> = Arc<Mutex<HashMap<K, Arc<AsyncMutex<()>>>>>;

/// Lock table keyed by `K`.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    table: Table<K>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            table: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K> KeyedLocks<K>
where
    K: Ord + Hash + Clone + std::fmt::Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock every key in `keys`, waiting as long as necessary.
    pub async fn acquire(&self, keys: impl IntoIterator<Item = K>) -> KeyedGuard<K> {
        let mut keys: Vec<K> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in &keys {
            let slot = self.slot(key);
            trace!(?key, "waiting for key lock");
            guards.push(slot.lock_owned().await);
        }

        KeyedGuard {
            table: Arc::clone(&self.table),
            keys,
            guards,
        }
    }

    /// Number of keys currently present in the table.
    pub fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, key: &K) -> Arc<AsyncMutex<()>> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(table.entry(key.clone()).or_default())
    }
}

/// Holds a set of key locks. Releases them, and prunes idle table entries,
/// on drop.
#[derive(Debug)]
pub struct KeyedGuard<K: Eq + Hash> {
    table: Table<K>,
    keys: Vec<K>,
    guards: Vec<OwnedMutexGuard<()>>,
}

impl<K: Eq + Hash> KeyedGuard<K> {
    /// Locked keys in acquisition order.
    pub fn keys(&self) -> &[K] {
        &self.keys
    }
}

impl<K: Eq + Hash> Drop for KeyedGuard<K> {
    fn drop(&mut self) {
        // Release in reverse acquisition order.
        while self.guards.pop().is_some() {}

        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        for key in &self.keys {
            if table.get(key).is_some_and(|slot| Arc::strong_count(slot) == 1) {
                table.remove(key);
            }
        }
    }
}
