//! core::ops::lock
//!
//! Exclusive writer lock on a data directory.
//!
//! # Architecture
//!
//! The file-backed store holds this lock for its whole lifetime so that a
//! second `orgtree` process cannot interleave writes into the same data
//! directory. Per-node locking inside one process is handled separately by
//! [`super::keyed::KeyedLocks`].
//!
//! # Storage
//!
//! - `<data_dir>/lock` - Lock file with OS-level exclusive lock
//!
//! # Invariants
//!
//! - Lock is automatically released on drop (RAII pattern)
//! - Lock acquisition is non-blocking (fails fast if locked)
//!
//! # Example
//!
//! ```no_run
//! use orgtree::core::ops::lock::StoreLock;
//! use orgtree::core::paths::OrgPaths;
//! use std::path::PathBuf;
//!
//! let paths = OrgPaths::new(PathBuf::from("/var/lib/orgtree"));
//! let lock = StoreLock::acquire(&paths).unwrap();
//! assert!(lock.is_held());
//! drop(lock);
//! ```

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

use crate::core::paths::OrgPaths;

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process already holds the lock.
    #[error("data directory is locked by another orgtree process")]
    AlreadyLocked,

    /// Failed to create lock file or directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),
}

/// An exclusive lock on a data directory.
///
/// Released when dropped.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
    /// When this is Some, we hold the lock.
    file: Option<File>,
}

impl StoreLock {
    /// Attempt to acquire the data directory lock.
    ///
    /// Creates the data directory if needed.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] if another process holds the lock
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock cannot be acquired
    pub fn acquire(paths: &OrgPaths) -> Result<Self, LockError> {
        let dir = paths.data_dir();
        fs::create_dir_all(dir).map_err(|e| {
            LockError::CreateFailed(format!("cannot create {}: {}", dir.display(), e))
        })?;

        let path = paths.lock_path();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e))
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                path,
                file: Some(file),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(LockError::AlreadyLocked),
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_paths(temp: &TempDir) -> OrgPaths {
        OrgPaths::new(temp.path().join("data"))
    }

    #[test]
    fn acquire_creates_data_dir() {
        let temp = TempDir::new().unwrap();
        let paths = test_paths(&temp);
        assert!(!paths.data_dir().exists());

        let lock = StoreLock::acquire(&paths).expect("acquire lock");
        assert!(lock.is_held());
        assert!(paths.data_dir().exists());
        assert_eq!(lock.path(), paths.lock_path());
    }

    #[test]
    fn second_acquire_fails() {
        let temp = TempDir::new().unwrap();
        let paths = test_paths(&temp);

        let _held = StoreLock::acquire(&paths).expect("first acquire");
        let result = StoreLock::acquire(&paths);
        assert!(matches!(result, Err(LockError::AlreadyLocked)));
    }

    #[test]
    fn released_on_drop() {
        let temp = TempDir::new().unwrap();
        let paths = test_paths(&temp);

        {
            let _lock = StoreLock::acquire(&paths).expect("first acquire");
        }

        assert!(StoreLock::acquire(&paths).is_ok());
    }
}
