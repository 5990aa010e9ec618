//! core::paths
//!
//! Centralized path routing for the on-disk node store.
//!
//! # Storage Layout
//!
//! Everything lives under a single data directory:
//! - `nodes/<id>.json` - One document per node
//! - `lock` - Exclusive writer lock
//!
//! No code outside this module should join paths under the data directory.
//!
//! # Example
//!
//! ```
//! use orgtree::core::paths::OrgPaths;
//! use std::path::PathBuf;
//!
//! let paths = OrgPaths::new(PathBuf::from("/var/lib/orgtree"));
//! assert_eq!(paths.lock_path(), PathBuf::from("/var/lib/orgtree/lock"));
//! ```

use std::path::{Path, PathBuf};

use super::types::NodeId;

/// File extension of node documents.
pub const NODE_EXT: &str = "json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgPaths {
    pub data_dir: PathBuf,
}

impl OrgPaths {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory holding node documents.
    pub fn nodes_dir(&self) -> PathBuf {
        self.data_dir.join("nodes")
    }

    /// Document path for a single node.
    ///
    /// ```
    /// use orgtree::core::paths::OrgPaths;
    /// use orgtree::core::types::NodeId;
    /// use std::path::PathBuf;
    ///
    /// let paths = OrgPaths::new(PathBuf::from("/data"));
    /// let id: NodeId = "0b6f2a51-8c1e-4d5a-9f3b-2c7d8e9f0a1b".parse().unwrap();
    /// assert_eq!(
    ///     paths.node_path(&id),
    ///     PathBuf::from("/data/nodes/0b6f2a51-8c1e-4d5a-9f3b-2c7d8e9f0a1b.json")
    /// );
    /// ```
    pub fn node_path(&self, id: &NodeId) -> PathBuf {
        self.nodes_dir().join(format!("{}.{}", id, NODE_EXT))
    }

    /// Temporary path used while writing a node document.
    pub fn node_temp_path(&self, id: &NodeId) -> PathBuf {
        self.nodes_dir().join(format!("{}.{}.tmp", id, NODE_EXT))
    }

    pub fn lock_path(&self) -> PathBuf {
        self.data_dir.join("lock")
    }

    /// Recover a node id from a document path, if it names one.
    pub fn id_from_path(path: &Path) -> Option<NodeId> {
        if path.extension()? != NODE_EXT {
            return None;
        }
        path.file_stem()?.to_str()?.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> OrgPaths {
        OrgPaths::new(PathBuf::from("/data"))
    }

    #[test]
    fn layout() {
        let p = paths();
        assert_eq!(p.nodes_dir(), PathBuf::from("/data/nodes"));
        assert_eq!(p.lock_path(), PathBuf::from("/data/lock"));
        assert_eq!(p.data_dir(), Path::new("/data"));
    }

    #[test]
    fn id_round_trips_through_path() {
        let p = paths();
        let id = NodeId::new();
        assert_eq!(OrgPaths::id_from_path(&p.node_path(&id)), Some(id));
    }

    #[test]
    fn temp_and_foreign_files_ignored() {
        let p = paths();
        let id = NodeId::new();
        assert_eq!(OrgPaths::id_from_path(&p.node_temp_path(&id)), None);
        assert_eq!(OrgPaths::id_from_path(Path::new("/data/nodes/readme.json")), None);
        assert_eq!(OrgPaths::id_from_path(Path::new("/data/nodes/notes.txt")), None);
    }
}
