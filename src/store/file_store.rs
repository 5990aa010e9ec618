//! store::file_store
//!
//! File-backed node store: one JSON document per node.
//!
//! # Layout
//!
//! See [`crate::core::paths::OrgPaths`]. Documents use the versioned schema in
//! [`crate::core::node::schema`].
//!
//! # Guarantees
//!
//! - Writes are atomic (write to temp file, sync, then rename)
//! - The data directory is held with an exclusive [`StoreLock`] for the
//!   store's lifetime, so a second process fails fast with `Locked`
//! - Writes within this process are serialized, which keeps username
//!   uniqueness checks and temp files race free
//! - Passwords are never logged
//!
//! Blocking filesystem calls run on tokio's blocking pool.
//!
//! # Example
//!
//! ```no_run
//! use orgtree::core::paths::OrgPaths;
//! use orgtree::store::{FileNodeStore, NodeStore};
//! use std::path::PathBuf;
//!
//! # tokio_test::block_on(async {
//! let store = FileNodeStore::open(OrgPaths::new(PathBuf::from("/var/lib/orgtree"))).unwrap();
//! for node in store.list().await.unwrap() {
//!     println!("{} {}", node.id, node.username);
//! }
//! # });
//! ```

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::traits::{sort_oldest_first, NodeFilter, NodeStore, StoreError};
use crate::core::node::{parse_node, NewNode, Node, NodeDocumentV1};
use crate::core::ops::lock::{LockError, StoreLock};
use crate::core::paths::OrgPaths;
use crate::core::types::NodeId;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Node store rooted at a data directory.
#[derive(Debug)]
pub struct FileNodeStore {
    paths: Arc<OrgPaths>,
    write_guard: Mutex<()>,
    _lock: StoreLock,
}

impl FileNodeStore {
    /// Open (and create if needed) the store at `paths`.
    ///
    /// # Errors
    ///
    /// - `Locked` if another process has the directory open
    /// - `Io` if the directories cannot be created
    pub fn open(paths: OrgPaths) -> Result<Self, StoreError> {
        let lock = StoreLock::acquire(&paths).map_err(|e| match e {
            LockError::AlreadyLocked => StoreError::Locked,
            other => StoreError::Io(other.to_string()),
        })?;

        let nodes_dir = paths.nodes_dir();
        fs::create_dir_all(&nodes_dir).map_err(|e| {
            StoreError::Io(format!("cannot create {}: {}", nodes_dir.display(), e))
        })?;

        debug!(dir = %paths.data_dir().display(), "opened file store");
        Ok(Self {
            paths: Arc::new(paths),
            write_guard: Mutex::new(()),
            _lock: lock,
        })
    }

    pub fn paths(&self) -> &OrgPaths {
        &self.paths
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&OrgPaths) -> Result<T, StoreError> + Send + 'static,
    {
        let paths = Arc::clone(&self.paths);
        tokio::task::spawn_blocking(move || f(paths.as_ref()))
            .await
            .map_err(|e| StoreError::Unavailable(format!("blocking task failed: {}", e)))?
    }
}

fn read_node(paths: &OrgPaths, id: &NodeId) -> Result<Option<Node>, StoreError> {
    let path = paths.node_path(id);
    match fs::read_to_string(&path) {
        Ok(contents) => parse_document(&path, &contents).map(Some),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::Io(format!("cannot read {}: {}", path.display(), e))),
    }
}

fn parse_document(path: &Path, contents: &str) -> Result<Node, StoreError> {
    parse_node(contents).map_err(|e| StoreError::Parse {
        location: path.display().to_string(),
        message: e.to_string(),
    })
}

fn read_all(paths: &OrgPaths) -> Result<Vec<Node>, StoreError> {
    let dir = paths.nodes_dir();
    let entries = fs::read_dir(&dir)
        .map_err(|e| StoreError::Io(format!("cannot list {}: {}", dir.display(), e)))?;

    let mut nodes = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::Io(e.to_string()))?;
        let path = entry.path();
        let Some(id) = OrgPaths::id_from_path(&path) else {
            if path.extension().is_some_and(|ext| ext == "tmp") {
                warn!(path = %path.display(), "ignoring leftover temp file");
            }
            continue;
        };
        let contents = fs::read_to_string(&path)
            .map_err(|e| StoreError::Io(format!("cannot read {}: {}", path.display(), e)))?;
        let node = parse_document(&path, &contents)?;
        if node.id != id {
            return Err(StoreError::Parse {
                location: path.display().to_string(),
                message: format!("document id {} does not match file name", node.id),
            });
        }
        nodes.push(node);
    }
    sort_oldest_first(&mut nodes);
    Ok(nodes)
}

fn write_node(paths: &OrgPaths, node: &Node) -> Result<(), StoreError> {
    let json = NodeDocumentV1::from_node(node)
        .to_json()
        .map_err(|e| StoreError::Serialize(e.to_string()))?;

    let path = paths.node_path(&node.id);
    let temp_path = paths.node_temp_path(&node.id);
    let io_err = |what: &str, e: std::io::Error| {
        StoreError::Io(format!("cannot {} {}: {}", what, temp_path.display(), e))
    };

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| io_err("create", e))?;

        // Records carry credentials: owner read/write only.
        #[cfg(unix)]
        {
            file.set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(|e| io_err("set permissions on", e))?;
        }

        file.write_all(json.as_bytes())
            .map_err(|e| io_err("write", e))?;
        file.sync_all().map_err(|e| io_err("sync", e))?;
    }

    fs::rename(&temp_path, &path)
        .map_err(|e| StoreError::Io(format!("cannot rename into {}: {}", path.display(), e)))
}

#[async_trait]
impl NodeStore for FileNodeStore {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn find_by_id(&self, id: &NodeId) -> Result<Option<Node>, StoreError> {
        let id = *id;
        self.blocking(move |paths| read_node(paths, &id)).await
    }

    async fn find_one(&self, filter: &NodeFilter) -> Result<Option<Node>, StoreError> {
        let filter = filter.clone();
        self.blocking(move |paths| {
            Ok(read_all(paths)?.into_iter().find(|n| filter.matches(n)))
        })
        .await
    }

    async fn save(&self, node: &Node) -> Result<Node, StoreError> {
        let _guard = self.write_guard.lock().await;
        let node = node.clone();
        let saved = self
            .blocking(move |paths| {
                let Some(existing) = read_node(paths, &node.id)? else {
                    return Err(StoreError::NotFound(node.id));
                };
                let mut stored = node;
                stored.timestamps.created_at = existing.timestamps.created_at;
                stored.touch();
                write_node(paths, &stored)?;
                Ok(stored)
            })
            .await?;
        debug!(id = %saved.id, "file store saved node");
        Ok(saved)
    }

    async fn create(&self, draft: NewNode) -> Result<Node, StoreError> {
        let _guard = self.write_guard.lock().await;
        let node = self
            .blocking(move |paths| {
                if read_all(paths)?.iter().any(|n| n.username == draft.username) {
                    return Err(StoreError::AlreadyExists(draft.username.to_string()));
                }
                let node = Node::from_new(NodeId::new(), draft);
                write_node(paths, &node)?;
                Ok(node)
            })
            .await?;
        debug!(id = %node.id, username = %node.username, "file store created node");
        Ok(node)
    }

    async fn list(&self) -> Result<Vec<Node>, StoreError> {
        self.blocking(read_all).await
    }
}
