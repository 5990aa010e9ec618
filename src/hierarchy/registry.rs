//! hierarchy::registry
//!
//! Holder of the root identity.
//!
//! # Lifecycle
//!
//! 1. Construct an empty registry at startup and share it as `Arc<RootRegistry>`.
//! 2. Populate it once: [`RootRegistry::initialize_root`] for a fresh or
//!    re-keyed root, or [`RootRegistry::load_root`] to adopt the stored one.
//! 3. Every hierarchy operation reads it through [`RootRegistry::get`].
//! 4. [`RootRegistry::clear`] exists for teardown in tests; nothing else
//!    un-publishes the root.
//!
//! # Invariants
//!
//! - Readers see either no root or a fully built [`RootRef`], never a
//!   partially written one (the whole `Arc` is swapped under a write lock)
//! - Initialization is serialized, so racing callers cannot create two roots

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Mutex;
use tracing::{info, warn};

use super::error::{HierarchyError, Step, StoreResultExt};
use crate::core::node::NewNode;
use crate::core::types::{NodeId, Password, Role, Username};
use crate::store::{NodeFilter, NodeStore};

/// Identity of the root node.
///
/// The password is kept so bootstrap can display it once; its `Debug`
/// output is redacted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootRef {
    pub id: NodeId,
    pub username: Username,
    pub password: Password,
}

#[derive(Debug, Default)]
pub struct RootRegistry {
    current: RwLock<Option<Arc<RootRef>>>,
    init: Mutex<()>,
}

impl RootRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with a known root.
    pub fn with_root(root: RootRef) -> Self {
        let registry = Self::new();
        registry.set(root);
        registry
    }

    /// The published root.
    ///
    /// # Errors
    ///
    /// `NotInitialized` before the root has been set in this process.
    pub fn get(&self) -> Result<Arc<RootRef>, HierarchyError> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(HierarchyError::NotInitialized)
    }

    pub fn root_id(&self) -> Result<NodeId, HierarchyError> {
        self.get().map(|root| root.id)
    }

    pub fn is_initialized(&self) -> bool {
        self.get().is_ok()
    }

    /// Publish a root identity, replacing any previous one.
    pub fn set(&self, root: RootRef) {
        let root = Arc::new(root);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(root);
    }

    /// Forget the published root.
    pub fn clear(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Create the root node, or refresh the password of the existing one,
    /// and publish it.
    ///
    /// Repeated calls keep the same id. An existing root keeps its stored
    /// username; a differing `username` argument is logged and ignored.
    ///
    /// # Example
    ///
    /// ```
    /// use orgtree::hierarchy::RootRegistry;
    /// use orgtree::store::MemoryNodeStore;
    /// use orgtree::core::types::{Password, Username};
    ///
    /// # tokio_test::block_on(async {
    /// let store = MemoryNodeStore::new();
    /// let registry = RootRegistry::new();
    ///
    /// let first = registry
    ///     .initialize_root(&store, Username::new("root").unwrap(), Password::new("a"))
    ///     .await
    ///     .unwrap();
    /// let second = registry
    ///     .initialize_root(&store, Username::new("root").unwrap(), Password::new("b"))
    ///     .await
    ///     .unwrap();
    ///
    /// assert_eq!(first.id, second.id);
    /// assert_eq!(second.password.expose(), "b");
    /// # });
    /// ```
    pub async fn initialize_root<S>(
        &self,
        store: &S,
        username: Username,
        password: Password,
    ) -> Result<RootRef, HierarchyError>
    where
        S: NodeStore + ?Sized,
    {
        let _init = self.init.lock().await;

        let existing = store
            .find_one(&NodeFilter::role(Role::Root))
            .await
            .during(Step::LookupRoot)?;

        let node = match existing {
            Some(mut node) => {
                if node.username != username {
                    warn!(
                        stored = %node.username,
                        requested = %username,
                        "root already exists; keeping stored username"
                    );
                }
                node.password = password;
                let saved = store.save(&node).await.during(Step::SaveRoot)?;
                info!(id = %saved.id, "refreshed root credentials");
                saved
            }
            None => {
                let created = store
                    .create(NewNode::root(username, password))
                    .await
                    .during(Step::Create)?;
                info!(id = %created.id, username = %created.username, "created root");
                created
            }
        };

        let root = RootRef {
            id: node.id,
            username: node.username,
            password: node.password,
        };
        self.set(root.clone());
        Ok(root)
    }

    /// Publish the root already present in `store`.
    ///
    /// # Errors
    ///
    /// `NotInitialized` if the store holds no root.
    pub async fn load_root<S>(&self, store: &S) -> Result<RootRef, HierarchyError>
    where
        S: NodeStore + ?Sized,
    {
        let node = store
            .find_one(&NodeFilter::role(Role::Root))
            .await
            .during(Step::LookupRoot)?
            .ok_or(HierarchyError::NotInitialized)?;

        let root = RootRef {
            id: node.id,
            username: node.username,
            password: node.password,
        };
        self.set(root.clone());
        Ok(root)
    }
}
