//! hierarchy::manager
//!
//! The hierarchy manager: the only writer of boss links and worker counts.
//!
//! # Reassignment
//!
//! `reassign_worker(boss, worker)` runs in three phases:
//! 1. **Lock**: take the topology guard, then the per-node locks for
//!    {worker, previous boss, new boss}. The previous boss is read before
//!    locking, so the worker is re-read under lock and the attempt retried if
//!    it moved in between.
//! 2. **Plan**: load the new boss and reject self-assignment and cycles. No
//!    write has happened yet, so rejections leave the store untouched.
//! 3. **Commit**: detach (decrement the previous boss), then attach (point
//!    the worker at the new boss and increment it, both saved concurrently).
//!
//! # Concurrency
//!
//! Moves under a non-root boss hold the topology guard exclusively, so two
//! moves can never each pass a cycle check and jointly close a loop. Moves
//! to the root cannot create cycles and share the guard with ancestry
//! queries. Per-node locks keep counter updates from being lost when
//! operations share a boss.
//!
//! Store failures are reported with the [`Step`] that failed and are not
//! retried or rolled back; `orgtree doctor --fix` recomputes counts.

use std::sync::Arc;

use tokio::sync::{RwLock, RwLockWriteGuard};
use tracing::{debug, info, warn};

use super::ancestry::AncestryWalk;
use super::error::{HierarchyError, Step, StoreResultExt};
use super::registry::{RootRef, RootRegistry};
use super::HierarchySettings;
use crate::core::node::{NewNode, Node};
use crate::core::ops::keyed::KeyedLocks;
use crate::core::types::{NodeId, Password, Username};
use crate::store::{NodeFilter, NodeStore};

/// Request to create a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: Username,
    pub password: Password,
    /// Admins start without a boss; everyone else starts under the root.
    pub is_admin: bool,
}

/// Outcome of a successful reassignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reassignment {
    /// The worker as persisted.
    pub worker: Node,
    /// The new boss as persisted, or `None` when attached to the root.
    pub boss: Option<Node>,
    /// Boss link before the move.
    pub previous_boss: Option<NodeId>,
}

/// A validated attachment. Only produced by `plan_attachment`.
#[derive(Debug)]
pub(crate) struct AttachPlan {
    worker: Node,
    boss: Option<Node>,
}

impl AttachPlan {
    /// Use the freshly detached copy of the boss when the worker is being
    /// re-attached to the boss it just left.
    fn refresh_boss(&mut self, detached: Option<Node>) {
        if let (Some(boss), Some(fresh)) = (self.boss.as_mut(), detached) {
            if boss.id == fresh.id {
                *boss = fresh;
            }
        }
    }
}

/// Maintains the single-root tree over a [`NodeStore`].
///
/// Cheap to share: wrap in `Arc` and call from any task.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use orgtree::hierarchy::{HierarchyManager, HierarchySettings, NewUser, RootRegistry};
/// use orgtree::store::MemoryNodeStore;
/// use orgtree::core::types::{Password, Username};
///
/// # tokio_test::block_on(async {
/// let manager = HierarchyManager::new(
///     Arc::new(MemoryNodeStore::new()),
///     Arc::new(RootRegistry::new()),
///     HierarchySettings::default(),
/// );
/// manager
///     .initialize_root(Username::new("root").unwrap(), Password::new("pw"))
///     .await
///     .unwrap();
///
/// let alice = manager
///     .create_user(NewUser {
///         username: Username::new("alice").unwrap(),
///         password: Password::new("pw"),
///         is_admin: true,
///     })
///     .await
///     .unwrap();
/// let bob = manager
///     .create_user(NewUser {
///         username: Username::new("bob").unwrap(),
///         password: Password::new("pw"),
///         is_admin: false,
///     })
///     .await
///     .unwrap();
///
/// let moved = manager.reassign_worker(Some(alice.id), bob.id).await.unwrap();
/// assert_eq!(moved.worker.boss, Some(alice.id));
/// assert_eq!(moved.boss.unwrap().count_of_workers, 1);
///
/// assert!(manager.reassign_worker(Some(bob.id), alice.id).await.is_err());
/// # });
/// ```
#[derive(Debug)]
pub struct HierarchyManager<S: ?Sized> {
    store: Arc<S>,
    registry: Arc<RootRegistry>,
    settings: HierarchySettings,
    locks: KeyedLocks<NodeId>,
    topology: RwLock<()>,
}

impl<S> HierarchyManager<S>
where
    S: NodeStore + ?Sized,
{
    pub fn new(store: Arc<S>, registry: Arc<RootRegistry>, settings: HierarchySettings) -> Self {
        Self {
            store,
            registry,
            settings,
            locks: KeyedLocks::new(),
            topology: RwLock::new(()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<RootRegistry> {
        &self.registry
    }

    pub fn settings(&self) -> &HierarchySettings {
        &self.settings
    }

    // =========================================================================
    // Bootstrap
    // =========================================================================

    /// Create or refresh the root and publish it. See
    /// [`RootRegistry::initialize_root`].
    pub async fn initialize_root(
        &self,
        username: Username,
        password: Password,
    ) -> Result<RootRef, HierarchyError> {
        self.registry
            .initialize_root(self.store.as_ref(), username, password)
            .await
    }

    /// Publish the root already present in the store.
    pub async fn load_root(&self) -> Result<RootRef, HierarchyError> {
        self.registry.load_root(self.store.as_ref()).await
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Create a leaf node.
    ///
    /// Admins get no boss. Standard users are attached to the root, which
    /// must be initialized. The root's own count is not tracked, so nothing
    /// else is written.
    pub async fn create_user(&self, user: NewUser) -> Result<Node, HierarchyError> {
        let draft = if user.is_admin {
            NewNode::admin(user.username, user.password)
        } else {
            let root_id = self.registry.root_id()?;
            NewNode::user(user.username, user.password, root_id)
        };

        let node = self.store.create(draft).await.during(Step::Create)?;
        info!(id = %node.id, username = %node.username, role = %node.role, "created user");
        Ok(node)
    }

    pub async fn get_user(&self, id: NodeId) -> Result<Node, HierarchyError> {
        self.load(id, Step::LoadWorker).await
    }

    pub async fn find_user(&self, username: &Username) -> Result<Node, HierarchyError> {
        self.store
            .find_one(&NodeFilter::username(username.clone()))
            .await
            .during(Step::LoadWorker)?
            .ok_or_else(|| HierarchyError::UserNotFound(username.to_string()))
    }

    /// The node `id` reports to.
    ///
    /// `None` for the root. A boss-less admin reports to the root.
    pub async fn boss_of(&self, id: NodeId) -> Result<Option<Node>, HierarchyError> {
        let node = self.load(id, Step::LoadWorker).await?;
        if node.is_root() {
            return Ok(None);
        }
        let boss_id = match node.boss {
            Some(boss_id) => boss_id,
            None => self.registry.root_id()?,
        };
        self.load(boss_id, Step::LoadBoss).await.map(Some)
    }

    /// Direct workers of `id`, oldest first.
    ///
    /// For the root this includes boss-less admins.
    pub async fn workers_of(&self, id: NodeId) -> Result<Vec<Node>, HierarchyError> {
        let node = self.load(id, Step::LoadBoss).await?;
        let nodes = self.store.list().await.during(Step::List)?;
        let reports_to_root = |n: &Node| node.is_root() && n.boss.is_none() && !n.is_root();
        Ok(nodes
            .into_iter()
            .filter(|n| n.boss == Some(node.id) || reports_to_root(n))
            .collect())
    }

    /// Every stored node, oldest first.
    pub async fn snapshot(&self) -> Result<Vec<Node>, HierarchyError> {
        self.store.list().await.during(Step::List)
    }

    /// Block every reassignment and ancestry query until the guard drops.
    ///
    /// Repairs that rewrite counts from a snapshot hold this so the snapshot
    /// cannot go stale underneath them.
    pub async fn freeze(&self) -> RwLockWriteGuard<'_, ()> {
        self.topology.write().await
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Whether `candidate` is an ancestor of `node`.
    ///
    /// Runs against a stable topology: reassignments under a non-root boss
    /// wait until the walk finishes.
    pub async fn is_ancestor_of(&self, candidate: NodeId, node: NodeId) -> Result<bool, HierarchyError> {
        let _topology = self.topology.read().await;
        let candidate = self.load(candidate, Step::Traverse).await?;
        let node = self.load(node, Step::Traverse).await?;
        self.walk().is_ancestor_of(&candidate, &node).await
    }

    // =========================================================================
    // Reassignment
    // =========================================================================

    /// Move `worker` under `boss`, or under the root when `boss` is `None`
    /// or the root itself.
    ///
    /// # Errors
    ///
    /// - `SelfAssignment` if `boss == Some(worker)`
    /// - `RootImmutable` if `worker` is the root
    /// - `CyclicAssignment` if `worker` is above `boss`
    /// - `NotFound` if either node is missing
    /// - `NotInitialized` before the root is published
    /// - `Contention` if the worker kept moving while we tried to lock it
    /// - `Persistence` for store failures, naming the failed step
    pub async fn reassign_worker(
        &self,
        boss: Option<NodeId>,
        worker: NodeId,
    ) -> Result<Reassignment, HierarchyError> {
        if boss == Some(worker) {
            return Err(HierarchyError::SelfAssignment { id: worker });
        }

        let root = self.registry.get()?;
        let target = boss.filter(|id| *id != root.id);

        let (_shared, _exclusive) = match target {
            Some(_) => (None, Some(self.topology.write().await)),
            None => (Some(self.topology.read().await), None),
        };

        let attempts = self.settings.lock_retries;
        for attempt in 1..=attempts {
            let observed = self.load(worker, Step::LoadWorker).await?;
            if observed.is_root() || observed.id == root.id {
                return Err(HierarchyError::RootImmutable);
            }

            let previous = observed.boss.filter(|id| *id != root.id);
            let _locks = self
                .locks
                .acquire([Some(worker), previous, target].into_iter().flatten())
                .await;

            let current = self.load(worker, Step::LoadWorker).await?;
            if current.boss != observed.boss {
                debug!(%worker, attempt, "worker moved while locking; retrying");
                continue;
            }

            return self.reassign_locked(current, target, root.id).await;
        }

        warn!(%worker, attempts, "gave up locking worker");
        Err(HierarchyError::Contention {
            id: worker,
            attempts,
        })
    }

    async fn reassign_locked(
        &self,
        worker: Node,
        target: Option<NodeId>,
        root_id: NodeId,
    ) -> Result<Reassignment, HierarchyError> {
        let boss = match target {
            Some(id) => Some(self.load(id, Step::LoadBoss).await?),
            None => None,
        };

        let previous_boss = worker.boss;
        let mut plan = self.plan_attachment(worker, boss).await?;
        let detached = self.detach_from_current_boss(&plan.worker, root_id).await?;
        plan.refresh_boss(detached);
        let (worker, boss) = self.attach_to_boss(plan, root_id).await?;

        info!(
            worker = %worker.id,
            boss = ?boss.as_ref().map(|b| b.id),
            previous = ?previous_boss,
            "reassigned worker"
        );
        Ok(Reassignment {
            worker,
            boss,
            previous_boss,
        })
    }

    /// Validate placing `worker` under `boss` (`None` = the root).
    ///
    /// Pure read: rejects before anything is written.
    pub(crate) async fn plan_attachment(
        &self,
        worker: Node,
        boss: Option<Node>,
    ) -> Result<AttachPlan, HierarchyError> {
        if worker.is_root() {
            return Err(HierarchyError::RootImmutable);
        }
        if let Some(boss) = &boss {
            if boss.id == worker.id {
                return Err(HierarchyError::SelfAssignment { id: worker.id });
            }
            if self.walk().chain_contains(&worker, boss).await? {
                return Err(HierarchyError::CyclicAssignment {
                    worker: worker.id,
                    boss: boss.id,
                });
            }
        }
        Ok(AttachPlan { worker, boss })
    }

    /// Decrement the worker's current boss.
    ///
    /// No write when the worker has no boss or reports to the root. A
    /// missing boss is logged and skipped. Returns the saved boss, if any.
    pub(crate) async fn detach_from_current_boss(
        &self,
        worker: &Node,
        root_id: NodeId,
    ) -> Result<Option<Node>, HierarchyError> {
        let Some(boss_id) = worker.boss.filter(|id| *id != root_id) else {
            return Ok(None);
        };

        let Some(mut boss) = self
            .store
            .find_by_id(&boss_id)
            .await
            .during(Step::LoadOldBoss)?
        else {
            warn!(worker = %worker.id, boss = %boss_id, "previous boss is missing; nothing to detach");
            return Ok(None);
        };

        if boss.count_of_workers == 0 {
            warn!(boss = %boss.id, "worker count already zero; run `orgtree doctor --fix`");
        }
        boss.count_of_workers = boss.count_of_workers.saturating_sub(1);

        let saved = self.store.save(&boss).await.during(Step::SaveOldBoss)?;
        debug!(boss = %saved.id, count = saved.count_of_workers, "detached worker");
        Ok(Some(saved))
    }

    /// Point the worker at its new boss and persist.
    ///
    /// Attaching to a real boss saves worker and boss concurrently.
    /// Attaching to the root saves only the worker.
    pub(crate) async fn attach_to_boss(
        &self,
        plan: AttachPlan,
        root_id: NodeId,
    ) -> Result<(Node, Option<Node>), HierarchyError> {
        let AttachPlan { mut worker, boss } = plan;

        match boss {
            Some(mut boss) => {
                worker.boss = Some(boss.id);
                boss.count_of_workers = boss.count_of_workers.saturating_add(1);

                let (worker, boss) = tokio::try_join!(
                    async { self.store.save(&worker).await.during(Step::SaveWorker) },
                    async { self.store.save(&boss).await.during(Step::SaveBoss) },
                )?;
                Ok((worker, Some(boss)))
            }
            None => {
                worker.boss = Some(root_id);
                let worker = self.store.save(&worker).await.during(Step::SaveWorker)?;
                Ok((worker, None))
            }
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn walk(&self) -> AncestryWalk<'_, S> {
        AncestryWalk::new(
            self.store.as_ref(),
            self.registry.root_id().ok(),
            self.settings.max_depth,
        )
    }

    async fn load(&self, id: NodeId, step: Step) -> Result<Node, HierarchyError> {
        self.store
            .find_by_id(&id)
            .await
            .during(step)?
            .ok_or(HierarchyError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FailOn, MemoryNodeStore, StoreError};

    struct Fixture {
        store: Arc<MemoryNodeStore>,
        manager: HierarchyManager<MemoryNodeStore>,
        root: RootRef,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryNodeStore::new());
        let manager = HierarchyManager::new(
            Arc::clone(&store),
            Arc::new(RootRegistry::new()),
            HierarchySettings::default(),
        );
        let root = manager
            .initialize_root(Username::new("root").unwrap(), Password::new("pw"))
            .await
            .unwrap();
        Fixture {
            store,
            manager,
            root,
        }
    }

    async fn user(f: &Fixture, name: &str, is_admin: bool) -> Node {
        f.manager
            .create_user(NewUser {
                username: Username::new(name).unwrap(),
                password: Password::new("pw"),
                is_admin,
            })
            .await
            .unwrap()
    }

    mod detach {
        use super::*;

        #[tokio::test]
        async fn from_root_writes_nothing() {
            let f = fixture().await;
            let bob = user(&f, "bob", false).await;
            f.store.clear_operations();

            let out = f.manager.detach_from_current_boss(&bob, f.root.id).await.unwrap();
            assert!(out.is_none());
            assert!(f.store.operations().is_empty());
        }

        #[tokio::test]
        async fn boss_less_worker_writes_nothing() {
            let f = fixture().await;
            let alice = user(&f, "alice", true).await;
            f.store.clear_operations();

            assert!(f.manager.detach_from_current_boss(&alice, f.root.id).await.unwrap().is_none());
            assert!(f.store.operations().is_empty());
        }

        #[tokio::test]
        async fn decrements_boss_with_one_write() {
            let f = fixture().await;
            let alice = user(&f, "alice", true).await;
            let bob = user(&f, "bob", false).await;
            let moved = f.manager.reassign_worker(Some(alice.id), bob.id).await.unwrap();
            f.store.clear_operations();

            let saved = f
                .manager
                .detach_from_current_boss(&moved.worker, f.root.id)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(saved.count_of_workers, 0);
            assert_eq!(f.store.saved_ids(), vec![alice.id]);
        }

        #[tokio::test]
        async fn missing_boss_is_skipped() {
            let f = fixture().await;
            let mut bob = user(&f, "bob", false).await;
            bob.boss = Some(NodeId::new());

            let out = f.manager.detach_from_current_boss(&bob, f.root.id).await.unwrap();
            assert!(out.is_none());
            assert!(f.store.saved_ids().is_empty());
        }

        #[tokio::test]
        async fn zero_count_is_clamped() {
            let f = fixture().await;
            let alice = user(&f, "alice", true).await;
            let mut bob = user(&f, "bob", false).await;
            bob.boss = Some(alice.id);

            let saved = f
                .manager
                .detach_from_current_boss(&bob, f.root.id)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(saved.count_of_workers, 0);
        }
    }

    mod attach {
        use super::*;

        #[tokio::test]
        async fn to_root_saves_worker_only() {
            let f = fixture().await;
            let alice = user(&f, "alice", true).await;
            f.store.clear_operations();

            let plan = f.manager.plan_attachment(alice.clone(), None).await.unwrap();
            let (worker, boss) = f.manager.attach_to_boss(plan, f.root.id).await.unwrap();
            assert_eq!(worker.boss, Some(f.root.id));
            assert!(boss.is_none());
            assert_eq!(f.store.saved_ids(), vec![alice.id]);
        }

        #[tokio::test]
        async fn to_boss_saves_both() {
            let f = fixture().await;
            let alice = user(&f, "alice", true).await;
            let bob = user(&f, "bob", false).await;
            f.store.clear_operations();

            let plan = f.manager.plan_attachment(bob.clone(), Some(alice.clone())).await.unwrap();
            let (worker, boss) = f.manager.attach_to_boss(plan, f.root.id).await.unwrap();
            assert_eq!(worker.boss, Some(alice.id));
            assert_eq!(boss.unwrap().count_of_workers, 1);

            let mut saved = f.store.saved_ids();
            saved.sort();
            let mut expected = vec![alice.id, bob.id];
            expected.sort();
            assert_eq!(saved, expected);
        }

        #[tokio::test]
        async fn plan_rejects_self() {
            let f = fixture().await;
            let alice = user(&f, "alice", true).await;
            let err = f
                .manager
                .plan_attachment(alice.clone(), Some(alice.clone()))
                .await
                .unwrap_err();
            assert_eq!(err, HierarchyError::SelfAssignment { id: alice.id });
        }

        #[tokio::test]
        async fn plan_rejects_root_worker() {
            let f = fixture().await;
            let root = f.store.get_sync(&f.root.id).unwrap();
            let alice = user(&f, "alice", true).await;
            let err = f.manager.plan_attachment(root, Some(alice)).await.unwrap_err();
            assert_eq!(err, HierarchyError::RootImmutable);
        }

        #[tokio::test]
        async fn refresh_uses_detached_copy_of_same_boss() {
            let f = fixture().await;
            let alice = user(&f, "alice", true).await;
            let bob = user(&f, "bob", false).await;
            let mut stale = alice.clone();
            stale.count_of_workers = 9;

            let mut plan = f.manager.plan_attachment(bob, Some(stale)).await.unwrap();
            plan.refresh_boss(Some(alice.clone()));
            let (_, boss) = f.manager.attach_to_boss(plan, f.root.id).await.unwrap();
            assert_eq!(boss.unwrap().count_of_workers, 1);
        }

        #[tokio::test]
        async fn boss_save_failure_names_step() {
            let f = fixture().await;
            let alice = user(&f, "alice", true).await;
            let bob = user(&f, "bob", false).await;
            f.store
                .set_fail_on(FailOn::SaveNode(alice.id, StoreError::Io("disk full".into())));

            let plan = f.manager.plan_attachment(bob, Some(alice)).await.unwrap();
            let err = f.manager.attach_to_boss(plan, f.root.id).await.unwrap_err();
            assert!(matches!(
                err,
                HierarchyError::Persistence {
                    step: Step::SaveBoss,
                    ..
                }
            ));
        }
    }
}
