//! Property-based tests for the hierarchy.
//!
//! These tests use proptest to verify invariants hold across randomly
//! generated reassignment sequences.

use std::sync::Arc;

use proptest::prelude::*;

use orgtree::core::graph::OrgGraph;
use orgtree::core::node::Node;
use orgtree::core::types::{NodeId, Password, Username};
use orgtree::core::verify::verify_nodes;
use orgtree::hierarchy::{HierarchyError, HierarchyManager, HierarchySettings, NewUser, RootRegistry};
use orgtree::store::MemoryNodeStore;

const POPULATION: usize = 8;

/// One requested move: `boss` is an index into the population, or `None`
/// for the root.
#[derive(Debug, Clone)]
struct Move {
    boss: Option<usize>,
    worker: usize,
}

fn move_strategy() -> impl Strategy<Value = Move> {
    (prop::option::weighted(0.8, 0..POPULATION), 0..POPULATION)
        .prop_map(|(boss, worker)| Move { boss, worker })
}

struct World {
    store: Arc<MemoryNodeStore>,
    manager: HierarchyManager<MemoryNodeStore>,
    root: NodeId,
    people: Vec<NodeId>,
}

async fn world(admin_mask: u8) -> World {
    let store = Arc::new(MemoryNodeStore::new());
    let manager = HierarchyManager::new(
        Arc::clone(&store),
        Arc::new(RootRegistry::new()),
        HierarchySettings::default(),
    );
    let root = manager
        .initialize_root(Username::new("root").unwrap(), Password::new("pw"))
        .await
        .unwrap()
        .id;

    let mut people = Vec::new();
    for i in 0..POPULATION {
        let node = manager
            .create_user(NewUser {
                username: Username::new(format!("p{}", i)).unwrap(),
                password: Password::new("pw"),
                is_admin: admin_mask & (1 << i) != 0,
            })
            .await
            .unwrap();
        people.push(node.id);
    }

    World {
        store,
        manager,
        root,
        people,
    }
}

fn links(nodes: &[Node]) -> Vec<(NodeId, Option<NodeId>, u32)> {
    let mut out: Vec<_> = nodes
        .iter()
        .map(|n| (n.id, n.boss, n.count_of_workers))
        .collect();
    out.sort();
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every committed move keeps the tree valid; every rejected move is
    /// predicted by the snapshot graph and writes nothing.
    #[test]
    fn random_moves_keep_invariants(
        admin_mask in any::<u8>(),
        moves in prop::collection::vec(move_strategy(), 1..40),
    ) {
        tokio_test::block_on(async {
            let w = world(admin_mask).await;

            for m in &moves {
                let worker = w.people[m.worker];
                let boss = m.boss.map(|i| w.people[i]);

                let before = w.store.all_nodes();
                let graph = OrgGraph::from_nodes(&before);
                let result = w.manager.reassign_worker(boss, worker).await;

                match (&result, boss) {
                    (Err(HierarchyError::SelfAssignment { id }), Some(b)) => {
                        prop_assert_eq!(*id, worker);
                        prop_assert_eq!(b, worker);
                    }
                    (Err(HierarchyError::CyclicAssignment { .. }), Some(b)) => {
                        prop_assert!(graph.is_strict_ancestor(&worker, &b));
                    }
                    (Ok(outcome), _) => {
                        prop_assert_eq!(outcome.worker.boss, Some(boss.unwrap_or(w.root)));
                        if let Some(b) = boss {
                            prop_assert!(!graph.is_strict_ancestor(&worker, &b));
                        }
                    }
                    (Err(other), _) => {
                        prop_assert!(false, "unexpected error: {}", other);
                    }
                }

                let after = w.store.all_nodes();
                if result.is_err() {
                    prop_assert_eq!(links(&before), links(&after));
                }

                let verified = verify_nodes(&after);
                prop_assert!(verified.ok, "{:?}", verified.errors);
                prop_assert_eq!(w.store.get_sync(&w.root).unwrap().boss, None);
            }
            Ok(())
        })?;
    }

    /// The root is an ancestor of everyone and nobody is their own ancestor,
    /// whatever shape the tree has.
    #[test]
    fn ancestry_basics_hold(
        admin_mask in any::<u8>(),
        moves in prop::collection::vec(move_strategy(), 0..20),
    ) {
        tokio_test::block_on(async {
            let w = world(admin_mask).await;
            for m in &moves {
                let _ = w
                    .manager
                    .reassign_worker(m.boss.map(|i| w.people[i]), w.people[m.worker])
                    .await;
            }

            let graph = OrgGraph::from_nodes(&w.store.all_nodes());
            for &id in &w.people {
                prop_assert!(!w.manager.is_ancestor_of(id, id).await.unwrap());
                prop_assert!(w.manager.is_ancestor_of(w.root, id).await.unwrap());

                for &other in &w.people {
                    let candidate = w.store.get_sync(&id).unwrap();
                    // Boss-less admins answer true for everyone by definition.
                    if candidate.boss.is_none() || id == other {
                        continue;
                    }
                    let expected = graph.is_strict_ancestor(&id, &other);
                    prop_assert_eq!(w.manager.is_ancestor_of(id, other).await.unwrap(), expected);
                }
            }
            Ok(())
        })?;
    }
}
