//! Integration tests for the file-backed store.
//!
//! The hierarchy manager runs on top of `FileNodeStore` in a temp directory;
//! state must survive closing and reopening the store.

use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use orgtree::core::paths::OrgPaths;
use orgtree::core::types::{NodeId, Password, Username};
use orgtree::core::verify::verify_nodes;
use orgtree::doctor::Doctor;
use orgtree::hierarchy::{HierarchyError, HierarchyManager, HierarchySettings, NewUser, RootRegistry};
use orgtree::store::{FileNodeStore, NodeStore, StoreError};

fn open(temp: &TempDir) -> HierarchyManager<FileNodeStore> {
    let store = FileNodeStore::open(OrgPaths::new(temp.path().join("data"))).unwrap();
    HierarchyManager::new(
        Arc::new(store),
        Arc::new(RootRegistry::new()),
        HierarchySettings::default(),
    )
}

async fn add(manager: &HierarchyManager<FileNodeStore>, name: &str, is_admin: bool) -> NodeId {
    manager
        .create_user(NewUser {
            username: Username::new(name).unwrap(),
            password: Password::new("pw"),
            is_admin,
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn tree_survives_reopen() {
    let temp = TempDir::new().unwrap();

    let (root, alice, bob) = {
        let manager = open(&temp);
        let root = manager
            .initialize_root(Username::new("root").unwrap(), Password::new("pw"))
            .await
            .unwrap()
            .id;
        let alice = add(&manager, "alice", true).await;
        let bob = add(&manager, "bob", false).await;
        manager.reassign_worker(Some(alice), bob).await.unwrap();
        (root, alice, bob)
    };

    let manager = open(&temp);
    assert_eq!(manager.load_root().await.unwrap().id, root);

    let bob_node = manager.get_user(bob).await.unwrap();
    assert_eq!(bob_node.boss, Some(alice));
    assert_eq!(manager.get_user(alice).await.unwrap().count_of_workers, 1);
    assert_eq!(manager.boss_of(bob).await.unwrap().map(|n| n.id), Some(alice));
    assert!(manager.is_ancestor_of(alice, bob).await.unwrap());

    let nodes = manager.snapshot().await.unwrap();
    assert_eq!(nodes.len(), 3);
    assert!(verify_nodes(&nodes).ok);
}

#[tokio::test]
async fn rejected_move_leaves_files_untouched() {
    let temp = TempDir::new().unwrap();
    let manager = open(&temp);
    manager
        .initialize_root(Username::new("root").unwrap(), Password::new("pw"))
        .await
        .unwrap();
    let alice = add(&manager, "alice", true).await;
    let bob = add(&manager, "bob", false).await;
    manager.reassign_worker(Some(alice), bob).await.unwrap();

    let paths = manager.store().paths().clone();
    let before_alice = fs::read_to_string(paths.node_path(&alice)).unwrap();
    let before_bob = fs::read_to_string(paths.node_path(&bob)).unwrap();

    let err = manager.reassign_worker(Some(bob), alice).await.unwrap_err();
    assert!(matches!(err, HierarchyError::CyclicAssignment { .. }));

    assert_eq!(fs::read_to_string(paths.node_path(&alice)).unwrap(), before_alice);
    assert_eq!(fs::read_to_string(paths.node_path(&bob)).unwrap(), before_bob);
}

#[tokio::test]
async fn documents_carry_kind_and_version() {
    let temp = TempDir::new().unwrap();
    let manager = open(&temp);
    let root = manager
        .initialize_root(Username::new("root").unwrap(), Password::new("pw"))
        .await
        .unwrap();

    let raw = fs::read_to_string(manager.store().paths().node_path(&root.id)).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(doc["kind"], "orgtree.node");
    assert_eq!(doc["schema_version"], 1);
    assert_eq!(doc["username"], "root");
}

#[tokio::test]
async fn second_open_is_refused_while_first_is_alive() {
    let temp = TempDir::new().unwrap();
    let first = open(&temp);
    first
        .initialize_root(Username::new("root").unwrap(), Password::new("pw"))
        .await
        .unwrap();

    let second = FileNodeStore::open(OrgPaths::new(temp.path().join("data")));
    assert!(matches!(second, Err(StoreError::Locked)));

    drop(first);
    assert!(FileNodeStore::open(OrgPaths::new(temp.path().join("data"))).is_ok());
}

#[tokio::test]
async fn leftover_temp_files_are_ignored() {
    let temp = TempDir::new().unwrap();
    let manager = open(&temp);
    manager
        .initialize_root(Username::new("root").unwrap(), Password::new("pw"))
        .await
        .unwrap();
    add(&manager, "alice", true).await;

    let paths = manager.store().paths().clone();
    fs::write(paths.node_temp_path(&NodeId::new()), "{ half written").unwrap();
    fs::write(paths.nodes_dir().join("notes.txt"), "not a node").unwrap();

    assert_eq!(manager.snapshot().await.unwrap().len(), 2);
}

#[tokio::test]
async fn drifted_count_on_disk_is_repaired() {
    let temp = TempDir::new().unwrap();
    let manager = open(&temp);
    manager
        .initialize_root(Username::new("root").unwrap(), Password::new("pw"))
        .await
        .unwrap();
    let alice = add(&manager, "alice", true).await;
    let bob = add(&manager, "bob", false).await;
    manager.reassign_worker(Some(alice), bob).await.unwrap();

    // Simulate a write lost between the two saves of a move.
    let mut drifted = manager.get_user(alice).await.unwrap();
    drifted.count_of_workers = 4;
    manager.store().save(&drifted).await.unwrap();

    let doctor = Doctor::new();
    let report = doctor.check(&manager).await.unwrap();
    assert!(!report.is_healthy());
    assert!(!report.has_blocking_issues());

    let outcome = doctor.repair_counts(&manager).await.unwrap();
    assert_eq!(outcome.applied.len(), 1);
    assert_eq!(outcome.applied[0].from, 4);
    assert_eq!(outcome.applied[0].to, 1);

    drop(manager);
    let reopened = open(&temp);
    assert_eq!(reopened.get_user(alice).await.unwrap().count_of_workers, 1);
    assert!(doctor.check(&reopened).await.unwrap().is_healthy());
}

#[tokio::test]
async fn usernames_stay_unique_across_reopen() {
    let temp = TempDir::new().unwrap();
    {
        let manager = open(&temp);
        manager
            .initialize_root(Username::new("root").unwrap(), Password::new("pw"))
            .await
            .unwrap();
        add(&manager, "alice", true).await;
    }

    let manager = open(&temp);
    manager.load_root().await.unwrap();
    let err = manager
        .create_user(NewUser {
            username: Username::new("alice").unwrap(),
            password: Password::new("pw"),
            is_admin: false,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HierarchyError::Persistence {
            source: StoreError::AlreadyExists(_),
            ..
        }
    ));
}
