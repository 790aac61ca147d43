// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::BTreeMap;
use tb_core::test_support::epoch;
use tempfile::{tempdir, TempDir};

fn open(dir: &TempDir) -> Store {
    Store::open(&dir.path().join("wal").join("events.wal"), &dir.path().join("snapshot.json.zst")).unwrap()
}

#[test]
fn committed_writes_survive_reopen() {
    let dir = tempdir().unwrap();
    let store = open(&dir);
    let project = store.transact(|tx| tx.register_project("sales", BTreeMap::new(), epoch())).unwrap();
    drop(store);

    let store = open(&dir);
    assert_eq!(store.read(|s| s.project_by_name("sales").map(|p| p.id)), Some(project.id));
    assert_eq!(store.processed_seq(), 1);
}

#[test]
fn failed_closure_leaves_no_trace() {
    let dir = tempdir().unwrap();
    let store = open(&dir);
    let result: Result<(), StoreError> = store.transact(|tx| {
        tx.register_project("sales", BTreeMap::new(), epoch())?;
        Err(StoreError::invalid("test", "abort"))
    });
    assert!(result.is_err());
    assert!(store.read(|s| s.projects.is_empty()));
    assert_eq!(store.processed_seq(), 0);

    drop(store);
    assert!(open(&dir).read(|s| s.projects.is_empty()));
}

#[test]
fn events_apply_in_emit_order() {
    let dir = tempdir().unwrap();
    let store = open(&dir);
    let pid = store.transact(|tx| tx.register_project("sales", BTreeMap::new(), epoch())).unwrap().id;
    let (queued, _) = store.transact(|tx| tx.enqueue_deployment(pid, epoch())).unwrap();
    let claimed = store.transact(|tx| Ok::<_, StoreError>(tx.claim_deployments(2, epoch()))).unwrap();
    assert_eq!(claimed[0].id, queued.id);
    assert_eq!(store.processed_seq(), 3);
}

#[test]
fn checkpoint_then_reopen() {
    let dir = tempdir().unwrap();
    let store = open(&dir);
    for name in ["a", "b", "c"] {
        store.transact(|tx| tx.register_project(name, BTreeMap::new(), epoch())).unwrap();
    }
    let checkpoint = store.checkpoint(epoch()).unwrap();
    assert_eq!(checkpoint.seq, 3);
    assert!(checkpoint.size_bytes > 0);

    store.transact(|tx| tx.register_project("d", BTreeMap::new(), epoch())).unwrap();
    drop(store);

    let store = open(&dir);
    assert_eq!(store.read(|s| s.projects.len()), 4);
    assert_eq!(store.processed_seq(), 4);
}

#[test]
fn version_records() {
    let dir = tempdir().unwrap();
    let store = open(&dir);
    let first = store.record_version("0.1.0", epoch()).unwrap().unwrap();
    assert_eq!(first.previous_app_version, "");
    assert!(store.record_version("0.1.0", epoch()).unwrap().is_none());

    let later = epoch() + chrono::Duration::hours(1);
    store.record_version("0.2.0", later).unwrap();
    assert!(matches!(store.record_version("0.1.5", later), Err(StoreError::Migration(_))));
    assert!(store.rollback_version("0.1.0").is_err());

    let removed = store.rollback_version("0.2.0").unwrap();
    assert_eq!(removed.app_version, "0.2.0");
    drop(store);
    assert_eq!(open(&dir).read(|s| s.latest_migration().map(|r| r.app_version.clone())), Some("0.1.0".into()));
}

#[test]
fn concurrent_transactions_are_serialized() {
    let dir = tempdir().unwrap();
    let store = open(&dir);
    let pid = store.transact(|tx| tx.register_project("sales", BTreeMap::new(), epoch())).unwrap().id;
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            std::thread::spawn(move || store.transact(|tx| tx.enqueue_deployment(pid, epoch())).unwrap())
        })
        .collect();
    let created = handles.into_iter().map(|h| h.join().unwrap()).filter(|(_, created)| *created).count();
    assert_eq!(created, 1);
    assert_eq!(store.read(|s| s.deployments.len()), 1);
}
