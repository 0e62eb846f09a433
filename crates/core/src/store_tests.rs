// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the durable queue store.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use super::*;
use crate::kv::{FileStore, MemoryStore};
use crate::op::Method;
use tempfile::tempdir;

fn make_op(target: &str) -> NewOperation {
    NewOperation::new(Method::Post, target)
}

/// Store whose writes always fail, for surfacing persistence errors.
struct FailingStore;

impl KeyValueStore for FailingStore {
    fn read(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    fn write(&mut self, _key: &str, _value: &[u8]) -> Result<()> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into())
    }

    fn delete(&mut self, _key: &str) -> Result<()> {
        Ok(())
    }
}

#[test]
fn test_enqueue_preserves_fifo_order() {
    let mut store = QueueStore::open(MemoryStore::new()).unwrap();

    store.enqueue(make_op("/a")).unwrap();
    store.enqueue(make_op("/b")).unwrap();
    store.enqueue(make_op("/c")).unwrap();

    let ops = store.list_all();
    let targets: Vec<&str> = ops.iter().map(|op| op.target.as_str()).collect();
    assert_eq!(targets, vec!["/a", "/b", "/c"]);
}

#[test]
fn test_enqueue_assigns_unique_ids_and_zero_retries() {
    let mut store = QueueStore::open(MemoryStore::new()).unwrap();

    let a = store.enqueue(make_op("/a")).unwrap();
    let b = store.enqueue(make_op("/b")).unwrap();

    assert_ne!(a.id, b.id);
    assert_eq!(a.retry_count, 0);
    assert_eq!(b.retry_count, 0);
}

#[test]
fn test_enqueue_persists_before_returning() {
    let dir = tempdir().unwrap();

    {
        let kv = FileStore::open(dir.path()).unwrap();
        let mut store = QueueStore::open(kv).unwrap();
        store.enqueue(make_op("/a")).unwrap();
        store.enqueue(make_op("/b")).unwrap();
    }

    let kv = FileStore::open(dir.path()).unwrap();
    let store = QueueStore::open(kv).unwrap();
    let ops = store.list_all();
    assert_eq!(ops.len(), 2);
    assert_eq!(ops[0].target, "/a");
    assert_eq!(ops[1].target, "/b");
}

#[test]
fn test_enqueue_surfaces_persistence_failure() {
    let mut store = QueueStore::open(FailingStore).unwrap();

    let err = store.enqueue(make_op("/a")).unwrap_err();
    assert!(err.to_string().contains("disk full"));
    // A failed enqueue leaves no trace in the queue.
    assert!(store.is_empty());
}

#[test]
fn test_remove_is_idempotent() {
    let mut store = QueueStore::open(MemoryStore::new()).unwrap();
    let op = store.enqueue(make_op("/a")).unwrap();

    store.remove(op.id).unwrap();
    assert!(store.is_empty());

    // Second removal of the same id is a no-op, not an error.
    store.remove(op.id).unwrap();
    assert!(store.is_empty());
}

#[test]
fn test_increment_retry_retains_until_budget() {
    let mut store = QueueStore::open(MemoryStore::new()).unwrap();
    let op = store.enqueue(make_op("/a")).unwrap();

    match store.increment_retry(op.id).unwrap() {
        RetryOutcome::Retained(entry) => assert_eq!(entry.retry_count, 1),
        other => panic!("expected Retained, got {:?}", other),
    }
    match store.increment_retry(op.id).unwrap() {
        RetryOutcome::Retained(entry) => assert_eq!(entry.retry_count, 2),
        other => panic!("expected Retained, got {:?}", other),
    }
}

#[test]
fn test_third_failure_drops_with_default_budget() {
    let mut store = QueueStore::open(MemoryStore::new()).unwrap();
    let op = store.enqueue(make_op("/a")).unwrap();

    store.increment_retry(op.id).unwrap();
    store.increment_retry(op.id).unwrap();

    match store.increment_retry(op.id).unwrap() {
        RetryOutcome::Dropped(entry) => {
            assert_eq!(entry.id, op.id);
            assert_eq!(entry.retry_count, 3);
        }
        other => panic!("expected Dropped, got {:?}", other),
    }
    assert!(store.is_empty());
}

#[test]
fn test_listed_retry_counts_stay_below_budget() {
    let mut store = QueueStore::with_max_retry(MemoryStore::new(), 3).unwrap();
    let op = store.enqueue(make_op("/a")).unwrap();

    loop {
        for entry in store.list_all() {
            assert!(entry.retry_count < 3);
        }
        match store.increment_retry(op.id).unwrap() {
            RetryOutcome::Dropped(_) => break,
            RetryOutcome::Retained(_) => {}
            RetryOutcome::Missing => panic!("entry vanished"),
        }
    }
}

#[test]
fn test_increment_retry_unknown_id_is_missing() {
    let mut store = QueueStore::open(MemoryStore::new()).unwrap();
    assert_eq!(
        store.increment_retry(OpId(99)).unwrap(),
        RetryOutcome::Missing
    );
}

#[test]
fn test_retry_does_not_reorder() {
    let mut store = QueueStore::open(MemoryStore::new()).unwrap();
    let a = store.enqueue(make_op("/a")).unwrap();
    store.enqueue(make_op("/b")).unwrap();

    store.increment_retry(a.id).unwrap();

    let ops = store.list_all();
    assert_eq!(ops[0].target, "/a");
    assert_eq!(ops[0].retry_count, 1);
    assert_eq!(ops[1].target, "/b");
}

#[test]
fn test_clear_removes_everything() {
    let dir = tempdir().unwrap();

    {
        let kv = FileStore::open(dir.path()).unwrap();
        let mut store = QueueStore::open(kv).unwrap();
        store.enqueue(make_op("/a")).unwrap();
        store.enqueue(make_op("/b")).unwrap();
        store.clear().unwrap();
        assert!(store.is_empty());
    }

    // Clear is persisted as well.
    let kv = FileStore::open(dir.path()).unwrap();
    let store = QueueStore::open(kv).unwrap();
    assert!(store.is_empty());
}

#[test]
fn test_load_salvages_corrupt_records() {
    let mut kv = MemoryStore::new();
    let snapshot = r#"[
        {"id": 1, "method": "POST", "target": "/a", "enqueuedAt": "2026-01-15T10:00:00Z", "retryCount": 0},
        {"this": "is not an operation"},
        {"id": 2, "method": "PUT", "target": "/b", "enqueuedAt": "2026-01-15T10:01:00Z", "retryCount": 1}
    ]"#;
    kv.write("pending_operations", snapshot.as_bytes()).unwrap();

    let store = QueueStore::open(kv).unwrap();
    let ops = store.list_all();
    assert_eq!(ops.len(), 2);
    assert_eq!(ops[0].target, "/a");
    assert_eq!(ops[1].target, "/b");
}

#[test]
fn test_load_unreadable_snapshot_starts_empty() {
    let mut kv = MemoryStore::new();
    kv.write("pending_operations", b"not json at all").unwrap();

    let store = QueueStore::open(kv).unwrap();
    assert!(store.is_empty());
}

#[test]
fn test_load_discards_duplicate_ids() {
    let mut kv = MemoryStore::new();
    let snapshot = r#"[
        {"id": 1, "method": "POST", "target": "/first", "enqueuedAt": "2026-01-15T10:00:00Z", "retryCount": 0},
        {"id": 1, "method": "POST", "target": "/dupe", "enqueuedAt": "2026-01-15T10:00:00Z", "retryCount": 0}
    ]"#;
    kv.write("pending_operations", snapshot.as_bytes()).unwrap();

    let store = QueueStore::open(kv).unwrap();
    let ops = store.list_all();
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].target, "/first");
}

#[test]
fn test_ids_do_not_collide_after_reload() {
    let dir = tempdir().unwrap();

    let existing_id = {
        let kv = FileStore::open(dir.path()).unwrap();
        let mut store = QueueStore::open(kv).unwrap();
        store.enqueue(make_op("/a")).unwrap().id
    };

    let kv = FileStore::open(dir.path()).unwrap();
    let mut store = QueueStore::open(kv).unwrap();
    let new_id = store.enqueue(make_op("/b")).unwrap().id;
    assert!(new_id > existing_id);
}

#[test]
fn test_custom_retry_budget() {
    let mut store = QueueStore::with_max_retry(MemoryStore::new(), 1).unwrap();
    let op = store.enqueue(make_op("/a")).unwrap();

    // With a budget of 1, the first failure already drops the entry.
    match store.increment_retry(op.id).unwrap() {
        RetryOutcome::Dropped(entry) => assert_eq!(entry.retry_count, 1),
        other => panic!("expected Dropped, got {:?}", other),
    }
}

#[test]
fn test_stats_reflect_queue() {
    let mut store = QueueStore::open(MemoryStore::new()).unwrap();
    let a = store.enqueue(make_op("/a")).unwrap();
    store.enqueue(make_op("/b")).unwrap();
    store
        .enqueue(NewOperation::new(Method::Delete, "/c"))
        .unwrap();
    store.increment_retry(a.id).unwrap();

    let stats = store.stats();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.pending, 2);
    assert_eq!(stats.retrying, 1);
    assert_eq!(stats.by_method.get(&Method::Post), Some(&2));
    assert_eq!(stats.by_method.get(&Method::Delete), Some(&1));
}
