//! KeyValueStore Tests
//!
//! Tests verify:
//! - Get/put/delete semantics
//! - NotFound for absent and deleted keys
//! - Idempotent overwrite and delete
//! - Concurrent access patterns

use std::sync::Arc;
use std::thread;

use kvlog::{KeyValueStore, KvError};

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_new_store_is_empty() {
    let store = KeyValueStore::new();
    assert_eq!(store.len(), 0);
    assert!(store.is_empty());
}

#[test]
fn test_get_unwritten_key_is_not_found() {
    let store = KeyValueStore::new();
    assert!(matches!(store.get("missing"), Err(KvError::NotFound)));
}

#[test]
fn test_put_and_get() {
    let store = KeyValueStore::new();

    store.put("key1", "value1");

    assert_eq!(store.get("key1").unwrap(), "value1");
    assert!(store.contains_key("key1"));
}

#[test]
fn test_put_overwrites_existing() {
    let store = KeyValueStore::new();

    store.put("key1", "value1");
    store.put("key1", "value2");

    assert_eq!(store.len(), 1);
    assert_eq!(store.get("key1").unwrap(), "value2");
}

#[test]
fn test_put_same_value_is_idempotent() {
    let store = KeyValueStore::new();

    store.put("k", "v");
    store.put("k", "v");

    assert_eq!(store.snapshot(), vec![("k".to_string(), "v".to_string())]);
}

#[test]
fn test_empty_key_and_value() {
    let store = KeyValueStore::new();

    store.put("", "");

    assert_eq!(store.get("").unwrap(), "");
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_delete_existing_key() {
    let store = KeyValueStore::new();

    store.put("key1", "value1");
    store.delete("key1");

    assert!(matches!(store.get("key1"), Err(KvError::NotFound)));
    assert!(store.is_empty());
}

#[test]
fn test_delete_absent_key_is_noop() {
    let store = KeyValueStore::new();
    store.put("other", "x");

    store.delete("never-written");
    store.delete("never-written");

    assert!(matches!(store.get("never-written"), Err(KvError::NotFound)));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_put_after_delete() {
    let store = KeyValueStore::new();

    store.put("k", "1");
    store.delete("k");
    store.put("k", "2");

    assert_eq!(store.get("k").unwrap(), "2");
}

#[test]
fn test_snapshot_is_sorted() {
    let store = KeyValueStore::new();

    store.put("c", "3");
    store.put("a", "1");
    store.put("b", "2");

    let keys: Vec<String> = store.snapshot().into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["a", "b", "c"]);
}

#[test]
fn test_large_value() {
    let store = KeyValueStore::new();

    let large_value = "x".repeat(1024 * 1024);
    store.put("big_key", large_value.clone());

    assert_eq!(store.get("big_key").unwrap(), large_value);
}

// =============================================================================
// Concurrent Access Tests
// =============================================================================

#[test]
fn test_concurrent_reads() {
    let store = Arc::new(KeyValueStore::new());
    store.put("key", "value");

    let mut handles = vec![];

    for _ in 0..10 {
        let s = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for _ in 0..100 {
                assert_eq!(s.get("key").unwrap(), "value");
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_concurrent_writes_no_lost_updates() {
    let store = Arc::new(KeyValueStore::new());

    let mut handles = vec![];

    for i in 0..10 {
        let s = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for j in 0..10 {
                s.put(format!("key{}_{}", i, j), format!("value{}_{}", i, j));
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.len(), 100);
    assert_eq!(store.get("key7_3").unwrap(), "value7_3");
}

#[test]
fn test_readers_only_see_complete_values() {
    let store = Arc::new(KeyValueStore::new());
    store.put("k", "a".repeat(64));

    let writer = {
        let s = Arc::clone(&store);
        thread::spawn(move || {
            for i in 0..500 {
                let c = if i % 2 == 0 { "b" } else { "a" };
                s.put("k", c.repeat(64));
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let s = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..500 {
                    let v = s.get("k").unwrap();
                    assert_eq!(v.len(), 64);
                    assert!(v == "a".repeat(64) || v == "b".repeat(64));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}
