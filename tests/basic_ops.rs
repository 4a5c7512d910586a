use quench::{CacheBuilder, QueryCache, QueryResult, Retention};
use std::time::Duration;

// Helper to create a cache with the stock configuration.
fn new_test_cache() -> QueryCache<i32, String> {
  CacheBuilder::<i32, String>::new().build().unwrap()
}

#[test]
fn test_set_and_get() {
  let cache = new_test_cache();
  cache.set("user:1", 10, Duration::from_secs(60));

  let entry = cache.get("user:1").unwrap();
  assert_eq!(entry.value().map(|v| **v), Some(10));
  assert!(entry.error().is_none());
  assert!(!entry.is_pending());
  assert!(!entry.is_stale());
  assert!(entry.last_updated().is_some());

  assert!(cache.contains("user:1"));
  assert!(!cache.contains("user:2"));
  assert!(cache.get("user:2").is_none());

  let metrics = cache.metrics();
  assert_eq!(metrics.hits, 1);
  assert_eq!(metrics.misses, 1);
  assert_eq!(metrics.inserts, 1);
}

#[test]
fn test_read_priority() {
  let cache = new_test_cache();
  assert!(cache.read("missing").is_none());

  cache.set("a", 5, Retention::Forever);
  match cache.read("a") {
    Some(QueryResult::Resolved(value)) => assert_eq!(*value, 5),
    other => panic!("expected resolved, got {:?}", other),
  }

  // A tracked-but-empty entry has nothing to tag.
  let _sub = cache.subscribe("empty", |_| {});
  assert!(cache.contains("empty"));
  assert!(cache.read("empty").is_none());
}

#[test]
fn test_keys_snapshot_at_call_time() {
  let cache = new_test_cache();
  cache.set("a", 1, Retention::Forever);
  cache.set("b", 2, Retention::Forever);

  let keys = cache.keys();
  cache.set("c", 3, Retention::Forever);

  let mut collected: Vec<String> = keys.collect();
  collected.sort();
  assert_eq!(collected, vec!["a".to_string(), "b".to_string()]);
  assert_eq!(cache.len(), 3);
}

#[test]
fn test_remove_and_clear() {
  let cache = new_test_cache();
  cache.set("a", 1, Retention::Forever);
  cache.set("b", 2, Retention::Forever);

  assert!(cache.remove("a"));
  assert!(!cache.remove("a"), "double remove reports nothing to do");
  assert!(!cache.contains("a"));

  cache.clear();
  assert!(cache.is_empty());
  assert_eq!(cache.metrics().removals, 2);
}

#[test]
fn test_hydrated_flag_consumed_on_first_read() {
  let cache = new_test_cache();
  assert!(cache.hydrate("seeded", 7, Retention::Forever));

  let first = cache.get("seeded").unwrap();
  assert!(first.is_hydrated());
  assert_eq!(first.value().map(|v| **v), Some(7));

  let second = cache.get("seeded").unwrap();
  assert!(!second.is_hydrated(), "the flag is visible to exactly one read");
}

#[test]
fn test_hydrate_never_clobbers_live_value() {
  let cache = new_test_cache();
  cache.set("k", 1, Retention::Forever);
  assert!(!cache.hydrate("k", 2, Retention::Forever));
  assert_eq!(cache.get("k").unwrap().value().map(|v| **v), Some(1));
  assert_eq!(cache.metrics().hydrations, 0);
}
