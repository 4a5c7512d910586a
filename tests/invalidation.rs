use quench::{CacheBuilder, QueryCache, Retention};
use std::time::Duration;

fn new_test_cache() -> QueryCache<i32, String> {
  CacheBuilder::<i32, String>::new()
    .default_retention(Duration::from_secs(60))
    .build()
    .unwrap()
}

#[test]
fn test_invalidate_marks_stale_and_keeps_value() {
  let cache = new_test_cache();
  cache.set("k", 4, Retention::Forever);

  cache.invalidate("k");
  let entry = cache.get("k").unwrap();
  assert!(entry.is_stale());
  assert_eq!(entry.value().map(|v| **v), Some(4));

  // Idempotent on an already-stale entry.
  cache.invalidate("k");
  let entry = cache.get("k").unwrap();
  assert!(entry.is_stale());
  assert_eq!(entry.value().map(|v| **v), Some(4));

  // No-op on an unknown key.
  cache.invalidate("missing");
  assert!(!cache.contains("missing"));

  assert_eq!(cache.metrics().invalidations, 2);
}

#[test]
fn test_set_clears_staleness() {
  let cache = new_test_cache();
  cache.set("k", 1, Retention::Forever);
  cache.invalidate("k");
  cache.set("k", 2, Retention::Forever);
  assert!(!cache.get("k").unwrap().is_stale());
}

#[test]
fn test_invalidate_all_touches_every_entry() {
  let cache = new_test_cache();
  cache.set("a", 1, Retention::Forever);
  cache.set("b", 2, Retention::Forever);

  cache.invalidate_all();
  assert!(cache.get("a").unwrap().is_stale());
  assert!(cache.get("b").unwrap().is_stale());
  assert_eq!(cache.metrics().invalidations, 2);
}
