#![cfg(feature = "serde")]

use quench::hydration::{HydrationEntry, HydrationSnapshot};
use quench::{CacheBuilder, QueryCache, Retention};
use std::time::Duration;

fn new_test_cache() -> QueryCache<String, String> {
  CacheBuilder::<String, String>::new().build().unwrap()
}

#[test]
fn test_snapshot_round_trips_through_bincode() {
  let snapshot = HydrationSnapshot {
    entries: vec![
      HydrationEntry {
        key: "user:1".to_owned(),
        value: "ada".to_owned(),
        age: Some(Duration::from_secs(3)),
      },
      HydrationEntry {
        key: "user:2".to_owned(),
        value: "grace".to_owned(),
        age: None,
      },
    ],
  };

  let bytes = bincode::serialize(&snapshot).unwrap();
  let restored: HydrationSnapshot<String> = bincode::deserialize(&bytes).unwrap();

  let cache = new_test_cache();
  assert_eq!(cache.hydrate_snapshot(restored, Retention::Forever), 2);

  let entry = cache.get("user:1").unwrap();
  assert!(entry.is_hydrated());
  assert_eq!(entry.value().map(|v| (**v).clone()), Some("ada".to_owned()));
  assert_eq!(cache.metrics().hydrations, 2);
}

#[test]
fn test_dehydrate_captures_resolved_entries_only() {
  let cache = new_test_cache();
  cache.set("a", "1".to_owned(), Retention::Forever);
  let _sub = cache.subscribe("empty", |_| {});

  let snapshot = cache.dehydrate();
  assert_eq!(snapshot.entries.len(), 1);
  assert_eq!(snapshot.entries[0].key, "a");
  assert!(snapshot.entries[0].age.is_some());
}

#[test]
fn test_hydration_collisions_are_skipped() {
  let cache = new_test_cache();
  cache.set("a", "live".to_owned(), Retention::Forever);

  let snapshot = HydrationSnapshot {
    entries: vec![HydrationEntry {
      key: "a".to_owned(),
      value: "snapshotted".to_owned(),
      age: None,
    }],
  };
  assert_eq!(cache.hydrate_snapshot(snapshot, Retention::Forever), 0);
  assert_eq!(
    cache.get("a").unwrap().value().map(|v| (**v).clone()),
    Some("live".to_owned())
  );
}

#[test]
fn test_hydration_age_backdates_last_updated() {
  let cache = new_test_cache();
  cache.hydrate("fresh", "new".to_owned(), Retention::Forever);

  let snapshot = HydrationSnapshot {
    entries: vec![HydrationEntry {
      key: "aged".to_owned(),
      value: "old".to_owned(),
      age: Some(Duration::from_secs(30)),
    }],
  };
  cache.hydrate_snapshot(snapshot, Retention::Forever);

  let aged = cache.get("aged").unwrap().last_updated().unwrap();
  let fresh = cache.get("fresh").unwrap().last_updated().unwrap();
  assert!(aged < fresh, "age pushes the resolution timestamp into the past");
}
