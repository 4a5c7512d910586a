use quench::error::BuildError;
use quench::{CacheBuilder, QueryCache, Retention};
use std::time::Duration;

#[test]
fn test_zero_tick_interval_is_rejected() {
  let result = CacheBuilder::<i32, String>::new()
    .janitor_tick_interval(Duration::ZERO)
    .build();
  assert_eq!(result.err(), Some(BuildError::ZeroTickInterval));
}

#[test]
fn test_retention_default_is_five_minutes() {
  assert_eq!(Retention::default(), Retention::Finite(Duration::from_secs(300)));
}

#[test]
fn test_default_retention_governs_subscribe_created_entries() {
  let cache: QueryCache<i32, String> = CacheBuilder::new()
    .default_retention(Duration::from_millis(40))
    .janitor_tick_interval(Duration::from_millis(10))
    .build()
    .unwrap();

  let sub = cache.subscribe("k", |_| {});
  assert!(cache.contains("k"), "subscribe creates the entry lazily");

  sub.unsubscribe();
  std::thread::sleep(Duration::from_millis(250));
  assert!(!cache.contains("k"));
}

#[test]
#[should_panic(expected = "task spawner")]
fn test_set_future_without_spawner_panics() {
  // No explicit spawner and no ambient runtime: recording a fetch is a
  // programmer error and fails fast.
  let cache: QueryCache<i32, String> = CacheBuilder::new().build().unwrap();
  let _ = cache.set_future("k", async { Ok(1) }, Retention::Forever);
}
