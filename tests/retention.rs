use quench::{CacheBuilder, EvictionListener, EvictionReason, QueryCache, QueryEntry, Retention};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

// Short janitor ticks so elapsed windows are observed quickly.
fn new_test_cache(tick: Duration, default_retention: Duration) -> QueryCache<i32, String> {
  CacheBuilder::<i32, String>::new()
    .janitor_tick_interval(tick)
    .default_retention(default_retention)
    .build()
    .unwrap()
}

#[test]
fn test_retention_widens_never_narrows() {
  let cache = new_test_cache(Duration::from_millis(10), Duration::from_millis(50));
  cache.set("k", 1, Duration::from_millis(120));
  cache.set("k", 2, Duration::from_millis(5_000));
  cache.set("k", 3, Duration::from_millis(30));

  thread::sleep(Duration::from_millis(400));
  assert!(cache.contains("k"), "the widest requested window governs");
}

#[test]
fn test_zero_window_evicts_immediately() {
  let cache = new_test_cache(Duration::from_millis(50), Duration::from_millis(50));
  cache.set("gone", 1, Duration::ZERO);

  // No timer involved: the very next check already misses.
  assert!(!cache.contains("gone"));
  assert_eq!(cache.metrics().evictions, 1);
}

#[test]
fn test_subscriber_disarms_and_rearms() {
  let cache = new_test_cache(Duration::from_millis(10), Duration::from_millis(80));

  let sub1 = cache.subscribe("c", |_| {});
  let sub2 = cache.subscribe("c", |_| {});
  cache.set("c", 9, Duration::from_millis(80));
  assert!(!cache.eviction_scheduled("c"));

  sub1.unsubscribe();
  assert!(!cache.eviction_scheduled("c"), "one subscriber remains");

  sub2.unsubscribe();
  assert!(cache.eviction_scheduled("c"), "last detach arms the timer");

  let sub3 = cache.subscribe("c", |_| {});
  assert!(!cache.eviction_scheduled("c"), "re-attach cancels the timer");

  thread::sleep(Duration::from_millis(300));
  assert!(cache.contains("c"), "a subscribed entry outlives its window");

  drop(sub3);
  thread::sleep(Duration::from_millis(300));
  assert!(!cache.contains("c"));
}

#[test]
fn test_forever_retention_never_arms() {
  let cache = new_test_cache(Duration::from_millis(10), Duration::from_millis(50));
  cache.set("pinned", 1, Retention::Forever);

  assert!(!cache.eviction_scheduled("pinned"));
  thread::sleep(Duration::from_millis(200));
  assert!(cache.contains("pinned"));
}

#[test]
fn test_unused_entry_evicted_after_window() {
  let cache = new_test_cache(Duration::from_millis(10), Duration::from_millis(50));
  cache.set("tmp", 1, Duration::from_millis(40));
  assert!(cache.eviction_scheduled("tmp"));

  thread::sleep(Duration::from_millis(250));
  assert!(!cache.contains("tmp"));
  assert_eq!(cache.metrics().evictions, 1);
}

#[test]
fn test_pending_fetch_does_not_block_eviction() {
  // Eviction is governed by subscriber count alone, so an entry whose
  // fetch never settles still leaves once its window elapses.
  let runtime = tokio::runtime::Runtime::new().unwrap();
  let _guard = runtime.enter();

  let cache = new_test_cache(Duration::from_millis(10), Duration::from_millis(50));
  let _fetch = cache.set_future("hung", std::future::pending(), Duration::from_millis(40));
  assert!(cache.eviction_scheduled("hung"));

  thread::sleep(Duration::from_millis(250));
  assert!(!cache.contains("hung"));
}

struct Recorder(Arc<Mutex<Vec<(String, EvictionReason)>>>);

impl EvictionListener<i32, String> for Recorder {
  fn on_evict(&self, key: &str, _entry: &QueryEntry<i32, String>, reason: EvictionReason) {
    self.0.lock().unwrap().push((key.to_owned(), reason));
  }
}

#[test]
fn test_eviction_listener_delivery() {
  let log = Arc::new(Mutex::new(Vec::new()));
  let cache: QueryCache<i32, String> = CacheBuilder::new()
    .janitor_tick_interval(Duration::from_millis(10))
    .eviction_listener(Recorder(log.clone()))
    .build()
    .unwrap();

  cache.set("a", 1, Duration::from_millis(30));
  thread::sleep(Duration::from_millis(250));

  cache.set("b", 2, Retention::Forever);
  cache.remove("b");

  cache.set("c", 3, Retention::Forever);
  cache.clear();

  let log = log.lock().unwrap();
  assert!(log.contains(&("a".to_owned(), EvictionReason::RetentionElapsed)));
  assert!(log.contains(&("b".to_owned(), EvictionReason::Removed)));
  assert!(log.contains(&("c".to_owned(), EvictionReason::Cleared)));
}
