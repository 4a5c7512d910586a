use quench::{CacheBuilder, QueryCache, QueryEntry, Retention};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn new_test_cache() -> QueryCache<i32, String> {
  CacheBuilder::<i32, String>::new()
    .default_retention(Duration::from_secs(60))
    .build()
    .unwrap()
}

#[test]
fn test_fan_out_is_synchronous_and_fresh() {
  let cache = new_test_cache();
  let seen = Arc::new(Mutex::new(Vec::new()));

  let sink = seen.clone();
  let _sub = cache.subscribe("k", move |entry: &QueryEntry<i32, String>| {
    sink
      .lock()
      .unwrap()
      .push((entry.value().map(|v| **v), entry.is_stale()));
  });

  cache.set("k", 1, Retention::Forever);
  cache.invalidate("k");
  cache.set("k", 2, Retention::Forever);

  // Each notification carried the already-published snapshot.
  let seen = seen.lock().unwrap();
  assert_eq!(*seen, vec![(Some(1), false), (Some(1), true), (Some(2), false)]);
}

#[test]
fn test_each_registration_is_its_own_subscriber() {
  let cache = new_test_cache();
  let count1 = Arc::new(AtomicUsize::new(0));
  let count2 = Arc::new(AtomicUsize::new(0));

  let c1 = count1.clone();
  let _sub1 = cache.subscribe("k", move |_| {
    c1.fetch_add(1, Ordering::SeqCst);
  });
  let c2 = count2.clone();
  let sub2 = cache.subscribe("k", move |_| {
    c2.fetch_add(1, Ordering::SeqCst);
  });

  cache.set("k", 1, Retention::Forever);
  assert_eq!(count1.load(Ordering::SeqCst), 1);
  assert_eq!(count2.load(Ordering::SeqCst), 1);

  sub2.unsubscribe();
  cache.set("k", 2, Retention::Forever);
  assert_eq!(count1.load(Ordering::SeqCst), 2);
  assert_eq!(count2.load(Ordering::SeqCst), 1, "detached listener stays quiet");
}

#[test]
fn test_drop_guard_unsubscribes() {
  let cache = new_test_cache();
  {
    let _sub = cache.subscribe("k", |_| {});
    assert!(!cache.eviction_scheduled("k"));
  }
  assert!(cache.eviction_scheduled("k"), "guard drop detaches the listener");
}

#[test]
fn test_subscribe_creates_entry_lazily() {
  let cache = new_test_cache();
  assert!(!cache.contains("k"));

  let _sub = cache.subscribe("k", |_| {});
  assert!(cache.contains("k"));
  let entry = cache.get("k").unwrap();
  assert!(entry.value().is_none());
  assert!(entry.error().is_none());
  assert!(!entry.is_pending());
}

#[test]
fn test_subscribe_does_not_notify_by_itself() {
  let cache = new_test_cache();
  cache.set("k", 1, Retention::Forever);

  let count = Arc::new(AtomicUsize::new(0));
  let c = count.clone();
  let _sub = cache.subscribe("k", move |_| {
    c.fetch_add(1, Ordering::SeqCst);
  });
  assert_eq!(count.load(Ordering::SeqCst), 0, "registration alone is not a mutation");
}

#[test]
fn test_listener_may_reenter_the_cache() {
  let cache = new_test_cache();
  let reader = cache.clone();
  let observed = Arc::new(AtomicUsize::new(0));

  let sink = observed.clone();
  let _sub = cache.subscribe("k", move |entry: &QueryEntry<i32, String>| {
    if entry.value().is_some() {
      // Re-entrant read: the lock is not held during fan-out.
      if reader.get("k").is_some() {
        sink.fetch_add(1, Ordering::SeqCst);
      }
    }
  });

  cache.set("k", 1, Retention::Forever);
  assert_eq!(observed.load(Ordering::SeqCst), 1);
}
