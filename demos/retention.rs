//! Entries outlive their last subscriber by a retention window.

use quench::{CacheBuilder, QueryCache, Retention};
use std::thread;
use std::time::Duration;

fn main() {
  let cache: QueryCache<u64, String> = CacheBuilder::new()
    .janitor_tick_interval(Duration::from_millis(20))
    .build()
    .expect("cache configuration is valid");

  cache.set("session", 42, Duration::from_millis(150));
  println!("tracked after set: {}", cache.contains("session"));

  let sub = cache.subscribe("session", |_| {});
  println!(
    "eviction scheduled while subscribed: {}",
    cache.eviction_scheduled("session")
  );

  sub.unsubscribe();
  println!(
    "eviction scheduled after detach: {}",
    cache.eviction_scheduled("session")
  );

  thread::sleep(Duration::from_millis(400));
  println!("tracked after the window: {}", cache.contains("session"));

  cache.set("pinned", 7, Retention::Forever);
  println!("pinned survives indefinitely: {}", cache.contains("pinned"));
}
