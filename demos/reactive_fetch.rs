//! Subscribe to a key, record a fetch, and watch the notifications land.

use quench::{CacheBuilder, QueryCache};
use std::time::Duration;

#[tokio::main]
async fn main() {
  let cache: QueryCache<String, String> = CacheBuilder::new()
    .default_retention(Duration::from_secs(30))
    .build()
    .expect("cache configuration is valid");

  let _sub = cache.subscribe("greeting", |entry| {
    println!(
      "notified: value={:?} pending={} stale={}",
      entry.value().map(|v| v.as_str()),
      entry.is_pending(),
      entry.is_stale(),
    );
  });

  let fetch = cache.set_future(
    "greeting",
    async {
      tokio::time::sleep(Duration::from_millis(100)).await;
      Ok("hello from the network".to_owned())
    },
    Duration::from_secs(30),
  );

  let value = fetch.as_ref().await.expect("fetch succeeds");
  println!("awaited: {value}");

  cache.invalidate("greeting");
  println!("metrics: {:?}", cache.metrics());
}
