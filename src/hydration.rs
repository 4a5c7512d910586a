// This entire module is only compiled when the 'serde' feature is enabled.
#![cfg(feature = "serde")]

//! Bridging a cache to a serialized snapshot of pre-resolved entries,
//! e.g. one captured during server-side rendering.
//!
//! Hydrated entries are ordinary resolved entries carrying a transient
//! `hydrated` flag, visible to exactly the first read, so a consumer can
//! tell server-seeded data from data it fetched itself.

use crate::entry::Retention;
use crate::handles::QueryCache;
use crate::time;

use std::hash::BuildHasher;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A single pre-resolved entry captured for transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HydrationEntry<V> {
  pub key: String,
  pub value: V,
  /// How old the value already was when the snapshot was taken. Applied
  /// on hydration so the entry's `last_updated` reflects the original
  /// resolution, not the transfer.
  pub age: Option<Duration>,
}

/// A serializable batch of pre-resolved entries.
///
/// Any serde-compatible format works for the transfer; the integration
/// tests use bincode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HydrationSnapshot<V> {
  pub entries: Vec<HydrationEntry<V>>,
}

impl<V, E, H> QueryCache<V, E, H>
where
  V: Send + Sync + 'static,
  E: Send + Sync + 'static,
  H: BuildHasher + Send + 'static,
{
  /// Seeds every entry of `snapshot` that does not collide with live
  /// data, at the given retention. Returns how many entries applied.
  pub fn hydrate_snapshot(&self, snapshot: HydrationSnapshot<V>, retention: impl Into<Retention>) -> usize {
    let retention = retention.into();
    let mut applied = 0;
    for entry in snapshot.entries {
      if self.hydrate_aged(entry.key, entry.value, entry.age, retention) {
        applied += 1;
      }
    }
    applied
  }

  /// Captures every resolved entry for transfer to another cache.
  /// Pending fetches, failures, and empty subscribed entries are not
  /// captured.
  pub fn dehydrate(&self) -> HydrationSnapshot<V>
  where
    V: Clone,
  {
    let now = time::now_duration();
    let map = self.shared.store.map.lock();
    let entries = map
      .iter()
      .filter_map(|(key, record)| {
        let value = record.snapshot.value()?;
        Some(HydrationEntry {
          key: key.clone(),
          value: (**value).clone(),
          age: record
            .snapshot
            .last_updated_raw()
            .map(|at| now.saturating_sub(at)),
        })
      })
      .collect();
    HydrationSnapshot { entries }
  }
}
