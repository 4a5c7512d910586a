use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_utils::CachePadded;

/// A thread-safe, internal metrics collector for the cache.
/// All fields are atomic to allow for lock-free updates.
#[derive(Debug)]
pub struct Metrics {
  // --- Reads ---
  pub(crate) hits: CachePadded<AtomicU64>,
  pub(crate) misses: CachePadded<AtomicU64>,

  // --- Mutations ---
  pub(crate) inserts: CachePadded<AtomicU64>,
  pub(crate) invalidations: CachePadded<AtomicU64>,
  pub(crate) removals: CachePadded<AtomicU64>,
  pub(crate) evictions: CachePadded<AtomicU64>,
  pub(crate) hydrations: CachePadded<AtomicU64>,

  // --- Fetch lifecycle ---
  pub(crate) fetches_started: CachePadded<AtomicU64>,
  pub(crate) fetches_settled: CachePadded<AtomicU64>,
  pub(crate) fetches_failed: CachePadded<AtomicU64>,
  pub(crate) fetches_discarded: CachePadded<AtomicU64>,

  created_at: Instant,
}

// Manual implementation of Default to handle the non-default `Instant`.
impl Default for Metrics {
  fn default() -> Self {
    Self {
      hits: CachePadded::new(AtomicU64::new(0)),
      misses: CachePadded::new(AtomicU64::new(0)),
      inserts: CachePadded::new(AtomicU64::new(0)),
      invalidations: CachePadded::new(AtomicU64::new(0)),
      removals: CachePadded::new(AtomicU64::new(0)),
      evictions: CachePadded::new(AtomicU64::new(0)),
      hydrations: CachePadded::new(AtomicU64::new(0)),
      fetches_started: CachePadded::new(AtomicU64::new(0)),
      fetches_settled: CachePadded::new(AtomicU64::new(0)),
      fetches_failed: CachePadded::new(AtomicU64::new(0)),
      fetches_discarded: CachePadded::new(AtomicU64::new(0)),
      created_at: Instant::now(),
    }
  }
}

impl Metrics {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  /// Creates a point-in-time snapshot of the current metrics.
  pub(crate) fn snapshot(&self) -> MetricsSnapshot {
    let hits = self.hits.load(Ordering::Relaxed);
    let misses = self.misses.load(Ordering::Relaxed);
    let total_lookups = hits + misses;

    MetricsSnapshot {
      hits,
      misses,
      hit_ratio: if total_lookups == 0 {
        0.0
      } else {
        hits as f64 / total_lookups as f64
      },
      inserts: self.inserts.load(Ordering::Relaxed),
      invalidations: self.invalidations.load(Ordering::Relaxed),
      removals: self.removals.load(Ordering::Relaxed),
      evictions: self.evictions.load(Ordering::Relaxed),
      hydrations: self.hydrations.load(Ordering::Relaxed),
      fetches_started: self.fetches_started.load(Ordering::Relaxed),
      fetches_settled: self.fetches_settled.load(Ordering::Relaxed),
      fetches_failed: self.fetches_failed.load(Ordering::Relaxed),
      fetches_discarded: self.fetches_discarded.load(Ordering::Relaxed),
      uptime_secs: self.created_at.elapsed().as_secs(),
    }
  }
}

/// A point-in-time, public-facing snapshot of the cache's metrics.
#[derive(Clone)]
pub struct MetricsSnapshot {
  /// The number of reads that found an entry.
  pub hits: u64,
  /// The number of reads that found nothing.
  pub misses: u64,
  /// The read hit ratio (hits / (hits + misses)).
  pub hit_ratio: f64,
  /// The number of immediate values stored through `set`.
  pub inserts: u64,
  /// The number of manual invalidations.
  pub invalidations: u64,
  /// The number of entries dropped through `remove` or `clear`.
  pub removals: u64,
  /// The number of entries evicted by an elapsed retention window,
  /// including zero-window immediate evictions.
  pub evictions: u64,
  /// The number of entries seeded through hydration.
  pub hydrations: u64,
  /// The number of fetches recorded through `set_future`.
  pub fetches_started: u64,
  /// The number of fetch settlements applied as a resolved value.
  pub fetches_settled: u64,
  /// The number of fetch settlements applied as a failure.
  pub fetches_failed: u64,
  /// The number of settlements discarded because their fetch had been
  /// superseded or its entry no longer wanted the outcome.
  pub fetches_discarded: u64,
  /// The number of seconds the cache has existed.
  pub uptime_secs: u64,
}

impl fmt::Debug for MetricsSnapshot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MetricsSnapshot")
      .field("hits", &self.hits)
      .field("misses", &self.misses)
      .field("hit_ratio", &format!("{:.2}%", self.hit_ratio * 100.0))
      .field("inserts", &self.inserts)
      .field("invalidations", &self.invalidations)
      .field("removals", &self.removals)
      .field("evictions", &self.evictions)
      .field("hydrations", &self.hydrations)
      .field("fetches_started", &self.fetches_started)
      .field("fetches_settled", &self.fetches_settled)
      .field("fetches_failed", &self.fetches_failed)
      .field("fetches_discarded", &self.fetches_discarded)
      .field("uptime_secs", &self.uptime_secs)
      .finish()
  }
}
