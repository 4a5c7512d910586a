use once_cell::sync::Lazy;
use std::time::{Duration, Instant};

// The single monotonic reference point for every timestamp in the cache.
// Initialized lazily on first use.
static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

/// The current time as a `Duration` since the cache epoch.
/// Epoch-relative durations are plain data, so they can be compared,
/// stored on snapshots, and serialized.
#[inline]
pub(crate) fn now_duration() -> Duration {
  Instant::now().saturating_duration_since(*EPOCH)
}

/// Maps an epoch-relative duration back onto an `Instant`.
#[inline]
pub(crate) fn instant_at(offset: Duration) -> Instant {
  *EPOCH + offset
}
