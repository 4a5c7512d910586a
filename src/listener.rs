use crate::entry::QueryEntry;

use std::fmt;

/// Describes why an entry left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
  /// The retention window elapsed with no subscriber attached.
  RetentionElapsed,
  /// The entry was dropped through `remove`.
  Removed,
  /// The entry was dropped by `clear`.
  Cleared,
}

impl fmt::Display for EvictionReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      EvictionReason::RetentionElapsed => write!(f, "retention window elapsed"),
      EvictionReason::Removed => write!(f, "explicitly removed"),
      EvictionReason::Cleared => write!(f, "cache cleared"),
    }
  }
}

/// A cache-wide observer of entry removals.
///
/// `on_evict` runs synchronously on whichever thread performs the
/// removal: the caller of `remove`/`clear`, or the janitor thread for a
/// retention eviction. It receives the entry's final snapshot; per-key
/// subscribers are not notified of removals, only of entry mutations.
pub trait EvictionListener<V, E>: Send + Sync {
  fn on_evict(&self, key: &str, entry: &QueryEntry<V, E>, reason: EvictionReason);
}
