use crate::fetch::FetchFuture;
use crate::time;

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How long an entry outlives its last subscriber.
///
/// An entry's effective retention only ever widens: each request is folded
/// in with a max, so a long-lived consumer is never cut short by a
/// short-lived one asking for the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Retention {
  /// The entry is dropped this long after its last subscriber detaches.
  /// A zero duration drops it immediately, without arming a timer.
  Finite(Duration),
  /// The entry survives until removed explicitly.
  Forever,
}

impl Retention {
  /// Folds another requested window into this one, keeping the wider.
  pub(crate) fn widen(self, other: Retention) -> Retention {
    match (self, other) {
      (Retention::Forever, _) | (_, Retention::Forever) => Retention::Forever,
      (Retention::Finite(a), Retention::Finite(b)) => Retention::Finite(a.max(b)),
    }
  }

  /// True for a zero-length finite window.
  pub fn is_immediate(&self) -> bool {
    matches!(self, Retention::Finite(d) if d.is_zero())
  }
}

impl Default for Retention {
  /// Five minutes, the conventional client-side default.
  fn default() -> Self {
    Retention::Finite(Duration::from_secs(300))
  }
}

impl From<Duration> for Retention {
  fn from(window: Duration) -> Self {
    Retention::Finite(window)
  }
}

/// An immutable snapshot of one key's state.
///
/// Every mutation publishes a fresh snapshot; a reader or subscriber
/// holding one never observes a half-applied update. A previously
/// resolved `value` coexists with a later `error` (stale-while-error) and
/// with an outstanding fetch (stale-while-revalidate), but `error` and an
/// in-flight fetch are mutually exclusive: starting a fetch clears the
/// failure it is retrying.
pub struct QueryEntry<V, E> {
  value: Option<Arc<V>>,
  error: Option<Arc<E>>,
  fetch: Option<Arc<FetchFuture<V, E>>>,
  last_updated: Option<Duration>,
  stale: bool,
  hydrated: bool,
}

impl<V, E> QueryEntry<V, E> {
  /// A tracked-but-empty entry, as created by a bare `subscribe`.
  pub(crate) fn empty() -> Self {
    Self {
      value: None,
      error: None,
      fetch: None,
      last_updated: None,
      stale: false,
      hydrated: false,
    }
  }

  /// An entry resolved out of band, e.g. seeded from a server snapshot.
  pub(crate) fn resolved(value: Arc<V>, updated_at: Duration, hydrated: bool) -> Self {
    Self {
      value: Some(value),
      error: None,
      fetch: None,
      last_updated: Some(updated_at),
      stale: false,
      hydrated,
    }
  }

  // --- Lifecycle transitions ---
  // Pure: each computes the successor snapshot for one event.

  /// A new fetch was recorded. Clears the error it retries and any
  /// staleness; the previous value stays readable while the fetch runs.
  pub(crate) fn with_fetch_started(&self, fetch: Arc<FetchFuture<V, E>>) -> Self {
    Self {
      value: self.value.clone(),
      error: None,
      fetch: Some(fetch),
      last_updated: self.last_updated,
      stale: false,
      hydrated: false,
    }
  }

  /// The current fetch resolved, or an immediate value was stored.
  pub(crate) fn with_resolved(&self, value: Arc<V>) -> Self {
    Self {
      value: Some(value),
      error: None,
      fetch: None,
      last_updated: Some(time::now_duration()),
      stale: false,
      hydrated: false,
    }
  }

  /// The current fetch failed. The last good value and its timestamp are
  /// untouched so callers can show stale data next to the error.
  pub(crate) fn with_failed(&self, error: Arc<E>) -> Self {
    Self {
      value: self.value.clone(),
      error: Some(error),
      fetch: None,
      last_updated: self.last_updated,
      stale: self.stale,
      hydrated: false,
    }
  }

  /// The entry was explicitly invalidated.
  pub(crate) fn with_invalidated(&self) -> Self {
    Self {
      value: self.value.clone(),
      error: self.error.clone(),
      fetch: self.fetch.clone(),
      last_updated: self.last_updated,
      stale: true,
      hydrated: self.hydrated,
    }
  }

  /// The last subscriber detached with a failure still recorded.
  pub(crate) fn with_error_cleared(&self) -> Self {
    Self {
      value: self.value.clone(),
      error: None,
      fetch: self.fetch.clone(),
      last_updated: self.last_updated,
      stale: self.stale,
      hydrated: self.hydrated,
    }
  }

  /// First read of a hydrated entry.
  pub(crate) fn with_hydration_consumed(&self) -> Self {
    Self {
      value: self.value.clone(),
      error: self.error.clone(),
      fetch: self.fetch.clone(),
      last_updated: self.last_updated,
      stale: self.stale,
      hydrated: false,
    }
  }

  // --- Accessors ---

  /// The last successfully resolved value, if any.
  pub fn value(&self) -> Option<&Arc<V>> {
    self.value.as_ref()
  }

  /// The most recent fetch failure, if one is still recorded.
  pub fn error(&self) -> Option<&Arc<E>> {
    self.error.as_ref()
  }

  /// The in-flight fetch handle, if a fetch is outstanding.
  pub fn fetch(&self) -> Option<&Arc<FetchFuture<V, E>>> {
    self.fetch.as_ref()
  }

  /// True while a fetch is outstanding.
  pub fn is_pending(&self) -> bool {
    self.fetch.is_some()
  }

  /// True once the entry has been invalidated and not yet refetched.
  pub fn is_stale(&self) -> bool {
    self.stale
  }

  /// True on the first read of an entry seeded from a snapshot.
  pub fn is_hydrated(&self) -> bool {
    self.hydrated
  }

  /// When the value was last successfully resolved.
  pub fn last_updated(&self) -> Option<Instant> {
    self.last_updated.map(time::instant_at)
  }

  pub(crate) fn last_updated_raw(&self) -> Option<Duration> {
    self.last_updated
  }

  /// Collapses the snapshot into the tagged result consumers branch on.
  /// A present value wins over an outstanding fetch, which wins over a
  /// failure; `None` means the entry is tracked but has nothing to show.
  pub fn result(&self) -> Option<QueryResult<V, E>> {
    if let Some(value) = &self.value {
      return Some(QueryResult::Resolved(value.clone()));
    }
    if let Some(fetch) = &self.fetch {
      return Some(QueryResult::Pending(fetch.clone()));
    }
    if let Some(error) = &self.error {
      return Some(QueryResult::Failed(error.clone()));
    }
    None
  }
}

// Written out so `V` and `E` need not be `Clone`; only `Arc`s are cloned.
impl<V, E> Clone for QueryEntry<V, E> {
  fn clone(&self) -> Self {
    Self {
      value: self.value.clone(),
      error: self.error.clone(),
      fetch: self.fetch.clone(),
      last_updated: self.last_updated,
      stale: self.stale,
      hydrated: self.hydrated,
    }
  }
}

impl<V, E> fmt::Debug for QueryEntry<V, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("QueryEntry")
      .field("has_value", &self.value.is_some())
      .field("has_error", &self.error.is_some())
      .field("pending", &self.fetch.is_some())
      .field("stale", &self.stale)
      .field("hydrated", &self.hydrated)
      .field("last_updated", &self.last_updated)
      .finish()
  }
}

/// The tagged read used by suspension-style consumers: present data,
/// something to wait on, or a failure to surface.
pub enum QueryResult<V, E> {
  Resolved(Arc<V>),
  Pending(Arc<FetchFuture<V, E>>),
  Failed(Arc<E>),
}

impl<V, E> Clone for QueryResult<V, E> {
  fn clone(&self) -> Self {
    match self {
      QueryResult::Resolved(value) => QueryResult::Resolved(value.clone()),
      QueryResult::Pending(fetch) => QueryResult::Pending(fetch.clone()),
      QueryResult::Failed(error) => QueryResult::Failed(error.clone()),
    }
  }
}

impl<V, E> fmt::Debug for QueryResult<V, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      QueryResult::Resolved(_) => f.write_str("QueryResult::Resolved"),
      QueryResult::Pending(_) => f.write_str("QueryResult::Pending"),
      QueryResult::Failed(_) => f.write_str("QueryResult::Failed"),
    }
  }
}
