use crate::entry::{QueryEntry, QueryResult, Retention};
use crate::fetch::FetchFuture;
use crate::iter::Keys;
use crate::listener::EvictionReason;
use crate::metrics::MetricsSnapshot;
use crate::shared::CacheShared;
use crate::store::QueryRecord;
use crate::subscription::{fan_out, ChangeListener, Subscription};

use std::fmt;
use std::future::Future;
use std::hash::BuildHasher;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

/// A reactive cache of asynchronous query results, keyed by string.
///
/// A `QueryCache` is an ordinary value: clone it to hand the same cache to
/// another component, build a second one to get an isolated cache. Nothing
/// is shared through module-level state.
///
/// The cache stores the *result* of a fetch, never performs one. The
/// consumer that decides to fetch records the attempt with
/// [`set_future`](QueryCache::set_future) (or an already-available value
/// with [`set`](QueryCache::set)); everyone else observes the entry through
/// [`get`](QueryCache::get)/[`read`](QueryCache::read) and
/// [`subscribe`](QueryCache::subscribe).
pub struct QueryCache<V: Send + Sync, E: Send + Sync, H = ahash::RandomState> {
  pub(crate) shared: Arc<CacheShared<V, E, H>>,
}

impl<V: Send + Sync, E: Send + Sync, H> Clone for QueryCache<V, E, H> {
  fn clone(&self) -> Self {
    Self {
      shared: self.shared.clone(),
    }
  }
}

impl<V: Send + Sync, E: Send + Sync, H> fmt::Debug for QueryCache<V, E, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("QueryCache").field("shared", &self.shared).finish()
  }
}

impl<V, E, H> QueryCache<V, E, H>
where
  V: Send + Sync + 'static,
  E: Send + Sync + 'static,
  H: BuildHasher + Send + 'static,
{
  /// Returns true if an entry exists for `key`, whatever its state:
  /// resolved, pending, failed, or merely subscribed to.
  pub fn contains(&self, key: &str) -> bool {
    self.shared.store.map.lock().contains_key(key)
  }

  /// Snapshot read. Non-blocking, never triggers a fetch.
  ///
  /// Consumes the transient hydration flag: the returned snapshot carries
  /// it, subsequent reads of the entry do not.
  pub fn get(&self, key: &str) -> Option<Arc<QueryEntry<V, E>>> {
    let snapshot = {
      let mut map = self.shared.store.map.lock();
      map.get_mut(key).map(|record| {
        let snapshot = record.snapshot.clone();
        if snapshot.is_hydrated() {
          record.publish(snapshot.with_hydration_consumed());
        }
        snapshot
      })
    };

    if snapshot.is_some() {
      self.shared.metrics.hits.fetch_add(1, Ordering::Relaxed);
    } else {
      self.shared.metrics.misses.fetch_add(1, Ordering::Relaxed);
    }
    snapshot
  }

  /// Tagged read for suspension-style consumers: a present value wins
  /// over an outstanding fetch, which wins over a failure. `None` for an
  /// unknown key and for a tracked entry with nothing to show (use
  /// [`contains`](QueryCache::contains) to tell the two apart).
  pub fn read(&self, key: &str) -> Option<QueryResult<V, E>> {
    self.get(key).and_then(|entry| entry.result())
  }

  /// Stores an immediate value for `key`: the entry becomes resolved,
  /// any recorded failure, staleness, and in-flight fetch are dropped
  /// (a fetch still outstanding settles later and is discarded), and
  /// subscribers are notified before this call returns.
  ///
  /// `retention` widens the entry's window per the max-of rule. With no
  /// subscriber attached, a zero window drops the entry on the spot.
  pub fn set(&self, key: impl Into<String>, value: V, retention: impl Into<Retention>) {
    let key = key.into();
    let retention = retention.into();
    let value = Arc::new(value);

    let mut notify = None;
    let mut evicted = None;
    {
      let mut map = self.shared.store.map.lock();
      let (snapshot, listeners, unobserved, immediate) = {
        let record = map
          .entry(key.clone())
          .or_insert_with(|| QueryRecord::new(QueryEntry::empty(), retention));
        record.retention = record.retention.widen(retention);
        let next = record.snapshot.with_resolved(value);
        let snapshot = record.publish(next);
        (
          snapshot,
          record.subscribers.snapshot(),
          record.subscribers.is_empty(),
          record.retention.is_immediate(),
        )
      };
      self.shared.metrics.inserts.fetch_add(1, Ordering::Relaxed);

      if unobserved && immediate {
        if let Some(record) = map.remove(&key) {
          if let Some(slot) = record.eviction_slot {
            self.shared.scheduler.disarm(slot);
          }
          evicted = Some(snapshot);
        }
      } else {
        if unobserved {
          if let Some(record) = map.get_mut(&key) {
            self.shared.rearm(&key, record);
          }
        }
        notify = Some((snapshot, listeners));
      }
    }

    if let Some(snapshot) = evicted {
      self.shared.metrics.evictions.fetch_add(1, Ordering::Relaxed);
      self.shared.report_eviction(&key, &snapshot, EvictionReason::RetentionElapsed);
    } else if let Some((snapshot, listeners)) = notify {
      fan_out(&listeners, &snapshot);
    }
  }

  /// Records an in-flight fetch for `key` and drives it on the configured
  /// spawner. Returns the shared handle every concurrent consumer of the
  /// key should attach to instead of starting a second fetch.
  ///
  /// Recording clears any previous failure and staleness while keeping
  /// the last good value readable. A fetch already outstanding for the
  /// key is superseded: it still settles for its waiters, but the store
  /// discards its outcome. Callers that want dedup consult
  /// [`get`](QueryCache::get) first and attach to the pending handle.
  ///
  /// # Panics
  ///
  /// Panics if the cache was built without a task spawner: configure
  /// [`CacheBuilder::spawner`](crate::CacheBuilder::spawner) or build
  /// inside a Tokio runtime.
  pub fn set_future<Fut>(
    &self,
    key: impl Into<String>,
    work: Fut,
    retention: impl Into<Retention>,
  ) -> Arc<FetchFuture<V, E>>
  where
    Fut: Future<Output = Result<V, E>> + Send + 'static,
  {
    assert!(
      self.shared.spawner.is_some(),
      "set_future on a cache without a task spawner; configure CacheBuilder::spawner or build inside a tokio runtime"
    );

    let key = key.into();
    let retention = retention.into();
    let fetch = Arc::new(FetchFuture::new());

    let mut notify = None;
    let mut evicted = None;
    {
      let mut map = self.shared.store.map.lock();
      let (snapshot, listeners, unobserved, immediate) = {
        let record = map
          .entry(key.clone())
          .or_insert_with(|| QueryRecord::new(QueryEntry::empty(), retention));
        record.retention = record.retention.widen(retention);
        let next = record.snapshot.with_fetch_started(fetch.clone());
        let snapshot = record.publish(next);
        (
          snapshot,
          record.subscribers.snapshot(),
          record.subscribers.is_empty(),
          record.retention.is_immediate(),
        )
      };
      self.shared.metrics.fetches_started.fetch_add(1, Ordering::Relaxed);

      // Eviction is governed by subscriber count alone; a pending fetch
      // does not keep an unobserved entry alive.
      if unobserved && immediate {
        if let Some(record) = map.remove(&key) {
          if let Some(slot) = record.eviction_slot {
            self.shared.scheduler.disarm(slot);
          }
          evicted = Some(snapshot);
        }
      } else {
        if unobserved {
          if let Some(record) = map.get_mut(&key) {
            self.shared.rearm(&key, record);
          }
        }
        notify = Some((snapshot, listeners));
      }
    }

    if let Some(snapshot) = evicted {
      self.shared.metrics.evictions.fetch_add(1, Ordering::Relaxed);
      self.shared.report_eviction(&key, &snapshot, EvictionReason::RetentionElapsed);
    } else if let Some((snapshot, listeners)) = notify {
      fan_out(&listeners, &snapshot);
    }

    CacheShared::spawn_fetch_task(self.shared.clone(), key, fetch.clone(), Box::pin(work));
    fetch
  }

  /// Marks an existing entry stale and notifies its subscribers. The
  /// value stays readable and an in-flight fetch keeps running. No-op for
  /// an unknown key; calling it on an already-stale entry is harmless.
  pub fn invalidate(&self, key: &str) {
    let mut notify = None;
    {
      let mut map = self.shared.store.map.lock();
      if let Some(record) = map.get_mut(key) {
        let next = record.snapshot.with_invalidated();
        let snapshot = record.publish(next);
        self.shared.metrics.invalidations.fetch_add(1, Ordering::Relaxed);
        notify = Some((snapshot, record.subscribers.snapshot()));
      }
    }
    if let Some((snapshot, listeners)) = notify {
      fan_out(&listeners, &snapshot);
    }
  }

  /// Marks every tracked entry stale.
  pub fn invalidate_all(&self) {
    let keys: Vec<String> = self.keys().collect();
    for key in keys {
      self.invalidate(&key);
    }
  }

  /// Registers `listener` for change notifications on `key`, lazily
  /// creating an empty entry at the cache's default retention and
  /// cancelling any scheduled eviction.
  ///
  /// Listeners run synchronously with the mutation that triggered them,
  /// after the new snapshot is published and with no internal lock held,
  /// so they are free to call back into the cache. Each registration is
  /// its own subscriber, even for the same closure.
  pub fn subscribe<F>(&self, key: impl Into<String>, listener: F) -> Subscription
  where
    F: Fn(&QueryEntry<V, E>) + Send + Sync + 'static,
  {
    let key = key.into();
    let id = self.shared.next_subscriber_id.fetch_add(1, Ordering::Relaxed);

    {
      let mut map = self.shared.store.map.lock();
      let record = map
        .entry(key.clone())
        .or_insert_with(|| QueryRecord::new(QueryEntry::empty(), self.shared.default_retention));
      if let Some(slot) = record.eviction_slot.take() {
        self.shared.scheduler.disarm(slot);
      }
      record.subscribers.attach(id, Arc::new(listener) as ChangeListener<V, E>);
    }

    let shared = self.shared.clone();
    Subscription::new(move || shared.unsubscribe(&key, id))
  }

  /// Drops `key` outright, cancelling any scheduled eviction. A fetch
  /// still in flight for the key settles normally; a successful outcome
  /// re-creates the entry.
  pub fn remove(&self, key: &str) -> bool {
    let removed = {
      let mut map = self.shared.store.map.lock();
      map.remove(key).map(|record| {
        if let Some(slot) = record.eviction_slot {
          self.shared.scheduler.disarm(slot);
        }
        record.snapshot
      })
    };

    match removed {
      Some(snapshot) => {
        self.shared.metrics.removals.fetch_add(1, Ordering::Relaxed);
        self.shared.report_eviction(key, &snapshot, EvictionReason::Removed);
        true
      }
      None => false,
    }
  }

  /// Drops every entry and disarms every scheduled eviction.
  pub fn clear(&self) {
    let drained: Vec<(String, Arc<QueryEntry<V, E>>)> = {
      let mut map = self.shared.store.map.lock();
      self.shared.scheduler.clear();
      map.drain().map(|(key, record)| (key, record.snapshot)).collect()
    };

    self
      .shared
      .metrics
      .removals
      .fetch_add(drained.len() as u64, Ordering::Relaxed);
    tracing::debug!(entries = drained.len(), "cache cleared");
    for (key, snapshot) in &drained {
      self.shared.report_eviction(key, snapshot, EvictionReason::Cleared);
    }
  }

  /// A point-in-time snapshot of the tracked keys. Iteration is lazy but
  /// finite; keys added after the call are not reflected and keys removed
  /// after the call are still yielded.
  pub fn keys(&self) -> Keys {
    let keys: Vec<String> = self.shared.store.map.lock().keys().cloned().collect();
    Keys::new(keys)
  }

  /// The number of tracked entries.
  pub fn len(&self) -> usize {
    self.shared.store.map.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// True while `key` sits in its retention window awaiting eviction.
  pub fn eviction_scheduled(&self, key: &str) -> bool {
    self
      .shared
      .store
      .map
      .lock()
      .get(key)
      .map_or(false, |record| record.eviction_slot.is_some())
  }

  /// Seeds an already-resolved entry, flagged as hydrated until its first
  /// read. Live data wins: an entry that already holds a value is left
  /// untouched and `false` is returned.
  pub fn hydrate(&self, key: impl Into<String>, value: V, retention: impl Into<Retention>) -> bool {
    self.hydrate_aged(key, value, None, retention.into())
  }

  pub(crate) fn hydrate_aged(&self, key: impl Into<String>, value: V, age: Option<Duration>, retention: Retention) -> bool {
    let key = key.into();
    let value = Arc::new(value);
    let updated_at = match age {
      Some(age) => crate::time::now_duration().saturating_sub(age),
      None => crate::time::now_duration(),
    };

    let (snapshot, listeners) = {
      let mut map = self.shared.store.map.lock();
      let record = map
        .entry(key.clone())
        .or_insert_with(|| QueryRecord::new(QueryEntry::empty(), retention));
      if record.snapshot.value().is_some() {
        return false;
      }
      record.retention = record.retention.widen(retention);
      let snapshot = record.publish(QueryEntry::resolved(value, updated_at, true));
      self.shared.metrics.hydrations.fetch_add(1, Ordering::Relaxed);
      if record.subscribers.is_empty() {
        self.shared.rearm(&key, record);
      }
      (snapshot, record.subscribers.snapshot())
    };

    fan_out(&listeners, &snapshot);
    tracing::trace!(key = %key, "entry hydrated");
    true
  }

  /// A point-in-time snapshot of the cache's counters.
  pub fn metrics(&self) -> MetricsSnapshot {
    self.shared.metrics.snapshot()
  }
}
