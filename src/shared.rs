use crate::entry::{QueryEntry, Retention};
use crate::fetch::{FetchFuture, FetchResult};
use crate::listener::{EvictionListener, EvictionReason};
use crate::metrics::Metrics;
use crate::runtime::TaskSpawner;
use crate::store::{QueryRecord, TableStore};
use crate::subscription::{fan_out, ChangeListener};
use crate::task::janitor::Janitor;
use crate::task::scheduler::EvictionScheduler;
use crate::time;

use std::fmt;
use std::hash::BuildHasher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;

/// The internal core shared by every handle to one cache.
pub(crate) struct CacheShared<V: Send + Sync, E: Send + Sync, H> {
  pub(crate) store: Arc<TableStore<V, E, H>>,
  pub(crate) scheduler: Arc<EvictionScheduler>,
  pub(crate) metrics: Arc<Metrics>,
  pub(crate) janitor: Option<Janitor>,
  pub(crate) eviction_listener: Option<Arc<dyn EvictionListener<V, E>>>,
  pub(crate) spawner: Option<Arc<dyn TaskSpawner>>,
  pub(crate) default_retention: Retention,
  pub(crate) next_subscriber_id: AtomicU64,
}

impl<V: Send + Sync, E: Send + Sync, H> fmt::Debug for CacheShared<V, E, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheShared")
      .field("default_retention", &self.default_retention)
      .field("metrics", &self.metrics.snapshot())
      .finish_non_exhaustive()
  }
}

impl<V: Send + Sync, E: Send + Sync, H> Drop for CacheShared<V, E, H> {
  fn drop(&mut self) {
    if let Some(janitor) = self.janitor.take() {
      janitor.stop();
    }
  }
}

impl<V, E, H> CacheShared<V, E, H>
where
  V: Send + Sync + 'static,
  E: Send + Sync + 'static,
  H: BuildHasher + Send + 'static,
{
  /// (Re-)arms the eviction slot for a record with no subscribers.
  /// The caller holds the table lock. `Forever` retention arms nothing;
  /// zero-window records never reach this point, they are dropped at the
  /// call site instead.
  pub(crate) fn rearm(&self, key: &str, record: &mut QueryRecord<V, E>) {
    if let Some(slot) = record.eviction_slot.take() {
      self.scheduler.disarm(slot);
    }
    if let Retention::Finite(window) = record.retention {
      record.eviction_slot = Some(self.scheduler.arm(key.to_owned(), window));
    }
  }

  /// Forwards a removal to the cache-wide eviction listener, if any.
  pub(crate) fn report_eviction(&self, key: &str, snapshot: &QueryEntry<V, E>, reason: EvictionReason) {
    if let Some(listener) = &self.eviction_listener {
      listener.on_evict(key, snapshot, reason);
    }
  }

  /// Detaches subscriber `id` from `key`. When the set empties this
  /// clears any lingering failure and starts the retention clock.
  pub(crate) fn unsubscribe(&self, key: &str, id: u64) {
    let mut evicted = None;
    {
      let mut map = self.store.map.lock();
      let mut drop_now = false;
      if let Some(record) = map.get_mut(key) {
        if record.subscribers.detach(id) && record.subscribers.is_empty() {
          if record.snapshot.error().is_some() {
            let next = record.snapshot.with_error_cleared();
            record.publish(next);
          }
          if record.retention.is_immediate() {
            drop_now = true;
          } else {
            self.rearm(key, record);
          }
        }
      }
      if drop_now {
        if let Some(record) = map.remove(key) {
          if let Some(slot) = record.eviction_slot {
            self.scheduler.disarm(slot);
          }
          evicted = Some(record.snapshot);
        }
      }
    }

    if let Some(snapshot) = evicted {
      self.metrics.evictions.fetch_add(1, Ordering::Relaxed);
      self.report_eviction(key, &snapshot, EvictionReason::RetentionElapsed);
    }
  }

  /// Drives `work` on the configured spawner and applies its outcome when
  /// it settles.
  pub(crate) fn spawn_fetch_task(
    shared: Arc<Self>,
    key: String,
    fetch: Arc<FetchFuture<V, E>>,
    work: BoxFuture<'static, Result<V, E>>,
  ) {
    let spawner = shared
      .spawner
      .as_ref()
      .expect("spawner presence is checked before the fetch is recorded")
      .clone();

    let task = async move {
      let outcome = work.await;
      shared.apply_settlement(&key, &fetch, outcome);
    };
    spawner.spawn(Box::pin(task));
  }

  /// Applies a settled fetch against whatever the key holds *now*, not
  /// the state captured when the fetch was recorded.
  ///
  /// - The record still holds this exact future: apply the transition and
  ///   fan out.
  /// - The record was superseded by a later `set`/`set_future`: discard.
  /// - The record was evicted while the fetch ran: a success re-creates
  ///   it at the default retention, a failure is discarded.
  ///
  /// The `FetchFuture` itself settles last, after the table reflects the
  /// outcome, so anything woken by it reads the final state.
  pub(crate) fn apply_settlement(self: &Arc<Self>, key: &str, fetch: &Arc<FetchFuture<V, E>>, outcome: Result<V, E>) {
    let result: FetchResult<V, E> = match outcome {
      Ok(value) => Ok(Arc::new(value)),
      Err(error) => Err(Arc::new(error)),
    };

    let mut notify: Option<(Arc<QueryEntry<V, E>>, Vec<ChangeListener<V, E>>)> = None;
    {
      let mut map = self.store.map.lock();
      match map.get_mut(key) {
        Some(record) => {
          let current = record
            .snapshot
            .fetch()
            .map_or(false, |recorded| Arc::ptr_eq(recorded, fetch));
          if current {
            let next = match &result {
              Ok(value) => {
                self.metrics.fetches_settled.fetch_add(1, Ordering::Relaxed);
                record.snapshot.with_resolved(value.clone())
              }
              Err(error) => {
                self.metrics.fetches_failed.fetch_add(1, Ordering::Relaxed);
                record.snapshot.with_failed(error.clone())
              }
            };
            let snapshot = record.publish(next);
            notify = Some((snapshot, record.subscribers.snapshot()));
          } else {
            self.metrics.fetches_discarded.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(key = %key, "fetch settled after being superseded, result discarded");
          }
        }
        None => match &result {
          Ok(value) => {
            // The entry was evicted while the fetch was in flight;
            // re-create it so the settlement is not lost.
            self.metrics.fetches_settled.fetch_add(1, Ordering::Relaxed);
            if !self.default_retention.is_immediate() {
              let entry = QueryEntry::resolved(value.clone(), time::now_duration(), false);
              let mut record = QueryRecord::new(entry, self.default_retention);
              self.rearm(key, &mut record);
              map.insert(key.to_owned(), record);
            }
          }
          Err(_) => {
            self.metrics.fetches_discarded.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(key = %key, "fetch failed after its entry was evicted, result discarded");
          }
        },
      }
    }

    if let Some((snapshot, listeners)) = notify {
      fan_out(&listeners, &snapshot);
    }
    fetch.settle(result);
  }
}
