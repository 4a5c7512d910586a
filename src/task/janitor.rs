use crate::listener::{EvictionListener, EvictionReason};
use crate::metrics::Metrics;
use crate::store::TableStore;
use crate::task::scheduler::EvictionScheduler;
use crate::time;

use std::hash::BuildHasher;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// The thread-safe parts of the cache the janitor needs. Holding these,
/// and not the shared core itself, keeps the ownership graph acyclic: the
/// core owns the janitor, never the other way around.
pub(crate) struct JanitorContext<V: Send + Sync, E: Send + Sync, H> {
  pub(crate) store: Arc<TableStore<V, E, H>>,
  pub(crate) scheduler: Arc<EvictionScheduler>,
  pub(crate) metrics: Arc<Metrics>,
  pub(crate) eviction_listener: Option<Arc<dyn EvictionListener<V, E>>>,
}

/// The background thread that sweeps elapsed retention windows.
pub(crate) struct Janitor {
  _handle: JoinHandle<()>,
  stop_flag: Arc<AtomicBool>,
}

impl Janitor {
  /// Spawns the janitor thread.
  pub(crate) fn spawn<V, E, H>(context: JanitorContext<V, E, H>, tick_interval: Duration) -> Self
  where
    V: Send + Sync + 'static,
    E: Send + Sync + 'static,
    H: BuildHasher + Send + 'static,
  {
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_clone = stop_flag.clone();

    let handle = thread::spawn(move || {
      while !stop_clone.load(Ordering::Relaxed) {
        let sweep_start = std::time::Instant::now();
        Self::sweep(&context);
        // Sleep out the remainder of the tick.
        if let Some(remaining) = tick_interval.checked_sub(sweep_start.elapsed()) {
          thread::sleep(remaining);
        }
      }
    });

    Self {
      _handle: handle,
      stop_flag,
    }
  }

  /// Evicts every entry whose deadline has passed and that still has no
  /// subscriber at fire time.
  fn sweep<V, E, H>(context: &JanitorContext<V, E, H>)
  where
    V: Send + Sync,
    E: Send + Sync,
    H: BuildHasher,
  {
    let now = time::now_duration();
    let due = context.scheduler.due(now);

    for (handle, key) in due {
      let mut evicted = None;
      {
        let mut map = context.store.map.lock();
        let fire = match map.get_mut(&key) {
          Some(record) if record.eviction_slot == Some(handle) => {
            if record.subscribers.is_empty() {
              true
            } else {
              // subscribe disarms before attaching, so a populated set
              // here means the slot is orphaned
              record.eviction_slot = None;
              false
            }
          }
          _ => false,
        };
        if fire {
          if let Some(record) = map.remove(&key) {
            evicted = Some(record.snapshot);
          }
        }
        context.scheduler.disarm(handle);
      }

      if let Some(snapshot) = evicted {
        context.metrics.evictions.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(key = %key, "retention window elapsed, entry evicted");
        if let Some(listener) = &context.eviction_listener {
          listener.on_evict(&key, &snapshot, EvictionReason::RetentionElapsed);
        }
      }
    }
  }

  /// Signals the janitor thread to stop. It exits after at most one more
  /// tick.
  pub(crate) fn stop(self) {
    self.stop_flag.store(true, Ordering::Relaxed);
  }
}
