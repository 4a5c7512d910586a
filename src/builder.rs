use crate::entry::Retention;
use crate::error::BuildError;
use crate::handles::QueryCache;
use crate::listener::EvictionListener;
use crate::metrics::Metrics;
use crate::runtime::TaskSpawner;
use crate::shared::CacheShared;
use crate::store::TableStore;
use crate::task::janitor::{Janitor, JanitorContext};
use crate::task::scheduler::EvictionScheduler;

use core::fmt;
use std::hash::BuildHasher;
use std::marker::PhantomData;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

/// How often the janitor sweeps when not configured otherwise.
pub(crate) const DEFAULT_JANITOR_TICK: Duration = Duration::from_millis(100);

/// A builder for [`QueryCache`] instances.
pub struct CacheBuilder<V: Send, E: Send, H = ahash::RandomState> {
  default_retention: Retention,
  janitor_tick_interval: Option<Duration>,
  hasher: H,
  eviction_listener: Option<Arc<dyn EvictionListener<V, E>>>,
  spawner: Option<Arc<dyn TaskSpawner>>,
  _value_marker: PhantomData<V>,
  _error_marker: PhantomData<E>,
}

impl<V: Send, E: Send, H> fmt::Debug for CacheBuilder<V, E, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheBuilder")
      .field("default_retention", &self.default_retention)
      .field("janitor_tick_interval", &self.janitor_tick_interval)
      .field("has_eviction_listener", &self.eviction_listener.is_some())
      .field("has_spawner", &self.spawner.is_some())
      .finish_non_exhaustive()
  }
}

// --- General Configuration Methods ---
impl<V: Send, E: Send, H> CacheBuilder<V, E, H> {
  /// The retention window applied to entries created by `subscribe` and
  /// to entries re-created by a fetch settling after eviction.
  ///
  /// Defaults to five minutes.
  pub fn default_retention(mut self, retention: impl Into<Retention>) -> Self {
    self.default_retention = retention.into();
    self
  }

  /// How often the janitor checks for elapsed retention windows.
  ///
  /// Eviction latency is bounded by this interval; shorten it in tests
  /// that exercise short windows. Defaults to 100 milliseconds.
  pub fn janitor_tick_interval(mut self, interval: Duration) -> Self {
    self.janitor_tick_interval = Some(interval);
    self
  }

  /// Sets the cache-wide eviction listener.
  pub fn eviction_listener<L>(mut self, listener: L) -> Self
  where
    L: EvictionListener<V, E> + 'static,
  {
    self.eviction_listener = Some(Arc::new(listener));
    self
  }

  /// Sets the spawner used to drive fetch futures recorded through
  /// `set_future`. When unset, the builder falls back to the ambient
  /// Tokio runtime if the `tokio` feature is enabled and a runtime is
  /// active at build time.
  pub fn spawner(mut self, spawner: Arc<dyn TaskSpawner>) -> Self {
    self.spawner = Some(spawner);
    self
  }
}

// --- Default Constructor ---
impl<V: Send, E: Send, H: BuildHasher + Default> CacheBuilder<V, E, H> {
  /// Creates a new `CacheBuilder` with default settings.
  pub fn new() -> Self {
    Self {
      default_retention: Retention::default(),
      janitor_tick_interval: None,
      hasher: H::default(),
      eviction_listener: None,
      spawner: None,
      _value_marker: PhantomData,
      _error_marker: PhantomData,
    }
  }
}

impl<V: Send, E: Send> Default for CacheBuilder<V, E, ahash::RandomState> {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(feature = "rapidhash")]
impl<V: Send, E: Send> CacheBuilder<V, E, rapidhash::RapidRandomState> {
  pub fn rapidhash() -> Self {
    Self::new()
  }
}

// --- Build Methods ---
impl<V, E, H> CacheBuilder<V, E, H>
where
  V: Send + Sync + 'static,
  E: Send + Sync + 'static,
  H: BuildHasher + Send + 'static,
{
  /// Sets the hasher for the key table.
  pub fn hasher(mut self, hasher: H) -> Self {
    self.hasher = hasher;
    self
  }

  /// Builds the cache, spawning its janitor thread.
  pub fn build(mut self) -> Result<QueryCache<V, E, H>, BuildError> {
    self.validate()?;

    let spawner = self.spawner.take().or_else(ambient_spawner);
    let store = Arc::new(TableStore::new(self.hasher));
    let scheduler = Arc::new(EvictionScheduler::new());
    let metrics = Arc::new(Metrics::new());

    let context = JanitorContext {
      store: Arc::clone(&store),
      scheduler: Arc::clone(&scheduler),
      metrics: Arc::clone(&metrics),
      eviction_listener: self.eviction_listener.clone(),
    };
    let tick = self.janitor_tick_interval.unwrap_or(DEFAULT_JANITOR_TICK);
    let janitor = Janitor::spawn(context, tick);

    Ok(QueryCache {
      shared: Arc::new(CacheShared {
        store,
        scheduler,
        metrics,
        janitor: Some(janitor),
        eviction_listener: self.eviction_listener,
        spawner,
        default_retention: self.default_retention,
        next_subscriber_id: AtomicU64::new(0),
      }),
    })
  }

  /// Validates the builder configuration.
  pub(crate) fn validate(&self) -> Result<(), BuildError> {
    if matches!(self.janitor_tick_interval, Some(interval) if interval.is_zero()) {
      return Err(BuildError::ZeroTickInterval);
    }
    Ok(())
  }
}

#[cfg(feature = "tokio")]
fn ambient_spawner() -> Option<Arc<dyn TaskSpawner>> {
  crate::runtime::TokioSpawner::try_current().map(|spawner| Arc::new(spawner) as Arc<dyn TaskSpawner>)
}

#[cfg(not(feature = "tokio"))]
fn ambient_spawner() -> Option<Arc<dyn TaskSpawner>> {
  None
}
