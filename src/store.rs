use crate::entry::{QueryEntry, Retention};
use crate::subscription::SubscriberSet;

use core::fmt;
use std::collections::HashMap;
use std::sync::Arc;

use generational_arena::Index;
use parking_lot::Mutex;

/// The per-key record owned by the table.
///
/// The published snapshot is replaced wholesale on every mutation;
/// subscriber bookkeeping and the armed eviction slot live alongside it,
/// invisible to readers.
pub(crate) struct QueryRecord<V, E> {
  pub(crate) snapshot: Arc<QueryEntry<V, E>>,
  pub(crate) subscribers: SubscriberSet<V, E>,
  pub(crate) retention: Retention,
  pub(crate) eviction_slot: Option<Index>,
}

impl<V, E> QueryRecord<V, E> {
  pub(crate) fn new(snapshot: QueryEntry<V, E>, retention: Retention) -> Self {
    Self {
      snapshot: Arc::new(snapshot),
      subscribers: SubscriberSet::new(),
      retention,
      eviction_slot: None,
    }
  }

  /// Publishes a successor snapshot and returns it for fan-out.
  pub(crate) fn publish(&mut self, next: QueryEntry<V, E>) -> Arc<QueryEntry<V, E>> {
    self.snapshot = Arc::new(next);
    self.snapshot.clone()
  }
}

impl<V, E> fmt::Debug for QueryRecord<V, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("QueryRecord")
      .field("snapshot", &self.snapshot)
      .field("subscribers", &self.subscribers)
      .field("retention", &self.retention)
      .field("armed", &self.eviction_slot.is_some())
      .finish()
  }
}

/// The keyed table of records.
///
/// One lock, one map: the cache models a single logical writer with one
/// mutation in flight at a time, so shard-level concurrency machinery
/// would buy nothing here.
pub(crate) struct TableStore<V, E, H> {
  pub(crate) map: Mutex<HashMap<String, QueryRecord<V, E>, H>>,
}

impl<V, E, H> TableStore<V, E, H> {
  pub(crate) fn new(hasher: H) -> Self {
    Self {
      map: Mutex::new(HashMap::with_hasher(hasher)),
    }
  }
}

impl<V, E, H> fmt::Debug for TableStore<V, E, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TableStore")
      .field("entries", &self.map.lock().len())
      .finish()
  }
}
