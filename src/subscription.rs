use crate::entry::QueryEntry;

use std::fmt;
use std::sync::Arc;

/// A change listener attached to one entry. Invoked with the freshly
/// published snapshot after every mutation of that entry.
pub(crate) type ChangeListener<V, E> = Arc<dyn Fn(&QueryEntry<V, E>) + Send + Sync>;

/// The set of change listeners attached to one entry.
///
/// Listeners are keyed by an id issued at attach time; two registrations
/// of the same closure are two subscribers. Order of delivery is
/// unspecified.
pub(crate) struct SubscriberSet<V, E> {
  listeners: Vec<(u64, ChangeListener<V, E>)>,
}

impl<V, E> SubscriberSet<V, E> {
  pub(crate) fn new() -> Self {
    Self { listeners: Vec::new() }
  }

  pub(crate) fn attach(&mut self, id: u64, listener: ChangeListener<V, E>) {
    self.listeners.push((id, listener));
  }

  /// Removes the listener with the given id; returns whether it was
  /// present.
  pub(crate) fn detach(&mut self, id: u64) -> bool {
    let before = self.listeners.len();
    self.listeners.retain(|(attached, _)| *attached != id);
    self.listeners.len() != before
  }

  pub(crate) fn is_empty(&self) -> bool {
    self.listeners.is_empty()
  }

  /// Clones the listener handles so they can be invoked once the table
  /// lock has been released.
  pub(crate) fn snapshot(&self) -> Vec<ChangeListener<V, E>> {
    self.listeners.iter().map(|(_, listener)| listener.clone()).collect()
  }
}

impl<V, E> fmt::Debug for SubscriberSet<V, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SubscriberSet")
      .field("len", &self.listeners.len())
      .finish()
  }
}

/// Delivers a published snapshot to a collected listener set.
/// Callers must have released the table lock first; listeners are free to
/// call back into the cache.
pub(crate) fn fan_out<V, E>(listeners: &[ChangeListener<V, E>], snapshot: &QueryEntry<V, E>) {
  for listener in listeners {
    listener(snapshot);
  }
}

/// The capability returned by [`QueryCache::subscribe`].
///
/// Dropping it detaches the listener; [`Subscription::unsubscribe`] does
/// the same eagerly. When the last listener of an entry detaches, any
/// lingering error on the entry is cleared and its retention window
/// starts counting.
///
/// [`QueryCache::subscribe`]: crate::QueryCache::subscribe
pub struct Subscription {
  cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
  pub(crate) fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
    Self {
      cancel: Some(Box::new(cancel)),
    }
  }

  /// Detaches the listener now instead of at drop time.
  pub fn unsubscribe(mut self) {
    self.fire();
  }

  fn fire(&mut self) {
    if let Some(cancel) = self.cancel.take() {
      cancel();
    }
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    self.fire();
  }
}

impl fmt::Debug for Subscription {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Subscription")
      .field("active", &self.cancel.is_some())
      .finish()
  }
}
