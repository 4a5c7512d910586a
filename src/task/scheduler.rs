use crate::time;

use core::fmt;
use std::time::Duration;

use generational_arena::{Arena, Index};
use parking_lot::Mutex;

/// One armed eviction deadline.
struct Slot {
  key: String,
  due_at: Duration,
}

/// The arena of pending eviction deadlines.
///
/// Arming inserts a slot and hands its `Index` to the record; disarming
/// removes by `Index` in O(1). Generational indices mean a handle to a
/// cancelled slot can never alias a slot armed later, so a record's
/// stored handle is always safe to compare against.
pub(crate) struct EvictionScheduler {
  slots: Mutex<Arena<Slot>>,
}

impl EvictionScheduler {
  pub(crate) fn new() -> Self {
    Self {
      slots: Mutex::new(Arena::new()),
    }
  }

  /// Arms a deadline `window` from now and returns its handle.
  pub(crate) fn arm(&self, key: String, window: Duration) -> Index {
    let due_at = time::now_duration() + window;
    self.slots.lock().insert(Slot { key, due_at })
  }

  /// Cancels an armed deadline. A handle that already fired or was
  /// disarmed is ignored.
  pub(crate) fn disarm(&self, handle: Index) {
    self.slots.lock().remove(handle);
  }

  /// Collects every slot due at `now`. Slots stay armed until the
  /// janitor confirms each removal under the table lock and disarms
  /// them explicitly.
  pub(crate) fn due(&self, now: Duration) -> Vec<(Index, String)> {
    self
      .slots
      .lock()
      .iter()
      .filter(|(_, slot)| slot.due_at <= now)
      .map(|(index, slot)| (index, slot.key.clone()))
      .collect()
  }

  /// Drops every armed deadline.
  pub(crate) fn clear(&self) {
    self.slots.lock().clear();
  }
}

impl fmt::Debug for EvictionScheduler {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("EvictionScheduler")
      .field("armed", &self.slots.lock().len())
      .finish()
  }
}
