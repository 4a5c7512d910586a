use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::thread::{self, Thread};

/// The settled outcome of a fetch: the resolved value or the failure.
pub type FetchResult<V, E> = Result<Arc<V>, Arc<E>>;

/// Represents a waiter parked on an unsettled `FetchFuture`.
pub(crate) enum Waiter {
  Sync(Thread),
  Async(Waker),
}

impl Waiter {
  fn wake(self) {
    match self {
      Waiter::Sync(thread) => thread.unpark(),
      Waiter::Async(waker) => waker.wake(),
    }
  }
}

enum State<V, E> {
  InFlight,
  Settled(FetchResult<V, E>),
}

struct Inner<V, E> {
  state: State<V, E>,
  waiters: VecDeque<Waiter>,
}

/// The single shared handle for one in-flight fetch.
///
/// All consumers interested in a key attach to the same `FetchFuture`
/// rather than starting a second request: async tasks by awaiting a
/// reference to it, blocking threads through [`FetchFuture::wait`]. It
/// settles exactly once; settling an already-settled future is ignored,
/// which makes late completions harmless.
pub struct FetchFuture<V, E> {
  inner: Mutex<Inner<V, E>>,
}

impl<V, E> FetchFuture<V, E> {
  /// Creates a new `FetchFuture` in the in-flight state.
  pub(crate) fn new() -> Self {
    Self {
      inner: Mutex::new(Inner {
        state: State::InFlight,
        waiters: VecDeque::new(),
      }),
    }
  }

  /// Settles the future with an outcome, waking every waiter.
  pub(crate) fn settle(&self, result: FetchResult<V, E>) {
    let mut inner = self.inner.lock();
    if matches!(inner.state, State::Settled(_)) {
      return;
    }
    inner.state = State::Settled(result);
    for waiter in inner.waiters.drain(..) {
      waiter.wake();
    }
  }

  /// True once the fetch has resolved or failed.
  pub fn is_settled(&self) -> bool {
    matches!(self.inner.lock().state, State::Settled(_))
  }

  /// Returns the outcome without blocking, or `None` while in flight.
  pub fn try_result(&self) -> Option<FetchResult<V, E>> {
    match &self.inner.lock().state {
      State::Settled(result) => Some(result.clone()),
      State::InFlight => None,
    }
  }

  /// Blocks the calling thread until the fetch settles.
  pub fn wait(&self) -> FetchResult<V, E> {
    loop {
      {
        let mut inner = self.inner.lock();
        if let State::Settled(result) = &inner.state {
          return result.clone();
        }
        inner.waiters.push_back(Waiter::Sync(thread::current()));
      }
      thread::park();
    }
  }
}

impl<V, E> Future for &FetchFuture<V, E> {
  type Output = FetchResult<V, E>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let mut inner = self.inner.lock();
    match &inner.state {
      State::Settled(result) => Poll::Ready(result.clone()),
      State::InFlight => {
        inner.waiters.push_back(Waiter::Async(cx.waker().clone()));
        Poll::Pending
      }
    }
  }
}

impl<V, E> fmt::Debug for FetchFuture<V, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FetchFuture")
      .field("settled", &self.is_settled())
      .finish()
  }
}
