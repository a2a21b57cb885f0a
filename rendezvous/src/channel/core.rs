// src/channel/core.rs

//! The shared state and transition logic of the rendezvous channel.
//!
//! ### Design Principles:
//!
//! 1.  **One Critical Section per Operation**: A `parking_lot::Mutex` guards the whole
//!     state. Every `begin_*` / `finish` call inspects and mutates it in a single
//!     lock scope, so the race between `put`, `get` and `close`/`abort` is resolved
//!     by whichever takes the lock first.
//! 2.  **Single Ticket per Side**: At most one parked producer (`pending_put`) and one
//!     parked consumer (`pending_get`) exist, and never both at once. A second call on
//!     an occupied side is rejected instead of queued.
//! 3.  **Handoffs Outlive the Ticket**: A parked side waits on an `Arc<Handoff>`. The
//!     completing side removes the ticket from the state and resolves the handoff,
//!     so the waiter picks up its result without touching the channel lock again.

use crate::error::{PutError, RecvError};
use crate::internal::handoff::Handoff;

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

/// What a `get` observes: an item, end-of-sequence (`Ok(None)`), or an error.
pub(crate) type Delivery<T, E> = Result<Option<T>, RecvError<E>>;

/// Resolved once the parked item is collected (`Ok`) or discarded because every
/// consumer went away (`Err(item)`).
pub(crate) type PutHandoff<T> = Arc<Handoff<Result<(), T>>>;
pub(crate) type GetHandoff<T, E> = Arc<Handoff<Delivery<T, E>>>;

/// The permanent end state of a channel.
#[derive(Debug)]
pub(crate) enum Terminal<E> {
  Closed,
  Aborted(E),
  Panicked(String),
}

impl<E: Clone> Terminal<E> {
  /// The outcome every `get` observes once the channel is terminal.
  pub(crate) fn delivery<T>(&self) -> Delivery<T, E> {
    match self {
      Terminal::Closed => Ok(None),
      Terminal::Aborted(e) => Err(RecvError::Aborted(e.clone())),
      Terminal::Panicked(msg) => Err(RecvError::Panicked(msg.clone())),
    }
  }
}

impl<E> From<RecvError<E>> for Terminal<E> {
  /// Carries an upstream failure into a derived channel. A misuse error has no
  /// failure value of its own and is reported through the panic outcome.
  fn from(err: RecvError<E>) -> Self {
    match err {
      RecvError::Aborted(e) => Terminal::Aborted(e),
      RecvError::Panicked(msg) => Terminal::Panicked(msg),
      RecvError::Busy => Terminal::Panicked(RecvError::<E>::Busy.to_string()),
    }
  }
}

struct PendingPut<T> {
  item: T,
  handoff: PutHandoff<T>,
}

pub(crate) struct RendezvousState<T, E> {
  pending_put: Option<PendingPut<T>>,
  pending_get: Option<GetHandoff<T, E>>,
  terminal: Option<Terminal<E>>,
  /// Waker of a `close`/`abort` waiting for the pending item to be collected.
  drain_waker: Option<Waker>,
}

impl<T, E> RendezvousState<T, E> {
  fn wake_drainer(&mut self) {
    if let Some(waker) = self.drain_waker.take() {
      waker.wake();
    }
  }
}

pub(crate) enum PutStep<T> {
  /// A consumer was waiting; the item went straight to it.
  Delivered,
  Parked(PutHandoff<T>),
}

pub(crate) enum GetStep<T, E> {
  Ready(Delivery<T, E>),
  Parked(GetHandoff<T, E>),
}

pub(crate) enum FinishStep {
  Done,
  /// An unread item is pending; the caller must wait until it is collected.
  Draining,
}

/// The shared owner of the channel state, wrapped in an `Arc` by every handle,
/// future, and producer `Yielder`.
pub(crate) struct RendezvousShared<T, E> {
  state: Mutex<RendezvousState<T, E>>,
  /// Number of live `Channel` handles (the consumer side).
  pub(crate) handles: AtomicUsize,
}

impl<T, E> fmt::Debug for RendezvousShared<T, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.state.lock();
    let terminal = match &state.terminal {
      None => "Open",
      Some(Terminal::Closed) => "Closed",
      Some(Terminal::Aborted(_)) => "Aborted",
      Some(Terminal::Panicked(_)) => "Panicked",
    };
    f.debug_struct("RendezvousShared")
      .field("terminal", &terminal)
      .field("pending_put", &state.pending_put.is_some())
      .field("pending_get", &state.pending_get.is_some())
      .field("handles", &self.handles.load(Ordering::Relaxed))
      .finish()
  }
}

impl<T, E> RendezvousShared<T, E> {
  pub(crate) fn new() -> Self {
    RendezvousShared {
      state: Mutex::new(RendezvousState {
        pending_put: None,
        pending_get: None,
        terminal: None,
        drain_waker: None,
      }),
      handles: AtomicUsize::new(0),
    }
  }

  /// Producer side of the rendezvous. Hands the item to a parked consumer if there is
  /// one, otherwise parks it as the single pending put.
  pub(crate) fn begin_put(&self, item: T) -> Result<PutStep<T>, PutError<T>> {
    let mut state = self.state.lock();

    if state.pending_put.is_some() {
      return Err(PutError::Busy(item));
    }
    if state.terminal.is_some() {
      return Err(PutError::Closed(item));
    }

    if let Some(getter) = state.pending_get.take() {
      let _ = getter.resolve(Ok(Some(item)));
      tracing::trace!("put handed item to a waiting get");
      return Ok(PutStep::Delivered);
    }

    let handoff = Arc::new(Handoff::new());
    state.pending_put = Some(PendingPut {
      item,
      handoff: Arc::clone(&handoff),
    });
    tracing::trace!("put parked until a consumer arrives");
    Ok(PutStep::Parked(handoff))
  }

  /// Removes the pending put if it still belongs to `handoff`. Used when a parked
  /// `PutFuture` is dropped.
  pub(crate) fn withdraw_put(&self, handoff: &PutHandoff<T>) -> bool {
    let mut state = self.state.lock();
    let owned = matches!(&state.pending_put, Some(p) if Arc::ptr_eq(&p.handoff, handoff));
    if !owned {
      return false;
    }
    let withdrawn = state.pending_put.take();
    state.wake_drainer();
    drop(state);
    // The item is dropped outside the lock.
    drop(withdrawn);
    tracing::trace!("parked put withdrawn before it was collected");
    true
  }

  /// Removes the pending get if it still belongs to `handoff`. Used when a parked
  /// `GetFuture` is dropped.
  pub(crate) fn withdraw_get(&self, handoff: &GetHandoff<T, E>) -> bool {
    let mut state = self.state.lock();
    let owned = matches!(&state.pending_get, Some(g) if Arc::ptr_eq(g, handoff));
    if owned {
      state.pending_get = None;
      tracing::trace!("parked get withdrawn before anything arrived");
    }
    owned
  }

  /// Completes once no unread item is pending.
  pub(crate) fn poll_drained(&self, cx: &mut Context<'_>) -> Poll<()> {
    let mut state = self.state.lock();
    if state.pending_put.is_none() {
      return Poll::Ready(());
    }
    state.drain_waker = Some(cx.waker().clone());
    Poll::Pending
  }

  /// Called when the last `Channel` handle is dropped. Nobody can collect a parked
  /// item any more, so it is handed back to its producer and the channel ends.
  pub(crate) fn disconnect(&self) {
    let mut state = self.state.lock();
    if state.terminal.is_none() {
      state.terminal = Some(Terminal::Closed);
      if let Some(getter) = state.pending_get.take() {
        let _ = getter.resolve(Ok(None));
      }
      tracing::debug!("all channel handles dropped; channel closed");
    }
    if let Some(PendingPut { item, handoff }) = state.pending_put.take() {
      let _ = handoff.resolve(Err(item));
      state.wake_drainer();
    }
  }

  pub(crate) fn is_terminated(&self) -> bool {
    self.state.lock().terminal.is_some()
  }

  pub(crate) fn has_pending_put(&self) -> bool {
    self.state.lock().pending_put.is_some()
  }

  pub(crate) fn has_pending_get(&self) -> bool {
    self.state.lock().pending_get.is_some()
  }
}

impl<T, E: Clone> RendezvousShared<T, E> {
  /// Consumer side of the rendezvous. Takes a parked item if there is one, reports the
  /// terminal outcome if the channel has ended, otherwise parks as the single pending get.
  pub(crate) fn begin_get(&self) -> GetStep<T, E> {
    let mut state = self.state.lock();

    if state.pending_get.is_some() {
      return GetStep::Ready(Err(RecvError::Busy));
    }

    if let Some(PendingPut { item, handoff }) = state.pending_put.take() {
      let _ = handoff.resolve(Ok(()));
      state.wake_drainer();
      tracing::trace!("get collected a parked item");
      return GetStep::Ready(Ok(Some(item)));
    }

    if let Some(terminal) = &state.terminal {
      return GetStep::Ready(terminal.delivery());
    }

    let handoff = Arc::new(Handoff::new());
    state.pending_get = Some(Arc::clone(&handoff));
    tracing::trace!("get parked until an item or termination arrives");
    GetStep::Parked(handoff)
  }

  /// Marks the channel terminal. A parked consumer is resolved with the outcome at once.
  ///
  /// Returns the terminal back if the channel had already ended.
  pub(crate) fn finish(&self, terminal: Terminal<E>) -> Result<FinishStep, Terminal<E>> {
    let mut state = self.state.lock();

    if state.terminal.is_some() {
      return Err(terminal);
    }

    let delivery = terminal.delivery();
    tracing::debug!(outcome = ?TerminalKind::of(&terminal), "channel terminated");
    state.terminal = Some(terminal);

    if let Some(getter) = state.pending_get.take() {
      let _ = getter.resolve(delivery);
      return Ok(FinishStep::Done);
    }
    if state.pending_put.is_some() {
      tracing::trace!("termination waiting for the pending item to be read");
      return Ok(FinishStep::Draining);
    }
    Ok(FinishStep::Done)
  }
}

/// Payload-free view of a `Terminal`, for logging.
#[derive(Debug)]
enum TerminalKind {
  Closed,
  Aborted,
  Panicked,
}

impl TerminalKind {
  fn of<E>(terminal: &Terminal<E>) -> Self {
    match terminal {
      Terminal::Closed => TerminalKind::Closed,
      Terminal::Aborted(_) => TerminalKind::Aborted,
      Terminal::Panicked(_) => TerminalKind::Panicked,
    }
  }
}
