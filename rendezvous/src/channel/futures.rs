// src/channel/futures.rs
//! Futures returned by the channel operations.
//!
//! Each future is lazy: the operation takes effect on its first poll. A parked
//! `PutFuture` or `GetFuture` that is dropped withdraws its ticket from the channel.

use super::core::{FinishStep, GetHandoff, GetStep, PutHandoff, PutStep, RendezvousShared, Terminal};
use crate::error::{AbortError, CloseError, PutError, RecvError};

use std::fmt;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

// --- PutFuture ---

enum PutState<T> {
  Init(T),
  Parked(PutHandoff<T>),
  Done,
}

/// A future that completes once the item has been collected by a `get`.
///
/// Completes immediately if a consumer was already waiting, or with an error if the
/// put was rejected.
#[must_use = "futures do nothing unless you .await or poll them"]
pub struct PutFuture<T, E> {
  shared: Arc<RendezvousShared<T, E>>,
  state: PutState<T>,
}

impl<T, E> PutFuture<T, E> {
  pub(crate) fn new(shared: Arc<RendezvousShared<T, E>>, item: T) -> Self {
    PutFuture {
      shared,
      state: PutState::Init(item),
    }
  }
}

// The item is never pinned; it is only moved in and out of the state.
impl<T, E> Unpin for PutFuture<T, E> {}

impl<T, E> fmt::Debug for PutFuture<T, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = match self.state {
      PutState::Init(_) => "Init",
      PutState::Parked(_) => "Parked",
      PutState::Done => "Done",
    };
    f.debug_struct("PutFuture").field("state", &state).finish()
  }
}

impl<T, E> Future for PutFuture<T, E> {
  type Output = Result<(), PutError<T>>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();
    loop {
      match mem::replace(&mut this.state, PutState::Done) {
        PutState::Init(item) => match this.shared.begin_put(item) {
          Ok(PutStep::Delivered) => return Poll::Ready(Ok(())),
          Ok(PutStep::Parked(handoff)) => this.state = PutState::Parked(handoff),
          Err(err) => return Poll::Ready(Err(err)),
        },
        PutState::Parked(handoff) => {
          return match handoff.poll_take(cx) {
            Poll::Pending => {
              this.state = PutState::Parked(handoff);
              Poll::Pending
            }
            Poll::Ready(Some(Ok(()))) => Poll::Ready(Ok(())),
            Poll::Ready(Some(Err(item))) => Poll::Ready(Err(PutError::Closed(item))),
            Poll::Ready(None) => panic!("PutFuture polled after completion"),
          };
        }
        PutState::Done => panic!("PutFuture polled after completion"),
      }
    }
  }
}

impl<T, E> Drop for PutFuture<T, E> {
  fn drop(&mut self) {
    if let PutState::Parked(handoff) = &self.state {
      self.shared.withdraw_put(handoff);
    }
  }
}

// --- GetFuture ---

enum GetState<T, E> {
  Init,
  Parked(GetHandoff<T, E>),
  Done,
}

/// A future that resolves to the next item (`Ok(Some)`), end-of-sequence (`Ok(None)`),
/// or the channel's failure.
#[must_use = "futures do nothing unless you .await or poll them"]
pub struct GetFuture<T, E> {
  shared: Arc<RendezvousShared<T, E>>,
  state: GetState<T, E>,
}

impl<T, E> GetFuture<T, E> {
  pub(crate) fn new(shared: Arc<RendezvousShared<T, E>>) -> Self {
    GetFuture {
      shared,
      state: GetState::Init,
    }
  }
}

impl<T, E> Unpin for GetFuture<T, E> {}

impl<T, E> fmt::Debug for GetFuture<T, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = match self.state {
      GetState::Init => "Init",
      GetState::Parked(_) => "Parked",
      GetState::Done => "Done",
    };
    f.debug_struct("GetFuture").field("state", &state).finish()
  }
}

impl<T, E: Clone> Future for GetFuture<T, E> {
  type Output = Result<Option<T>, RecvError<E>>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();
    loop {
      match mem::replace(&mut this.state, GetState::Done) {
        GetState::Init => match this.shared.begin_get() {
          GetStep::Ready(delivery) => return Poll::Ready(delivery),
          GetStep::Parked(handoff) => this.state = GetState::Parked(handoff),
        },
        GetState::Parked(handoff) => {
          return match handoff.poll_take(cx) {
            Poll::Pending => {
              this.state = GetState::Parked(handoff);
              Poll::Pending
            }
            Poll::Ready(Some(delivery)) => Poll::Ready(delivery),
            Poll::Ready(None) => panic!("GetFuture polled after completion"),
          };
        }
        GetState::Done => panic!("GetFuture polled after completion"),
      }
    }
  }
}

impl<T, E> Drop for GetFuture<T, E> {
  fn drop(&mut self) {
    if let GetState::Parked(handoff) = &self.state {
      if !self.shared.withdraw_get(handoff) {
        // Resolved between the last poll and the drop.
        if let Some(Ok(Some(_))) = handoff.try_take() {
          tracing::warn!("get cancelled after an item was handed to it; the item is dropped");
        }
      }
    }
  }
}

// --- CloseFuture / AbortFuture ---

enum TerminateState<E> {
  Init(Terminal<E>),
  Draining,
  Done,
}

/// Shared state machine behind `close`, `abort` and the producer's panic path.
pub(crate) struct Terminate<T, E> {
  shared: Arc<RendezvousShared<T, E>>,
  state: TerminateState<E>,
}

impl<T, E> Terminate<T, E> {
  pub(crate) fn new(shared: Arc<RendezvousShared<T, E>>, terminal: Terminal<E>) -> Self {
    Terminate {
      shared,
      state: TerminateState::Init(terminal),
    }
  }
}

impl<T, E> Unpin for Terminate<T, E> {}

impl<T, E: Clone> Future for Terminate<T, E> {
  /// On rejection the terminal outcome is handed back.
  type Output = Result<(), Terminal<E>>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();
    loop {
      match mem::replace(&mut this.state, TerminateState::Done) {
        TerminateState::Init(terminal) => match this.shared.finish(terminal) {
          Ok(FinishStep::Done) => return Poll::Ready(Ok(())),
          Ok(FinishStep::Draining) => this.state = TerminateState::Draining,
          Err(rejected) => return Poll::Ready(Err(rejected)),
        },
        TerminateState::Draining => {
          if this.shared.poll_drained(cx).is_ready() {
            return Poll::Ready(Ok(()));
          }
          this.state = TerminateState::Draining;
          return Poll::Pending;
        }
        TerminateState::Done => panic!("termination future polled after completion"),
      }
    }
  }
}

/// A future that closes the channel. If an unread item is pending, it completes only
/// after that item has been collected.
#[must_use = "futures do nothing unless you .await or poll them"]
pub struct CloseFuture<T, E> {
  inner: Terminate<T, E>,
}

impl<T, E> CloseFuture<T, E> {
  pub(crate) fn new(shared: Arc<RendezvousShared<T, E>>) -> Self {
    CloseFuture {
      inner: Terminate::new(shared, Terminal::Closed),
    }
  }
}

impl<T, E> fmt::Debug for CloseFuture<T, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CloseFuture").finish_non_exhaustive()
  }
}

impl<T, E: Clone> Future for CloseFuture<T, E> {
  type Output = Result<(), CloseError>;

  fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    Pin::new(&mut self.inner).poll(cx).map_err(|_| CloseError)
  }
}

/// A future that aborts the channel with a failure. If an unread item is pending, it
/// completes only after that item has been collected.
#[must_use = "futures do nothing unless you .await or poll them"]
pub struct AbortFuture<T, E> {
  inner: Terminate<T, E>,
}

impl<T, E> AbortFuture<T, E> {
  pub(crate) fn new(shared: Arc<RendezvousShared<T, E>>, failure: E) -> Self {
    AbortFuture {
      inner: Terminate::new(shared, Terminal::Aborted(failure)),
    }
  }
}

impl<T, E> fmt::Debug for AbortFuture<T, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AbortFuture").finish_non_exhaustive()
  }
}

impl<T, E: Clone> Future for AbortFuture<T, E> {
  type Output = Result<(), AbortError<E>>;

  fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    Pin::new(&mut self.inner).poll(cx).map_err(|rejected| match rejected {
      Terminal::Aborted(failure) => AbortError(failure),
      _ => unreachable!("abort only submits an aborted outcome"),
    })
  }
}
