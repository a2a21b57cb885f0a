//! A single-assignment, single-waiter handoff signal.
//!
//! A `Handoff` is created by the side that is about to suspend (a parked `put`
//! or `get`), registered in the channel state, and resolved exactly once by the
//! side that completes the rendezvous. The suspended future polls it until the
//! value arrives.

use parking_lot::Mutex;
use std::fmt;
use std::task::{Context, Poll, Waker};

enum Slot<V> {
  /// Not yet resolved. Holds the waker of the parked future, if it has polled.
  Waiting(Option<Waker>),
  Resolved(V),
  /// The value was taken by the waiter. Terminal.
  Taken,
}

pub(crate) struct Handoff<V> {
  slot: Mutex<Slot<V>>,
}

impl<V> fmt::Debug for Handoff<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = match &*self.slot.lock() {
      Slot::Waiting(_) => "Waiting",
      Slot::Resolved(_) => "Resolved",
      Slot::Taken => "Taken",
    };
    f.debug_struct("Handoff").field("state", &state).finish()
  }
}

impl<V> Handoff<V> {
  pub(crate) fn new() -> Self {
    Handoff {
      slot: Mutex::new(Slot::Waiting(None)),
    }
  }

  /// Resolves the handoff and wakes the waiter.
  ///
  /// Returns the value back if the handoff was already resolved; a handoff is
  /// assigned at most once.
  pub(crate) fn resolve(&self, value: V) -> Result<(), V> {
    let waker = {
      let mut slot = self.slot.lock();
      match std::mem::replace(&mut *slot, Slot::Taken) {
        Slot::Waiting(waker) => {
          *slot = Slot::Resolved(value);
          waker
        }
        other => {
          *slot = other;
          return Err(value);
        }
      }
    };
    if let Some(waker) = waker {
      waker.wake();
    }
    Ok(())
  }

  /// Polls for the resolved value.
  ///
  /// Yields `Ready(None)` if the value was already taken by an earlier poll.
  pub(crate) fn poll_take(&self, cx: &mut Context<'_>) -> Poll<Option<V>> {
    let mut slot = self.slot.lock();
    match std::mem::replace(&mut *slot, Slot::Taken) {
      Slot::Waiting(waker) => {
        let waker = match waker {
          Some(w) if w.will_wake(cx.waker()) => w,
          _ => cx.waker().clone(),
        };
        *slot = Slot::Waiting(Some(waker));
        Poll::Pending
      }
      Slot::Resolved(value) => Poll::Ready(Some(value)),
      Slot::Taken => Poll::Ready(None),
    }
  }

  /// Takes the value without waiting, if it has been resolved and not yet taken.
  pub(crate) fn try_take(&self) -> Option<V> {
    let mut slot = self.slot.lock();
    match std::mem::replace(&mut *slot, Slot::Taken) {
      Slot::Resolved(value) => Some(value),
      other => {
        *slot = other;
        None
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use futures_util::task::noop_waker;

  #[test]
  fn resolve_then_take() {
    let handoff = Handoff::new();
    let waker = noop_waker();
    let mut cx = Context::from_waker(&waker);

    assert!(handoff.poll_take(&mut cx).is_pending());
    assert_eq!(handoff.resolve(7), Ok(()));
    assert_eq!(handoff.poll_take(&mut cx), Poll::Ready(Some(7)));
    assert_eq!(handoff.poll_take(&mut cx), Poll::Ready(None));
  }

  #[test]
  fn second_resolve_is_rejected() {
    let handoff = Handoff::new();
    assert_eq!(handoff.resolve("first"), Ok(()));
    assert_eq!(handoff.resolve("second"), Err("second"));
    assert_eq!(handoff.try_take(), Some("first"));
    assert_eq!(handoff.resolve("third"), Err("third"));
  }

  #[test]
  fn try_take_before_resolve_leaves_it_waiting() {
    let handoff = Handoff::<u8>::new();
    assert_eq!(handoff.try_take(), None);
    assert_eq!(handoff.resolve(1), Ok(()));
    assert_eq!(handoff.try_take(), Some(1));
  }
}
