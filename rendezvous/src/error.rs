// src/error.rs

//! Error types returned by channel, producer and sequence operations.

use core::fmt;

use thiserror::Error;

/// Error returned by [`put`](crate::Channel::put). The rejected item is always
/// handed back to the caller.
#[derive(Error, PartialEq, Eq, Clone)]
pub enum PutError<T> {
  /// Another `put` is still outstanding on this channel. Only one producer-side
  /// call may be in flight at a time.
  #[error("channel put() already in progress")]
  Busy(T),
  /// The channel was already closed or aborted, or every consumer handle was dropped.
  #[error("cannot put() to a closed channel")]
  Closed(T),
}

impl<T> PutError<T> {
  /// Consumes the error, returning the item that could not be put.
  #[inline]
  pub fn into_inner(self) -> T {
    match self {
      PutError::Busy(v) | PutError::Closed(v) => v,
    }
  }

  /// Returns `true` if this is a misuse error (concurrent `put`).
  pub fn is_busy(&self) -> bool {
    matches!(self, PutError::Busy(_))
  }
}

impl<T> fmt::Debug for PutError<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PutError::Busy(_) => write!(f, "PutError::Busy(..)"),
      PutError::Closed(_) => write!(f, "PutError::Closed(..)"),
    }
  }
}

/// Error returned by [`get`](crate::Channel::get) and yielded by
/// [`ChannelStream`](crate::ChannelStream).
///
/// End-of-sequence is not an error; it is reported as `Ok(None)`.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum RecvError<E> {
  /// Another `get` is still outstanding on this channel.
  #[error("channel get() already in progress")]
  Busy,
  /// The channel was aborted with this failure. Every later `get` yields it again.
  #[error("channel aborted by producer")]
  Aborted(E),
  /// The routine driving the channel panicked. Carries the panic message.
  #[error("producer panicked: {0}")]
  Panicked(String),
}

impl<E> RecvError<E> {
  /// Returns the propagated failure, if this error carries one.
  pub fn into_failure(self) -> Option<E> {
    match self {
      RecvError::Aborted(e) => Some(e),
      _ => None,
    }
  }
}

/// Error returned when closing a channel that is already closed or aborted.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
#[error("channel is already closed")]
pub struct CloseError;

/// Error returned when aborting a channel that is already closed or aborted.
/// The failure that could not be delivered is handed back.
#[derive(Error, PartialEq, Eq, Clone)]
#[error("channel is already closed")]
pub struct AbortError<E>(pub E);

impl<E> AbortError<E> {
  /// Consumes the error, returning the undelivered failure.
  #[inline]
  pub fn into_inner(self) -> E {
    self.0
  }
}

impl<E> fmt::Debug for AbortError<E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "AbortError(..)")
  }
}

/// Errors that can occur when building a [`Producer`](crate::Producer).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
  /// No `TaskSpawner` was configured and there is no Tokio runtime to fall back on,
  /// either because the `tokio` feature is disabled or because none is running.
  #[error("a producer requires a task spawner or a running Tokio runtime")]
  SpawnerRequired,
}

/// Error returned by [`seq::reduce`](crate::seq::reduce).
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum ReduceError<E> {
  /// The sequence was empty and no initial value was supplied.
  #[error("reduce() of empty sequence with no initial value")]
  Empty,
  /// The sequence ended with an error.
  #[error("sequence failed during reduce(): {0}")]
  Upstream(RecvError<E>),
}

impl<E> From<RecvError<E>> for ReduceError<E> {
  fn from(err: RecvError<E>) -> Self {
    ReduceError::Upstream(err)
  }
}
