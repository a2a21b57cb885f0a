// src/channel/mod.rs

//! A capacity-one rendezvous channel between one producer and one consumer.
//!
//! The channel holds no buffer: an item lives in it only between a `put` and the
//! `get` that collects it. Each side may have at most one call in flight; a second
//! concurrent call is rejected with a misuse error (`PutError::Busy` /
//! `RecvError::Busy`) rather than queued.
//!
//! ## Behavior
//!
//! - **Fast Paths**: A `put` that finds a waiting `get` (or a `get` that finds a
//!   waiting `put`) completes on its first poll without suspending.
//! - **Clean Shutdown**: `close` ends the sequence. A waiting consumer observes
//!   end-of-sequence at once. If an item is still unread, `close` waits until it
//!   has been collected, so no item is dropped by shutdown.
//! - **Failure Propagation**: `abort(e)` ends the sequence with `e`. The consumer
//!   observes `e` on the `get` that sees the termination and on every later `get`.
//! - **Not Restartable**: Once terminal, a channel stays terminal, and `put`,
//!   `close` and `abort` are rejected.
//!
//! # Examples
//!
//! ```
//! use fibre_rendezvous::Channel;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let channel = Channel::<&str, String>::new();
//! let producer = channel.clone();
//!
//! let (put, got) = tokio::join!(
//!   async move { producer.put("foo").await },
//!   channel.get(),
//! );
//! assert!(put.is_ok());
//! assert_eq!(got, Ok(Some("foo")));
//!
//! channel.close().await.unwrap();
//! assert_eq!(channel.get().await, Ok(None));
//! # });
//! ```

mod core;
mod futures;
mod stream;


pub(crate) use self::core::{RendezvousShared, Terminal};
pub(crate) use self::futures::Terminate;
pub use self::futures::{AbortFuture, CloseFuture, GetFuture, PutFuture};
pub use self::stream::ChannelStream;

use crate::error::RecvError;

use std::convert::Infallible;
use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// A handle to a rendezvous channel.
///
/// Handles are cheap to clone and all refer to the same channel. When the last handle
/// is dropped the channel is closed and a parked producer gets its item back as
/// `PutError::Closed`.
///
/// `E` is the failure type carried by [`abort`](Channel::abort). It must be `Clone` for
/// the consuming operations because every `get` after an abort yields the failure again.
/// Wrap it in an `Arc` to hand out the identical instance every time.
pub struct Channel<T, E = Infallible> {
  shared: Arc<RendezvousShared<T, E>>,
}

impl<T, E> Channel<T, E> {
  /// Creates a new, open channel.
  pub fn new() -> Self {
    Self::from_shared(Arc::new(RendezvousShared::new()))
  }

  pub(crate) fn from_shared(shared: Arc<RendezvousShared<T, E>>) -> Self {
    shared.handles.fetch_add(1, Ordering::Relaxed);
    Channel { shared }
  }

  /// Offers `item` to the consumer.
  ///
  /// The returned future completes once a `get` has collected the item. It fails with
  /// `PutError::Busy` if another `put` is outstanding and with `PutError::Closed` if the
  /// channel has ended; either way the item is returned inside the error.
  pub fn put(&self, item: T) -> PutFuture<T, E> {
    PutFuture::new(Arc::clone(&self.shared), item)
  }

  /// Returns `true` once the channel has been closed or aborted.
  ///
  /// A terminated channel may still hold one unread item.
  pub fn is_terminated(&self) -> bool {
    self.shared.is_terminated()
  }

  /// Returns `true` if a producer is parked with an uncollected item.
  pub fn has_pending_put(&self) -> bool {
    self.shared.has_pending_put()
  }

  /// Returns `true` if a consumer is parked waiting for an item.
  pub fn has_pending_get(&self) -> bool {
    self.shared.has_pending_get()
  }

  /// Converts this handle into a [`Stream`](futures_core::Stream) of items.
  pub fn into_stream(self) -> ChannelStream<T, E> {
    ChannelStream::new(self)
  }
}

impl<T, E: Clone> Channel<T, E> {
  /// Pulls the next item.
  ///
  /// Resolves to `Ok(Some(item))`, to `Ok(None)` once the channel was closed, or to
  /// `Err(RecvError::Aborted(e))` once it was aborted. Both terminal outcomes repeat on
  /// every later call. Fails with `RecvError::Busy` if another `get` is outstanding.
  pub fn get(&self) -> GetFuture<T, E> {
    GetFuture::new(Arc::clone(&self.shared))
  }

  /// Pulls the next item, substituting `default` for end-of-sequence.
  pub async fn get_or(&self, default: T) -> Result<T, RecvError<E>> {
    Ok(self.get().await?.unwrap_or(default))
  }

  /// Closes the channel.
  ///
  /// A waiting consumer is woken with end-of-sequence. If an item is still unread the
  /// future completes only after it has been collected. Fails with `CloseError` if the
  /// channel has already ended.
  pub fn close(&self) -> CloseFuture<T, E> {
    CloseFuture::new(Arc::clone(&self.shared))
  }

  /// Aborts the channel with `failure`.
  ///
  /// Same as [`close`](Channel::close), except that consumers observe `failure`
  /// instead of end-of-sequence. If the channel has already ended the failure is
  /// returned inside `AbortError`.
  pub fn abort(&self, failure: E) -> AbortFuture<T, E> {
    AbortFuture::new(Arc::clone(&self.shared), failure)
  }
}

impl<T, E> Default for Channel<T, E> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T, E> Clone for Channel<T, E> {
  fn clone(&self) -> Self {
    Self::from_shared(Arc::clone(&self.shared))
  }
}

impl<T, E> Drop for Channel<T, E> {
  fn drop(&mut self) {
    if self.shared.handles.fetch_sub(1, Ordering::AcqRel) == 1 {
      self.shared.disconnect();
    }
  }
}

impl<T, E> fmt::Debug for Channel<T, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Channel").field("shared", &self.shared).finish()
  }
}
