// src/channel/stream.rs

use super::futures::GetFuture;
use super::Channel;
use crate::error::RecvError;

use futures_core::stream::{FusedStream, Stream};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// The pull-style view of a [`Channel`], created by [`Channel::into_stream`].
///
/// Yields `Ok(item)` for every item, then ends. If the channel was aborted the
/// failure is yielded once as `Err` and the stream ends after it. A misuse error
/// (`RecvError::Busy`) does not end the stream.
pub struct ChannelStream<T, E> {
  channel: Channel<T, E>,
  inflight: Option<GetFuture<T, E>>,
  finished: bool,
}

impl<T, E> ChannelStream<T, E> {
  pub(crate) fn new(channel: Channel<T, E>) -> Self {
    ChannelStream {
      channel,
      inflight: None,
      finished: false,
    }
  }

  /// Returns the underlying channel, dropping any in-flight `get`.
  pub fn into_inner(self) -> Channel<T, E> {
    self.channel
  }
}

impl<T, E> Unpin for ChannelStream<T, E> {}

impl<T, E> fmt::Debug for ChannelStream<T, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ChannelStream")
      .field("channel", &self.channel)
      .field("inflight", &self.inflight.is_some())
      .field("finished", &self.finished)
      .finish()
  }
}

impl<T, E: Clone> Stream for ChannelStream<T, E> {
  type Item = Result<T, RecvError<E>>;

  fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    let this = self.get_mut();
    if this.finished {
      return Poll::Ready(None);
    }

    let channel = &this.channel;
    let get = this.inflight.get_or_insert_with(|| channel.get());
    let delivery = match Pin::new(get).poll(cx) {
      Poll::Pending => return Poll::Pending,
      Poll::Ready(delivery) => delivery,
    };
    this.inflight = None;

    match delivery {
      Ok(Some(item)) => Poll::Ready(Some(Ok(item))),
      Ok(None) => {
        this.finished = true;
        Poll::Ready(None)
      }
      Err(RecvError::Busy) => Poll::Ready(Some(Err(RecvError::Busy))),
      Err(err) => {
        this.finished = true;
        Poll::Ready(Some(Err(err)))
      }
    }
  }
}

impl<T, E: Clone> FusedStream for ChannelStream<T, E> {
  fn is_terminated(&self) -> bool {
    self.finished
  }
}
