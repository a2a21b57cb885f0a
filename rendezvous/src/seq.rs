// src/seq.rs

//! Helpers over pull-style sequences.
//!
//! Every helper consumes a stream of `Result<T, RecvError<E>>`, which is what
//! [`ChannelStream`](crate::ChannelStream) yields. Plain streams can be lifted with
//! `stream.map(Ok)`. The transforming helpers are themselves producer routines: they
//! return a new [`Channel`] fed by a spawned task, and an upstream failure aborts the
//! derived channel with the same failure.
//!
//! If the consumer of a derived channel drops it, the helper stops pulling from
//! upstream.

use crate::error::{RecvError, ReduceError};
#[cfg(feature = "tokio")]
use crate::{channel::Terminal, Channel, Producer, Yielder};

use futures_core::Stream;
use futures_util::{pin_mut, StreamExt};
use std::future::Future;

/// Applies the async function `f` to every item.
///
/// # Panics
///
/// Panics if called outside of a Tokio runtime.
#[cfg(feature = "tokio")]
pub fn map<S, T, U, E, F, Fut>(stream: S, mut f: F) -> Channel<U, E>
where
  S: Stream<Item = Result<T, RecvError<E>>> + Send + 'static,
  T: Send + 'static,
  U: Send + 'static,
  E: Clone + Send + 'static,
  F: FnMut(T) -> Fut + Send + 'static,
  Fut: Future<Output = U> + Send,
{
  Producer::tokio().spawn_with_terminal(move |y: Yielder<U, E>| async move {
    pin_mut!(stream);
    while let Some(next) = stream.next().await {
      let mapped = f(next?).await;
      if y.put(mapped).await.is_err() {
        tracing::debug!("map: downstream channel closed; stopping");
        break;
      }
    }
    Ok::<(), Terminal<E>>(())
  })
}

/// Keeps the items for which the async predicate holds.
///
/// # Panics
///
/// Panics if called outside of a Tokio runtime.
#[cfg(feature = "tokio")]
pub fn filter<S, T, E, P, Fut>(stream: S, mut predicate: P) -> Channel<T, E>
where
  S: Stream<Item = Result<T, RecvError<E>>> + Send + 'static,
  T: Send + 'static,
  E: Clone + Send + 'static,
  P: FnMut(&T) -> Fut + Send + 'static,
  Fut: Future<Output = bool> + Send,
{
  Producer::tokio().spawn_with_terminal(move |y: Yielder<T, E>| async move {
    pin_mut!(stream);
    while let Some(next) = stream.next().await {
      let item = next?;
      if !predicate(&item).await {
        continue;
      }
      if y.put(item).await.is_err() {
        tracing::debug!("filter: downstream channel closed; stopping");
        break;
      }
    }
    Ok::<(), Terminal<E>>(())
  })
}

/// Calls `f` with a [`Yielder`] for every item; `f` may emit any number of items.
///
/// An `Err(e)` from `f` aborts the derived channel with `e`.
///
/// # Panics
///
/// Panics if called outside of a Tokio runtime.
#[cfg(feature = "tokio")]
pub fn for_each_yield<S, T, U, E, F, Fut>(stream: S, mut f: F) -> Channel<U, E>
where
  S: Stream<Item = Result<T, RecvError<E>>> + Send + 'static,
  T: Send + 'static,
  U: Send + 'static,
  E: Clone + Send + 'static,
  F: FnMut(Yielder<U, E>, T) -> Fut + Send + 'static,
  Fut: Future<Output = Result<(), E>> + Send,
{
  Producer::tokio().spawn_with_terminal(move |y: Yielder<U, E>| async move {
    pin_mut!(stream);
    while let Some(next) = stream.next().await {
      if y.is_closed() {
        break;
      }
      f(y.clone(), next?).await.map_err(Terminal::Aborted)?;
    }
    Ok::<(), Terminal<E>>(())
  })
}

/// Folds the sequence with the async function `f`.
///
/// Without an `initial` value the first item seeds the accumulator, and an empty
/// sequence is an error.
pub async fn reduce<S, T, E, F, Fut>(stream: S, mut f: F, initial: Option<T>) -> Result<T, ReduceError<E>>
where
  S: Stream<Item = Result<T, RecvError<E>>>,
  F: FnMut(T, T) -> Fut,
  Fut: Future<Output = T>,
{
  pin_mut!(stream);
  let mut acc = match initial {
    Some(value) => value,
    None => match stream.next().await {
      Some(first) => first?,
      None => return Err(ReduceError::Empty),
    },
  };
  while let Some(next) = stream.next().await {
    acc = f(acc, next?).await;
  }
  Ok(acc)
}
