// src/producer.rs

//! Adapts a push-style producer routine into a pull-style [`Channel`].
//!
//! A producer routine is an async closure that receives a [`Yielder`] and calls
//! [`Yielder::put`] zero or more times. The adapter creates a channel, spawns the
//! routine as an independent task, and hands the channel back immediately. When the
//! routine finishes the channel is terminated exactly once:
//!
//! - `Ok(())` closes the channel (the consumer sees end-of-sequence);
//! - `Err(e)` aborts it with `e` (the consumer sees `RecvError::Aborted(e)`);
//! - a panic aborts it with `RecvError::Panicked(message)`.
//!
//! # Examples
//!
//! ```
//! use fibre_rendezvous::{produce, Yielder};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let numbers = produce(|y: Yielder<u32, String>| async move {
//!   for n in 1..=3 {
//!     y.put(n).await.map_err(|e| e.to_string())?;
//!   }
//!   Ok(())
//! });
//!
//! assert_eq!(numbers.get().await, Ok(Some(1)));
//! assert_eq!(numbers.get().await, Ok(Some(2)));
//! assert_eq!(numbers.get().await, Ok(Some(3)));
//! assert_eq!(numbers.get().await, Ok(None));
//! # });
//! ```

use crate::channel::{Channel, PutFuture, RendezvousShared, Terminal, Terminate};
use crate::error::BuildError;
use crate::runtime::TaskSpawner;

use futures_util::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::Instrument;

/// The producer's end of an adapter-driven channel. It can only `put`.
///
/// Clones share the same channel; concurrent puts through clones are rejected with
/// `PutError::Busy`. A `Yielder` does not keep the channel open: once every
/// [`Channel`] handle is gone, `put` fails with `PutError::Closed`.
pub struct Yielder<T, E> {
  shared: Arc<RendezvousShared<T, E>>,
}

impl<T, E> Yielder<T, E> {
  /// Emits one item. Completes once the consumer has collected it.
  pub fn put(&self, item: T) -> PutFuture<T, E> {
    PutFuture::new(Arc::clone(&self.shared), item)
  }

  /// Returns `true` if the channel has ended, e.g. because the consumer dropped it.
  pub fn is_closed(&self) -> bool {
    self.shared.is_terminated()
  }
}

impl<T, E> Clone for Yielder<T, E> {
  fn clone(&self) -> Self {
    Yielder {
      shared: Arc::clone(&self.shared),
    }
  }
}

impl<T, E> fmt::Debug for Yielder<T, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Yielder").field("shared", &self.shared).finish()
  }
}

/// A builder for [`Producer`] instances.
#[derive(Default)]
pub struct ProducerBuilder {
  name: Option<String>,
  spawner: Option<Arc<dyn TaskSpawner>>,
}

impl fmt::Debug for ProducerBuilder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ProducerBuilder")
      .field("name", &self.name)
      .field("has_spawner", &self.spawner.is_some())
      .finish()
  }
}

impl ProducerBuilder {
  /// Creates a builder with no name and no spawner.
  pub fn new() -> Self {
    Self::default()
  }

  /// Names the producer. The name is recorded on the tracing span each spawned
  /// routine runs in.
  pub fn name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  /// Sets the spawner used to run producer routines.
  ///
  /// Without one, the current Tokio runtime is used (requires the `tokio` feature).
  pub fn spawner(mut self, spawner: Arc<dyn TaskSpawner>) -> Self {
    self.spawner = Some(spawner);
    self
  }

  /// Builds the producer.
  ///
  /// Fails with `BuildError::SpawnerRequired` if no spawner was set and no Tokio
  /// runtime is available to fall back on.
  pub fn build(self) -> Result<Producer, BuildError> {
    let spawner = match self.spawner {
      Some(spawner) => spawner,
      None => default_spawner()?,
    };
    Ok(Producer {
      name: self.name.map(Arc::from),
      spawner,
    })
  }
}

#[cfg(feature = "tokio")]
fn default_spawner() -> Result<Arc<dyn TaskSpawner>, BuildError> {
  let handle = tokio::runtime::Handle::try_current().map_err(|_| BuildError::SpawnerRequired)?;
  Ok(Arc::new(crate::runtime::TokioSpawner::with_handle(handle)))
}

#[cfg(not(feature = "tokio"))]
fn default_spawner() -> Result<Arc<dyn TaskSpawner>, BuildError> {
  Err(BuildError::SpawnerRequired)
}

/// Spawns producer routines and returns their channels.
#[derive(Clone)]
pub struct Producer {
  name: Option<Arc<str>>,
  spawner: Arc<dyn TaskSpawner>,
}

impl fmt::Debug for Producer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Producer").field("name", &self.name).finish_non_exhaustive()
  }
}

impl Producer {
  /// Returns a [`ProducerBuilder`] for configuring a producer.
  pub fn builder() -> ProducerBuilder {
    ProducerBuilder::new()
  }

  /// A producer that spawns onto the current Tokio runtime.
  ///
  /// # Panics
  ///
  /// Panics if called outside of a Tokio runtime.
  #[cfg(feature = "tokio")]
  pub fn tokio() -> Self {
    Producer {
      name: None,
      spawner: Arc::new(crate::runtime::TokioSpawner::new()),
    }
  }

  /// Starts `routine` as an independent task and returns the channel it feeds.
  ///
  /// The routine's outcome terminates the channel: `Ok(())` closes it, `Err(e)`
  /// aborts it with `e`, a panic aborts it with `RecvError::Panicked`.
  pub fn spawn<T, E, F, Fut>(&self, routine: F) -> Channel<T, E>
  where
    T: Send + 'static,
    E: Clone + Send + 'static,
    F: FnOnce(Yielder<T, E>) -> Fut,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
  {
    self.spawn_with_terminal(move |yielder| routine(yielder).map(|res| res.map_err(Terminal::Aborted)))
  }

  /// Like `spawn`, but the routine reports any terminal outcome. Used by the
  /// sequence helpers to forward upstream panics unchanged.
  pub(crate) fn spawn_with_terminal<T, E, F, Fut>(&self, routine: F) -> Channel<T, E>
  where
    T: Send + 'static,
    E: Clone + Send + 'static,
    F: FnOnce(Yielder<T, E>) -> Fut,
    Fut: Future<Output = Result<(), Terminal<E>>> + Send + 'static,
  {
    let shared = Arc::new(RendezvousShared::new());
    let channel = Channel::from_shared(Arc::clone(&shared));
    let routine = routine(Yielder {
      shared: Arc::clone(&shared),
    });

    let span = tracing::debug_span!("producer", name = self.name.as_deref().unwrap_or("anonymous"));
    self.spawner.spawn(Box::pin(drive(shared, routine).instrument(span)));
    channel
  }
}

/// Starts `routine` on the current Tokio runtime and returns the channel it feeds.
///
/// Shorthand for [`Producer::tokio`] followed by [`Producer::spawn`].
///
/// # Panics
///
/// Panics if called outside of a Tokio runtime.
#[cfg(feature = "tokio")]
pub fn produce<T, E, F, Fut>(routine: F) -> Channel<T, E>
where
  T: Send + 'static,
  E: Clone + Send + 'static,
  F: FnOnce(Yielder<T, E>) -> Fut,
  Fut: Future<Output = Result<(), E>> + Send + 'static,
{
  Producer::tokio().spawn(routine)
}

/// Runs the routine to completion and terminates the channel exactly once.
async fn drive<T, E, Fut>(shared: Arc<RendezvousShared<T, E>>, routine: Fut)
where
  E: Clone,
  Fut: Future<Output = Result<(), Terminal<E>>>,
{
  tracing::debug!("producer routine started");
  let terminal = match AssertUnwindSafe(routine).catch_unwind().await {
    Ok(Ok(())) => Terminal::Closed,
    Ok(Err(terminal)) => terminal,
    Err(payload) => {
      let message = panic_message(payload.as_ref());
      tracing::debug!(%message, "producer routine panicked");
      Terminal::Panicked(message)
    }
  };

  match Terminate::new(shared, terminal).await {
    Ok(()) => tracing::debug!("producer routine finished; channel terminated"),
    Err(_) => tracing::debug!("channel was already terminated; producer outcome discarded"),
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(s) = payload.downcast_ref::<&str>() {
    (*s).to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "Box<dyn Any>".to_string()
  }
}
