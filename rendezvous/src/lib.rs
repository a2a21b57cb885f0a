#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

//! A capacity-one rendezvous channel for bridging push-style producers with
//! pull-style consumers.
//!
//! A [`Channel`] pairs exactly one `put` with exactly one `get`; nothing is
//! buffered. Producers end a sequence with [`Channel::close`] or fail it with
//! [`Channel::abort`], and consumers observe end-of-sequence or the failure on
//! their next pull. The [`producer`] module turns an async routine that pushes
//! items through a [`Yielder`] into such a channel, and [`seq`] offers helpers
//! that operate on the pull side.

pub mod error;

pub mod channel;
pub mod producer;
pub mod runtime;
pub mod seq;

// Internal utilities - not part of public API but exposed for crate use
mod internal;

pub use channel::{AbortFuture, Channel, ChannelStream, CloseFuture, GetFuture, PutFuture};
pub use error::{AbortError, BuildError, CloseError, PutError, RecvError, ReduceError};
#[cfg(feature = "tokio")]
pub use producer::produce;
pub use producer::{Producer, ProducerBuilder, Yielder};
#[cfg(feature = "tokio")]
pub use runtime::TokioSpawner;
pub use runtime::TaskSpawner;
