//! Cooperative-concurrency channels and multi-way select for single-threaded
//! async task sets.
//!
//! This crate has nothing to say about threads: every type here is `!Send`
//! by construction (built on `Rc`/`RefCell`, not `Arc`/atomics) because it
//! targets task sets that are all polled by the same executor on the same
//! thread, cooperatively yielding to each other at `.await` points. Within
//! that world it provides four channel shapes and a `select` that can race
//! any mix of them:
//!
//! - [`unicast`](channel::rendezvous::unicast): rendezvous, one recipient
//!   per message.
//! - [`broadcast`](channel::rendezvous::broadcast): rendezvous, fanned out
//!   to every receiver parked at send time.
//! - [`default_channel`](channel::default::default_channel): a latch, send
//!   never blocks, receive never consumes.
//! - [`buffered`](channel::buffered::buffered): backed by a [`Storage`]
//!   discipline (FIFO, LIFO, or a priority heap), with an optional capacity.
//!
//! # Close
//!
//! Every variant can be closed explicitly via its `close()` method, and
//! closes itself automatically once its last handle is dropped. Closing
//! prevents further sends; messages already buffered or in flight can still
//! be received. `close()` is idempotent: the first call returns `true`, any
//! further call returns `false`.
//!
//! # Select
//!
//! [`select`](select::select) races a mix of send and receive candidates,
//! built with [`select::send`]/[`select::recv`], and reports the winner's
//! index rather than a dynamically-typed handle. [`select::select_receive`]
//! wraps this for the common case of racing several receive-only channels
//! of the same message type.
//!
//! # Example
//!
//! ```
//! use cochan::channel::buffered::fifo;
//! use futures_executor::block_on;
//!
//! let ch = fifo(Some(1));
//!
//! block_on(async {
//!     ch.send(42).await.unwrap();
//!     assert_eq!(ch.receive().await, Ok(42));
//! });
//! ```
#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]

pub mod channel;
pub mod error;
pub mod select;
pub mod storage;
mod wait_group;

pub use error::{
    ChannelError, ChannelOperation, Closed, RecvError, SendError, TryRecvError, TrySendError,
};
pub use storage::{Fifo, Lifo, Priority, Storage};
