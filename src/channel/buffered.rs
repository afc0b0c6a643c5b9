//! A channel backed by a [`Storage`] discipline.
//!
//! `maxsize` controls buffering: `None` is unbounded, `Some(0)` degenerates
//! to a rendezvous (send only commits once a receiver is parked, matching
//! [`UnicastChannel`](crate::channel::UnicastChannel)'s handoff but through
//! the chosen storage discipline), and `Some(n)` caps the backlog at `n`
//! messages.

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::channel::{
    generic_try_receive, generic_try_send, CloseGate, ReceiveFuture, RecvCap, SendCap, SendFuture,
};
use crate::error::{Closed, RecvError, SendError, TryRecvError, TrySendError};
use crate::storage::{Fifo, Storage};
use crate::wait_group::{Waiter, WaitGroup};

struct Inner<M, S> {
    storage: RefCell<S>,
    maxsize: Option<usize>,
    senders: RefCell<WaitGroup<Closed>>,
    receivers: RefCell<WaitGroup<Closed>>,
    gate: CloseGate,
    _marker: PhantomData<M>,
}

impl<M, S: Storage<M>> Inner<M, S> {
    fn ready_to_send(&self) -> Result<bool, Closed> {
        if self.gate.is_closed() {
            return Err(Closed);
        }
        let storage = self.storage.borrow();
        Ok(match self.maxsize {
            None => true,
            Some(0) => storage.is_empty() && !self.receivers.borrow().is_empty(),
            Some(n) => storage.len() < n,
        })
    }

    fn commit_send(&self, msg: M) {
        self.storage.borrow_mut().put(msg);
        self.receivers.borrow_mut().wake_next();
    }

    fn wait_send(&self) -> Waiter<Closed> {
        self.senders.borrow_mut().wait()
    }

    fn ready_to_receive(&self) -> Result<bool, Closed> {
        if !self.storage.borrow().is_empty() {
            return Ok(true);
        }
        if self.gate.is_closed() {
            return Err(Closed);
        }
        Ok(false)
    }

    fn commit_receive(&self) -> M {
        let msg = self.storage.borrow_mut().get();
        self.senders.borrow_mut().wake_next();
        msg
    }

    fn wait_receive(&self) -> Waiter<Closed> {
        let waiter = self.receivers.borrow_mut().wait();
        if self.maxsize == Some(0) {
            self.senders.borrow_mut().wake_next();
        }
        waiter
    }

    fn close(&self) -> bool {
        if !self.gate.close() {
            return false;
        }
        log::debug!(
            "buffered channel closed; {} message(s) still buffered",
            self.storage.borrow().len()
        );
        self.senders.borrow_mut().abort(Closed);
        self.receivers.borrow_mut().abort(Closed);
        true
    }
}

/// A channel that holds messages in a [`Storage`] discipline between `send`
/// and `receive`. `S` defaults to [`Fifo`] (plain FIFO queueing).
pub struct BufferedChannel<M, S: Storage<M> = Fifo<M>> {
    inner: Rc<Inner<M, S>>,
}

impl<M, S: Storage<M>> BufferedChannel<M, S> {
    fn new(maxsize: Option<usize>, storage: S) -> Self {
        BufferedChannel {
            inner: Rc::new(Inner {
                storage: RefCell::new(storage),
                maxsize,
                senders: RefCell::new(WaitGroup::new()),
                receivers: RefCell::new(WaitGroup::new()),
                gate: CloseGate::new(),
                _marker: PhantomData,
            }),
        }
    }

    /// Sends a message, waiting if the channel is at capacity.
    pub async fn send(&self, msg: M) -> Result<(), SendError<M>> {
        SendFuture::new(self, msg).await
    }

    /// Sends a message only if there is room for it right now.
    pub fn send_nowait(&self, msg: M) -> Result<(), TrySendError<M>> {
        generic_try_send(self, msg)
    }

    /// Receives a message, waiting if none is currently buffered.
    pub async fn receive(&self) -> Result<M, RecvError> {
        ReceiveFuture::new(self).await
    }

    /// Receives a message only if one is already buffered.
    pub fn receive_nowait(&self) -> Result<M, TryRecvError> {
        generic_try_receive(self)
    }

    /// Number of messages currently buffered.
    pub fn len(&self) -> usize {
        self.inner.storage.borrow().len()
    }

    /// Whether the buffer currently holds no messages.
    pub fn is_empty(&self) -> bool {
        self.inner.storage.borrow().is_empty()
    }

    /// Whether the buffer is at capacity (always `false` when unbounded).
    pub fn is_full(&self) -> bool {
        match self.inner.maxsize {
            None => false,
            Some(n) => self.len() >= n,
        }
    }

    /// Closes the channel. Idempotent: returns `false` if already closed.
    pub fn close(&self) -> bool {
        self.inner.close()
    }

    /// Whether the channel has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.gate.is_closed()
    }

    /// An async sequence of successive receives, ending (without an error)
    /// once the channel closes.
    pub fn iter(&self) -> crate::channel::ChannelIter<'_, M, Self> {
        crate::channel::ChannelIter::new(self)
    }
}

impl<M, S: Storage<M>> SendCap<M> for BufferedChannel<M, S> {
    fn ready_to_send(&self) -> Result<bool, Closed> {
        self.inner.ready_to_send()
    }
    fn commit_send(&self, msg: M) {
        self.inner.commit_send(msg)
    }
    fn wait_send(&self) -> Waiter<Closed> {
        self.inner.wait_send()
    }
    fn retract_send(&self) {}
}

impl<M, S: Storage<M>> RecvCap<M> for BufferedChannel<M, S> {
    fn ready_to_receive(&self) -> Result<bool, Closed> {
        self.inner.ready_to_receive()
    }
    fn commit_receive(&self) -> M {
        self.inner.commit_receive()
    }
    fn wait_receive(&self) -> Waiter<Closed> {
        self.inner.wait_receive()
    }
    fn retract_receive(&self) {}
}

impl<M, S: Storage<M>> Clone for BufferedChannel<M, S> {
    fn clone(&self) -> Self {
        BufferedChannel {
            inner: self.inner.clone(),
        }
    }
}

impl<M, S: Storage<M>> Drop for BufferedChannel<M, S> {
    fn drop(&mut self) {
        if Rc::strong_count(&self.inner) == 1 {
            self.inner.close();
        }
    }
}

impl<M, S: Storage<M>> fmt::Debug for BufferedChannel<M, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferedChannel")
            .field("len", &self.len())
            .field("maxsize", &self.inner.maxsize)
            .finish_non_exhaustive()
    }
}

/// Creates a new [`BufferedChannel`] with the given capacity and storage
/// discipline. `maxsize` of `None` is unbounded; `Some(0)` degenerates to a
/// rendezvous handoff.
pub fn buffered<M, S: Storage<M>>(maxsize: Option<usize>, storage: S) -> BufferedChannel<M, S> {
    BufferedChannel::new(maxsize, storage)
}

/// Creates a new FIFO-backed [`BufferedChannel`] with the given capacity.
pub fn fifo<M>(maxsize: Option<usize>) -> BufferedChannel<M, Fifo<M>> {
    buffered(maxsize, Fifo::new())
}
