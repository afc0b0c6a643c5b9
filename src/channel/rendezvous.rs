//! Unicast and broadcast rendezvous channels.
//!
//! Neither variant buffers: a send only commits once at least one receiver
//! is already parked, and the message passes directly from the sender's
//! hand to the receiver's. They differ only in how many parked receivers a
//! single send wakes: [`UnicastChannel`] wakes exactly one, which is
//! therefore guaranteed to win; [`BroadcastChannel`] wakes every receiver
//! parked at that instant, but only the one that actually calls
//! `commit_receive` first takes the message: the rest find the slot empty
//! again on resume and park once more.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::channel::{
    generic_try_receive, generic_try_send, CloseGate, ReceiveFuture, RecvCap, SendCap, SendFuture,
};
use crate::error::{Closed, RecvError, SendError, TryRecvError, TrySendError};
use crate::wait_group::{Waiter, WaitGroup};

struct Inner<M> {
    slot: RefCell<Option<M>>,
    senders: RefCell<WaitGroup<Closed>>,
    receivers: RefCell<WaitGroup<Closed>>,
    gate: CloseGate,
    broadcast: bool,
}

impl<M> Inner<M> {
    fn new(broadcast: bool) -> Self {
        Inner {
            slot: RefCell::new(None),
            senders: RefCell::new(WaitGroup::new()),
            receivers: RefCell::new(WaitGroup::new()),
            gate: CloseGate::new(),
            broadcast,
        }
    }

    fn ready_to_send(&self) -> Result<bool, Closed> {
        if self.gate.is_closed() {
            return Err(Closed);
        }
        Ok(self.slot.borrow().is_none() && !self.receivers.borrow().is_empty())
    }

    fn commit_send(&self, msg: M) {
        *self.slot.borrow_mut() = Some(msg);
        let mut receivers = self.receivers.borrow_mut();
        if self.broadcast {
            receivers.wake_all();
        } else {
            receivers.wake_next();
        }
    }

    fn wait_send(&self) -> Waiter<Closed> {
        self.senders.borrow_mut().wait()
    }

    fn retract_send(&self) {
        // A sender is only ever parked while no receiver is present, and
        // it's woken directly by a later `receive` call, never by another
        // `send`. Present for protocol symmetry.
    }

    fn ready_to_receive(&self) -> Result<bool, Closed> {
        if self.slot.borrow().is_some() {
            return Ok(true);
        }
        if self.gate.is_closed() {
            return Err(Closed);
        }
        Ok(false)
    }

    fn commit_receive(&self) -> M {
        let msg = self
            .slot
            .borrow_mut()
            .take()
            .expect("commit_receive called while not ready");
        self.senders.borrow_mut().wake_next();
        msg
    }

    fn wait_receive(&self) -> Waiter<Closed> {
        let waiter = self.receivers.borrow_mut().wait();
        // A freshly parked receiver may be exactly what a parked sender was
        // missing: wake one so it gets a chance to deliver.
        self.senders.borrow_mut().wake_next();
        waiter
    }

    fn retract_receive(&self) {}

    fn close(&self) -> bool {
        if !self.gate.close() {
            return false;
        }
        log::debug!(
            "rendezvous channel closed; {} message(s) still buffered",
            if self.slot.borrow().is_some() { 1 } else { 0 }
        );
        self.senders.borrow_mut().abort(Closed);
        // A rendezvous channel never buffers, so any receiver still parked
        // here has nothing in flight for it: probing happens synchronously
        // right before parking, with no interleaving possible, so every
        // waiter left in the group genuinely has nothing left to drain.
        self.receivers.borrow_mut().abort(Closed);
        true
    }
}

/// A rendezvous channel with exactly one recipient per message.
///
/// `send` blocks until a receiver is parked and ready to take the message;
/// `receive` blocks until a sender hands one over. No message is ever
/// buffered inside the channel.
pub struct UnicastChannel<M> {
    inner: Rc<Inner<M>>,
}

impl<M> UnicastChannel<M> {
    fn new() -> Self {
        UnicastChannel {
            inner: Rc::new(Inner::new(false)),
        }
    }

    /// Sends a message, waiting for a receiver if none is parked yet.
    pub async fn send(&self, msg: M) -> Result<(), SendError<M>> {
        SendFuture::new(self, msg).await
    }

    /// Sends a message only if a receiver is already parked.
    pub fn send_nowait(&self, msg: M) -> Result<(), TrySendError<M>> {
        generic_try_send(self, msg)
    }

    /// Receives a message, waiting for a sender if none has offered one yet.
    pub async fn receive(&self) -> Result<M, RecvError> {
        ReceiveFuture::new(self).await
    }

    /// Receives a message only if a sender has already offered one.
    pub fn receive_nowait(&self) -> Result<M, TryRecvError> {
        generic_try_receive(self)
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

impl<M> SendCap<M> for UnicastChannel<M> {
    fn ready_to_send(&self) -> Result<bool, Closed> {
        self.inner.ready_to_send()
    }
    fn commit_send(&self, msg: M) {
        self.inner.commit_send(msg)
    }
    fn wait_send(&self) -> Waiter<Closed> {
        self.inner.wait_send()
    }
    fn retract_send(&self) {
        self.inner.retract_send()
    }
}

impl<M> RecvCap<M> for UnicastChannel<M> {
    fn ready_to_receive(&self) -> Result<bool, Closed> {
        self.inner.ready_to_receive()
    }
    fn commit_receive(&self) -> M {
        self.inner.commit_receive()
    }
    fn wait_receive(&self) -> Waiter<Closed> {
        self.inner.wait_receive()
    }
    fn retract_receive(&self) {
        self.inner.retract_receive()
    }
}

impl<M> Clone for UnicastChannel<M> {
    fn clone(&self) -> Self {
        UnicastChannel {
            inner: self.inner.clone(),
        }
    }
}

impl<M> Drop for UnicastChannel<M> {
    fn drop(&mut self) {
        if Rc::strong_count(&self.inner) == 1 {
            self.inner.close();
        }
    }
}

impl<M> fmt::Debug for UnicastChannel<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnicastChannel").finish_non_exhaustive()
    }
}

/// Creates a new [`UnicastChannel`].
pub fn unicast<M>() -> UnicastChannel<M> {
    UnicastChannel::new()
}

/// A rendezvous channel that wakes every receiver parked at send time, but
/// still hands the message to only one of them.
///
/// The others observe the slot empty again on resume and park once more.
/// See [`UnicastChannel`] for the single-recipient variant.
pub struct BroadcastChannel<M> {
    inner: Rc<Inner<M>>,
}

impl<M> BroadcastChannel<M> {
    fn new() -> Self {
        BroadcastChannel {
            inner: Rc::new(Inner::new(true)),
        }
    }

    /// Sends a message, waiting until at least one receiver is parked.
    pub async fn send(&self, msg: M) -> Result<(), SendError<M>> {
        SendFuture::new(self, msg).await
    }

    /// Sends a message only if at least one receiver is already parked.
    pub fn send_nowait(&self, msg: M) -> Result<(), TrySendError<M>> {
        generic_try_send(self, msg)
    }

    /// Receives a message, racing every other parked receiver for it.
    pub async fn receive(&self) -> Result<M, RecvError> {
        ReceiveFuture::new(self).await
    }

    /// Receives a message only if one is already waiting to be taken.
    pub fn receive_nowait(&self) -> Result<M, TryRecvError> {
        generic_try_receive(self)
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

impl<M> SendCap<M> for BroadcastChannel<M> {
    fn ready_to_send(&self) -> Result<bool, Closed> {
        self.inner.ready_to_send()
    }
    fn commit_send(&self, msg: M) {
        self.inner.commit_send(msg)
    }
    fn wait_send(&self) -> Waiter<Closed> {
        self.inner.wait_send()
    }
    fn retract_send(&self) {
        self.inner.retract_send()
    }
}

impl<M> RecvCap<M> for BroadcastChannel<M> {
    fn ready_to_receive(&self) -> Result<bool, Closed> {
        self.inner.ready_to_receive()
    }
    fn commit_receive(&self) -> M {
        self.inner.commit_receive()
    }
    fn wait_receive(&self) -> Waiter<Closed> {
        self.inner.wait_receive()
    }
    fn retract_receive(&self) {
        self.inner.retract_receive()
    }
}

impl<M> Clone for BroadcastChannel<M> {
    fn clone(&self) -> Self {
        BroadcastChannel {
            inner: self.inner.clone(),
        }
    }
}

impl<M> Drop for BroadcastChannel<M> {
    fn drop(&mut self) {
        if Rc::strong_count(&self.inner) == 1 {
            self.inner.close();
        }
    }
}

impl<M> fmt::Debug for BroadcastChannel<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastChannel").finish_non_exhaustive()
    }
}

/// Creates a new [`BroadcastChannel`].
pub fn broadcast<M>() -> BroadcastChannel<M> {
    BroadcastChannel::new()
}
