//! The default channel: a latched, non-consuming broadcast.
//!
//! Unlike [`BroadcastChannel`](crate::channel::BroadcastChannel), a send
//! never blocks (it just overwrites the latch) and a receive never removes
//! the value (every receiver keeps seeing the latest one until [`reset`](DefaultChannel::reset)
//! or another send). A channel with no initial value accepts sends
//! immediately but has nothing to offer receivers until the first one lands.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::channel::{
    generic_try_receive, generic_try_send, CloseGate, ReceiveFuture, RecvCap, SendCap, SendFuture,
};
use crate::error::{Closed, RecvError, SendError, TryRecvError, TrySendError};
use crate::wait_group::{Waiter, WaitGroup};

struct Inner<M> {
    value: RefCell<Option<M>>,
    receivers: RefCell<WaitGroup<Closed>>,
    gate: CloseGate,
}

/// A latched broadcast channel: holds the most recently sent value and
/// hands a clone of it to every receiver, without ever consuming it.
pub struct DefaultChannel<M: Clone> {
    inner: Rc<Inner<M>>,
}

impl<M: Clone> DefaultChannel<M> {
    fn new(initial: Option<M>) -> Self {
        DefaultChannel {
            inner: Rc::new(Inner {
                value: RefCell::new(initial),
                receivers: RefCell::new(WaitGroup::new()),
                gate: CloseGate::new(),
            }),
        }
    }

    /// Sends a value, latching it. Never blocks.
    pub async fn send(&self, msg: M) -> Result<(), SendError<M>> {
        SendFuture::new(self, msg).await
    }

    /// Sends a value, latching it. Never blocks; the `_nowait` suffix is
    /// kept only for symmetry with the other channel variants.
    pub fn send_nowait(&self, msg: M) -> Result<(), TrySendError<M>> {
        generic_try_send(self, msg)
    }

    /// Receives the latched value, waiting if none has ever been sent.
    pub async fn receive(&self) -> Result<M, RecvError> {
        ReceiveFuture::new(self).await
    }

    /// Receives the latched value without waiting.
    pub fn receive_nowait(&self) -> Result<M, TryRecvError> {
        generic_try_receive(self)
    }

    /// Clears the latch, so the next `receive` waits for a fresh send.
    pub fn reset(&self) {
        self.inner.value.borrow_mut().take();
    }

    /// Whether a value is currently latched.
    pub fn has_value(&self) -> bool {
        self.inner.value.borrow().is_some()
    }

    /// Closes the channel. Idempotent: returns `false` if already closed.
    pub fn close(&self) -> bool {
        if !self.inner.gate.close() {
            return false;
        }
        log::debug!(
            "default channel closed; latch {}",
            if self.has_value() { "holds a value" } else { "empty" }
        );
        self.inner.receivers.borrow_mut().abort(Closed);
        true
    }

    /// Whether the channel has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.gate.is_closed()
    }

    /// An async sequence of successive receives. Since a default channel
    /// never consumes its latch, this yields the same value repeatedly
    /// until [`reset`](Self::reset) clears it or the channel closes.
    pub fn iter(&self) -> crate::channel::ChannelIter<'_, M, Self> {
        crate::channel::ChannelIter::new(self)
    }
}

impl<M: Clone> SendCap<M> for DefaultChannel<M> {
    fn ready_to_send(&self) -> Result<bool, Closed> {
        if self.inner.gate.is_closed() {
            return Err(Closed);
        }
        Ok(true)
    }

    fn commit_send(&self, msg: M) {
        *self.inner.value.borrow_mut() = Some(msg);
        self.inner.receivers.borrow_mut().wake_all();
    }

    fn wait_send(&self) -> Waiter<Closed> {
        unreachable!("a default channel is always ready to send")
    }

    fn retract_send(&self) {}
}

impl<M: Clone> RecvCap<M> for DefaultChannel<M> {
    fn ready_to_receive(&self) -> Result<bool, Closed> {
        if self.inner.value.borrow().is_some() {
            return Ok(true);
        }
        if self.inner.gate.is_closed() {
            return Err(Closed);
        }
        Ok(false)
    }

    fn commit_receive(&self) -> M {
        self.inner
            .value
            .borrow()
            .as_ref()
            .expect("commit_receive called while not ready")
            .clone()
    }

    fn wait_receive(&self) -> Waiter<Closed> {
        self.inner.receivers.borrow_mut().wait()
    }

    fn retract_receive(&self) {}
}

impl<M: Clone> Clone for DefaultChannel<M> {
    fn clone(&self) -> Self {
        DefaultChannel {
            inner: self.inner.clone(),
        }
    }
}

impl<M: Clone> Drop for DefaultChannel<M> {
    fn drop(&mut self) {
        if Rc::strong_count(&self.inner) == 1 {
            self.close();
        }
    }
}

impl<M: Clone> fmt::Debug for DefaultChannel<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultChannel").finish_non_exhaustive()
    }
}

/// Creates a new [`DefaultChannel`], optionally pre-latched with `initial`.
pub fn default_channel<M: Clone>(initial: Option<M>) -> DefaultChannel<M> {
    DefaultChannel::new(initial)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_executor::LocalPool;
    use futures_util::task::LocalSpawnExt;

    #[test]
    fn send_never_blocks() {
        let ch = default_channel::<i32>(None);
        assert_eq!(ch.send_nowait(1), Ok(()));
        assert_eq!(ch.send_nowait(2), Ok(()));
    }

    #[test]
    fn receive_is_non_consuming() {
        let ch = default_channel(Some(7));
        assert_eq!(ch.receive_nowait(), Ok(7));
        assert_eq!(ch.receive_nowait(), Ok(7));
    }

    #[test]
    fn receive_waits_without_an_initial_value() {
        let mut pool = LocalPool::new();
        let spawner = pool.spawner();
        let ch = default_channel::<i32>(None);
        assert_eq!(ch.receive_nowait(), Err(TryRecvError::NotReady));

        let ch2 = ch.clone();
        let got = Rc::new(RefCell::new(None));
        let got2 = got.clone();
        spawner
            .spawn_local(async move {
                *got2.borrow_mut() = Some(ch2.receive().await);
            })
            .unwrap();
        pool.run_until_stalled();
        assert!(got.borrow().is_none());

        ch.send_nowait(5).unwrap();
        pool.run_until_stalled();
        assert_eq!(*got.borrow(), Some(Ok(5)));
    }

    #[test]
    fn reset_clears_the_latch() {
        let ch = default_channel(Some(1));
        ch.reset();
        assert_eq!(ch.receive_nowait(), Err(TryRecvError::NotReady));
    }

    #[test]
    fn closed_channel_keeps_serving_its_latched_value() {
        let ch = default_channel(Some(3));
        ch.close();
        assert_eq!(ch.receive_nowait(), Ok(3));
        assert_eq!(ch.send_nowait(4), Err(TrySendError::Closed(4)));
    }

    #[test]
    fn closed_channel_with_no_value_errors_on_receive() {
        let ch = default_channel::<i32>(None);
        ch.close();
        assert_eq!(ch.receive_nowait(), Err(TryRecvError::Closed));
    }
}
