//! Channel variants and the capability protocol they share.
//!
//! Every variant ([`unicast`](rendezvous::unicast), [`broadcast`](rendezvous::broadcast),
//! [`default_channel`](default::default_channel), [`buffered`](buffered::buffered)) is built
//! on the same two-sided capability protocol: a probe (`ready_to_*`), a park
//! (`wait_*`), a commit (`commit_*`), and a retract (`retract_*`). `send`/`receive`
//! drive this protocol directly; [`select`](crate::select) drives it through the
//! type-erased [`SelectOp`](crate::select::SelectOp) adapters so several
//! channels can race against each other.

pub mod buffered;
pub mod default;
pub mod rendezvous;

use std::cell::Cell;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;

use crate::error::{Closed, RecvError, SendError, TryRecvError, TrySendError};
use crate::wait_group::Waiter;

pub use buffered::BufferedChannel;
pub use default::DefaultChannel;
pub use rendezvous::{BroadcastChannel, UnicastChannel};

/// A one-shot, idempotent close latch shared by every channel variant.
///
/// Composition, not inheritance: each variant embeds a `CloseGate` and
/// consults it from its own `ready_to_*`/`commit_*` implementations, rather
/// than a base class injecting close-awareness behind the scenes.
#[derive(Debug, Default)]
pub(crate) struct CloseGate {
    closed: Cell<bool>,
}

impl CloseGate {
    pub(crate) fn new() -> Self {
        CloseGate {
            closed: Cell::new(false),
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.get()
    }

    /// Closes the gate. Returns `true` if this call is the one that closed
    /// it, `false` if it was already closed.
    pub(crate) fn close(&self) -> bool {
        if self.closed.get() {
            false
        } else {
            self.closed.set(true);
            true
        }
    }
}

/// The sending half of the capability protocol.
///
/// Implemented by each channel variant's shared inner state, never exposed
/// directly to callers: public `Sender`-ish handles (or the channel type
/// itself, for variants with no separate handle) drive it on their behalf.
pub(crate) trait SendCap<M> {
    /// Probes whether a send would currently succeed.
    fn ready_to_send(&self) -> Result<bool, Closed>;

    /// Writes `msg` into the channel.
    ///
    /// Only ever called right after `ready_to_send` returned `Ok(true)`,
    /// with no intervening await point, so it cannot itself race with a
    /// close.
    fn commit_send(&self, msg: M);

    /// Parks the caller until the channel is worth re-probing.
    fn wait_send(&self) -> Waiter<Closed>;

    /// Withdraws interest registered by a previous `wait_send`.
    fn retract_send(&self);
}

/// The receiving half of the capability protocol.
pub(crate) trait RecvCap<M> {
    /// Probes whether a receive would currently succeed.
    fn ready_to_receive(&self) -> Result<bool, Closed>;

    /// Takes a message out of the channel.
    ///
    /// Only ever called right after `ready_to_receive` returned `Ok(true)`.
    fn commit_receive(&self) -> M;

    /// Parks the caller until the channel is worth re-probing.
    fn wait_receive(&self) -> Waiter<Closed>;

    /// Withdraws interest registered by a previous `wait_receive`.
    fn retract_receive(&self);
}

/// Non-blocking send shared by every variant's `send_nowait`.
pub(crate) fn generic_try_send<M, C: SendCap<M> + ?Sized>(
    cap: &C,
    msg: M,
) -> Result<(), TrySendError<M>> {
    match cap.ready_to_send() {
        Err(Closed) => Err(TrySendError::Closed(msg)),
        Ok(false) => Err(TrySendError::NotReady(msg)),
        Ok(true) => {
            cap.commit_send(msg);
            Ok(())
        }
    }
}

/// Non-blocking receive shared by every variant's `receive_nowait`.
pub(crate) fn generic_try_receive<M, C: RecvCap<M> + ?Sized>(
    cap: &C,
) -> Result<M, TryRecvError> {
    match cap.ready_to_receive() {
        Err(Closed) => Err(TryRecvError::Closed),
        Ok(false) => Err(TryRecvError::NotReady),
        Ok(true) => Ok(cap.commit_receive()),
    }
}

enum SendState<M> {
    Probing(Option<M>),
    Waiting(Option<M>, Waiter<Closed>),
    Done,
}

/// The future returned by a blocking send.
///
/// Probes, and if not ready parks on [`SendCap::wait_send`]; once woken it
/// unconditionally retracts before re-probing, so a spurious wakeup never
/// leaves the capability's waiter bookkeeping out of sync.
pub(crate) struct SendFuture<'a, M, C: SendCap<M>> {
    cap: &'a C,
    state: SendState<M>,
}

impl<'a, M, C: SendCap<M>> SendFuture<'a, M, C> {
    pub(crate) fn new(cap: &'a C, msg: M) -> Self {
        SendFuture {
            cap,
            state: SendState::Probing(Some(msg)),
        }
    }
}

impl<'a, M, C: SendCap<M>> Future for SendFuture<'a, M, C> {
    type Output = Result<(), SendError<M>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        loop {
            match &mut this.state {
                SendState::Probing(slot) => match this.cap.ready_to_send() {
                    Err(Closed) => {
                        let msg = slot.take().expect("send future polled twice while probing");
                        this.state = SendState::Done;
                        return Poll::Ready(Err(SendError(msg)));
                    }
                    Ok(true) => {
                        let msg = slot.take().expect("send future polled twice while probing");
                        this.cap.commit_send(msg);
                        this.state = SendState::Done;
                        return Poll::Ready(Ok(()));
                    }
                    Ok(false) => {
                        let msg = slot.take().expect("send future polled twice while probing");
                        let waiter = this.cap.wait_send();
                        this.state = SendState::Waiting(Some(msg), waiter);
                    }
                },
                SendState::Waiting(slot, waiter) => {
                    match Pin::new(waiter).poll(cx) {
                        Poll::Pending => return Poll::Pending,
                        Poll::Ready(Ok(())) => {
                            this.cap.retract_send();
                            let msg = slot.take().expect("send future polled twice while waiting");
                            this.state = SendState::Probing(Some(msg));
                        }
                        Poll::Ready(Err(Closed)) => {
                            let msg = slot.take().expect("send future polled twice while waiting");
                            this.state = SendState::Done;
                            return Poll::Ready(Err(SendError(msg)));
                        }
                    }
                }
                SendState::Done => panic!("SendFuture polled after completion"),
            }
        }
    }
}

enum RecvState {
    Probing,
    Waiting(Waiter<Closed>),
    Done,
}

/// The future returned by a blocking receive.
pub(crate) struct ReceiveFuture<'a, M, C: RecvCap<M>> {
    cap: &'a C,
    state: RecvState,
    _marker: std::marker::PhantomData<M>,
}

impl<'a, M, C: RecvCap<M>> ReceiveFuture<'a, M, C> {
    pub(crate) fn new(cap: &'a C) -> Self {
        ReceiveFuture {
            cap,
            state: RecvState::Probing,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<'a, M, C: RecvCap<M>> Future for ReceiveFuture<'a, M, C> {
    type Output = Result<M, RecvError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        loop {
            match &mut this.state {
                RecvState::Probing => match this.cap.ready_to_receive() {
                    Err(Closed) => {
                        this.state = RecvState::Done;
                        return Poll::Ready(Err(RecvError));
                    }
                    Ok(true) => {
                        let msg = this.cap.commit_receive();
                        this.state = RecvState::Done;
                        return Poll::Ready(Ok(msg));
                    }
                    Ok(false) => {
                        let waiter = this.cap.wait_receive();
                        this.state = RecvState::Waiting(waiter);
                    }
                },
                RecvState::Waiting(waiter) => match Pin::new(waiter).poll(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Ok(())) => {
                        this.cap.retract_receive();
                        this.state = RecvState::Probing;
                    }
                    Poll::Ready(Err(Closed)) => {
                        this.state = RecvState::Done;
                        return Poll::Ready(Err(RecvError));
                    }
                },
            }
        }
    }
}

enum IterState {
    Probing,
    Waiting(Waiter<Closed>),
    Done,
}

/// The async-iterator side of a closable channel: repeated `receive`,
/// terminating on `Closed` instead of surfacing it as an error.
///
/// Returned by each channel variant's `iter` method. Owns its own waiter
/// slot, so several independent iterators (e.g. two clones of the same
/// broadcast handle) can each be mid-wait without interfering with one
/// another.
pub struct ChannelIter<'a, M, C: RecvCap<M>> {
    cap: &'a C,
    state: IterState,
    _marker: PhantomData<M>,
}

impl<'a, M, C: RecvCap<M>> ChannelIter<'a, M, C> {
    pub(crate) fn new(cap: &'a C) -> Self {
        ChannelIter {
            cap,
            state: IterState::Probing,
            _marker: PhantomData,
        }
    }
}

impl<'a, M, C: RecvCap<M>> Stream for ChannelIter<'a, M, C> {
    type Item = M;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<M>> {
        let this = self.get_mut();
        loop {
            match &mut this.state {
                IterState::Done => return Poll::Ready(None),
                IterState::Probing => match this.cap.ready_to_receive() {
                    Err(Closed) => {
                        this.state = IterState::Done;
                        return Poll::Ready(None);
                    }
                    Ok(true) => return Poll::Ready(Some(this.cap.commit_receive())),
                    Ok(false) => {
                        let waiter = this.cap.wait_receive();
                        this.state = IterState::Waiting(waiter);
                    }
                },
                IterState::Waiting(waiter) => match Pin::new(waiter).poll(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Ok(())) => {
                        this.cap.retract_receive();
                        this.state = IterState::Probing;
                    }
                    Poll::Ready(Err(Closed)) => {
                        this.state = IterState::Done;
                        return Poll::Ready(None);
                    }
                },
            }
        }
    }
}
