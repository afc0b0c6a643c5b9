//! Multi-way select over heterogeneous channel operations.
//!
//! Rust's type system has no good way to hand back a dynamically-typed
//! channel handle the way the original design does, so `select` returns the
//! *index* of the winning candidate instead: callers match on it and then
//! call the concrete channel's own `send_nowait`/`receive_nowait`, which is
//! guaranteed to succeed since nothing else runs between the two calls in a
//! single-threaded cooperative scheduler.
//!
//! Fairness comes from shuffling candidate order before every scan, exactly
//! like a randomized `shuffle` ahead of a linear readiness sweep. Losing
//! auxiliary waits are cancelled for free: once the winning future resolves,
//! the `pending` vector holding the others is dropped, and each one's
//! `Drop` impl (on [`Waiter`](crate::wait_group::Waiter)) marks it done
//! without ever registering a wakeup.

use std::marker::PhantomData;

use futures_util::future::{select_all, FutureExt, LocalBoxFuture};
use rand::seq::SliceRandom;

use crate::channel::{RecvCap, SendCap};
use crate::error::{ChannelError, ChannelOperation, Closed};
use crate::wait_group::Waiter;

/// A single candidate in a multi-way select, with its message type erased.
///
/// `commit` deliberately has no place here: select only ever probes, parks,
/// and retracts. Once a winner is found, the caller commits through the
/// concrete, still message-typed channel handle.
pub trait SelectOp {
    /// Probes whether this candidate is ready right now.
    fn is_ready(&self) -> Result<bool, Closed>;

    /// Parks until this candidate is worth re-probing.
    fn wait(&self) -> Waiter<Closed>;

    /// Withdraws interest registered by a previous `wait`.
    fn retract(&self);

    /// Which side of the channel this candidate probes.
    fn operation(&self) -> ChannelOperation;
}

struct SendSelectOp<'a, M, C: SendCap<M>> {
    chan: &'a C,
    _marker: PhantomData<M>,
}

impl<'a, M, C: SendCap<M>> SelectOp for SendSelectOp<'a, M, C> {
    fn is_ready(&self) -> Result<bool, Closed> {
        self.chan.ready_to_send()
    }
    fn wait(&self) -> Waiter<Closed> {
        self.chan.wait_send()
    }
    fn retract(&self) {
        self.chan.retract_send()
    }
    fn operation(&self) -> ChannelOperation {
        ChannelOperation::Send
    }
}

struct RecvSelectOp<'a, M, C: RecvCap<M>> {
    chan: &'a C,
    _marker: PhantomData<M>,
}

impl<'a, M, C: RecvCap<M>> SelectOp for RecvSelectOp<'a, M, C> {
    fn is_ready(&self) -> Result<bool, Closed> {
        self.chan.ready_to_receive()
    }
    fn wait(&self) -> Waiter<Closed> {
        self.chan.wait_receive()
    }
    fn retract(&self) {
        self.chan.retract_receive()
    }
    fn operation(&self) -> ChannelOperation {
        ChannelOperation::Recv
    }
}

/// Wraps a channel as a send candidate for [`select`]/[`select_nowait`].
pub fn send<'a, M, C: SendCap<M> + 'a>(chan: &'a C) -> Box<dyn SelectOp + 'a> {
    Box::new(SendSelectOp {
        chan,
        _marker: PhantomData,
    })
}

/// Wraps a channel as a receive candidate for [`select`]/[`select_nowait`].
pub fn recv<'a, M, C: RecvCap<M> + 'a>(chan: &'a C) -> Box<dyn SelectOp + 'a> {
    Box::new(RecvSelectOp {
        chan,
        _marker: PhantomData,
    })
}

/// The winning candidate of a select: its position in the slice passed to
/// `select`/`select_nowait`, and which operation it was probing.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SelectOutcome {
    /// Index into the candidate slice of the winning operation.
    pub index: usize,
    /// Which operation (send or receive) the winner was probing.
    pub operation: ChannelOperation,
}

fn shuffled_order(len: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    order.shuffle(&mut rand::thread_rng());
    order
}

/// Scans `ops` in random order and returns the first ready one, without
/// waiting.
///
/// A candidate whose readiness probe reports [`Closed`] is treated as not
/// ready rather than propagated: a select should find a live candidate even
/// when some of the others happen to be closed, and `select_nowait` never
/// needs to report an error for that reason alone.
///
/// Candidates are scanned in random order so that, across many calls with
/// several simultaneously-ready candidates, each gets a roughly equal
/// chance of being the one returned. Pass `keep_order: true` to scan the
/// slice front-to-back instead, which is useful for deterministic tests.
pub fn select_nowait(ops: &[Box<dyn SelectOp + '_>], keep_order: bool) -> Option<SelectOutcome> {
    let order = if keep_order {
        (0..ops.len()).collect()
    } else {
        shuffled_order(ops.len())
    };
    for i in order {
        if let Ok(true) = ops[i].is_ready() {
            return Some(SelectOutcome {
                index: i,
                operation: ops[i].operation(),
            });
        }
    }
    None
}

async fn wait_then_retract(index: usize, op: &dyn SelectOp) -> (usize, Result<(), Closed>) {
    let result = op.wait().await;
    op.retract();
    (index, result)
}

/// Waits until one of `ops` is ready, returning the winner.
///
/// Tries the non-blocking scan first; if nothing is immediately ready, parks
/// an auxiliary waiter per candidate and races them with
/// [`select_all`](futures_util::future::select_all). Once a waiter resolves
/// it is retracted unconditionally before the candidate is re-probed, since
/// another task may have grabbed it between the wakeup and this check.
///
/// Returns [`ChannelError::Closed`] only once every candidate has been
/// exhausted, that is, once every one of them closed before ever becoming
/// ready.
pub async fn select(ops: &[Box<dyn SelectOp + '_>]) -> Result<SelectOutcome, ChannelError> {
    if let Some(outcome) = select_nowait(ops, false) {
        return Ok(outcome);
    }

    // A candidate already reporting `Closed` here must never be parked on:
    // its wait group has already had its one-shot `abort` run (if it ever
    // will), so a fresh waiter registered on it now would sit forever
    // uncompleted. Such a candidate is simply exhausted, same as one that
    // closes mid-race.
    let mut pending: Vec<LocalBoxFuture<'_, (usize, Result<(), Closed>)>> = shuffled_order(ops.len())
        .into_iter()
        .filter(|&i| !matches!(ops[i].is_ready(), Err(Closed)))
        .map(|i| wait_then_retract(i, ops[i].as_ref()).boxed_local())
        .collect();

    loop {
        if pending.is_empty() {
            log::trace!("select exhausted: every candidate closed");
            return Err(ChannelError::Closed);
        }
        let ((index, result), _, remaining) = select_all(pending).await;
        pending = remaining;
        match result {
            Err(Closed) => continue,
            Ok(()) => match ops[index].is_ready() {
                Ok(true) => {
                    return Ok(SelectOutcome {
                        index,
                        operation: ops[index].operation(),
                    })
                }
                Ok(false) => pending.push(wait_then_retract(index, ops[index].as_ref()).boxed_local()),
                Err(Closed) => continue,
            },
        }
    }
}

/// Selects over a homogeneous set of receive-only channels and delivers the
/// message, without the caller needing to re-dispatch on the winning index.
pub async fn select_receive<M, C: RecvCap<M>>(chans: &[&C]) -> Result<(usize, M), Closed> {
    let ops: Vec<Box<dyn SelectOp + '_>> = chans.iter().map(|c| recv::<M, C>(c)).collect();
    let outcome = select(&ops).await.map_err(|_| Closed)?;
    match crate::channel::generic_try_receive(chans[outcome.index]) {
        Ok(msg) => Ok((outcome.index, msg)),
        Err(crate::error::TryRecvError::Closed) => Err(Closed),
        Err(crate::error::TryRecvError::NotReady) => {
            unreachable!("select reported a winner that was not actually ready")
        }
    }
}

/// Selects over a homogeneous set of receive-only channels without waiting;
/// delivers `default` if none is ready right now.
pub fn select_receive_or<M, C: RecvCap<M>>(chans: &[&C], default: M) -> (Option<usize>, M) {
    let ops: Vec<Box<dyn SelectOp + '_>> = chans.iter().map(|c| recv::<M, C>(c)).collect();
    match select_nowait(&ops, false) {
        Some(outcome) => match crate::channel::generic_try_receive(chans[outcome.index]) {
            Ok(msg) => (Some(outcome.index), msg),
            Err(_) => (None, default),
        },
        None => (None, default),
    }
}
