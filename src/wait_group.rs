//! A FIFO of suspended waiters shared by every channel variant.
//!
//! This is the single suspension primitive the rest of the crate is built
//! on: a channel parks senders on one `WaitGroup` and receivers on another,
//! and `select` parks its auxiliary waiters on whichever wait-group its
//! candidate channel exposes. Single-threaded only: waiters are reference
//! counted with `Rc`, not `Arc`, since no cross-thread handoff is required.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

struct WaiterState<E> {
    done: bool,
    result: Option<Result<(), E>>,
    waker: Option<Waker>,
}

/// A queue-side reference to a parked waiter.
///
/// Cheap to clone (it's an `Rc`); the wait-group holds one clone, the
/// suspended task holds the other via [`Waiter`].
struct WaiterHandle<E>(Rc<RefCell<WaiterState<E>>>);

impl<E> Clone for WaiterHandle<E> {
    fn clone(&self) -> Self {
        WaiterHandle(self.0.clone())
    }
}

impl<E> WaiterHandle<E> {
    /// Completes the waiter with `result`, waking it if it hasn't already
    /// been completed (by a prior wake, or by cancellation). Returns whether
    /// this call was the one that completed it.
    fn complete(&self, result: Result<(), E>) -> bool {
        let mut state = self.0.borrow_mut();
        if state.done {
            return false;
        }
        state.done = true;
        state.result = Some(result);
        if let Some(waker) = state.waker.take() {
            waker.wake();
        }
        true
    }
}

/// A one-shot suspension handle returned by [`WaitGroup::wait`].
///
/// Awaiting it suspends the current task until the wait-group wakes it (via
/// `wake_next`/`wake_all`) or aborts it (with an error). Dropping it before
/// completion marks it as done without a result, which is how cancellation
/// is observed by a later `wake_next`: the skip-if-done rule means a
/// cancelled waiter never silently eats a wakeup meant for the next one in
/// line.
pub(crate) struct Waiter<E> {
    handle: WaiterHandle<E>,
}

impl<E> Future for Waiter<E> {
    type Output = Result<(), E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.handle.0.borrow_mut();
        if state.done {
            Poll::Ready(
                state
                    .result
                    .take()
                    .expect("waiter marked done without a result or cancellation"),
            )
        } else {
            state.waker = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}

impl<E> Drop for Waiter<E> {
    fn drop(&mut self) {
        let mut state = self.handle.0.borrow_mut();
        state.done = true;
        state.waker = None;
    }
}

/// FIFO of suspended waiters with wake-one, wake-all, and abort-all.
pub(crate) struct WaitGroup<E> {
    waiters: VecDeque<WaiterHandle<E>>,
}

impl<E: Clone> WaitGroup<E> {
    pub(crate) fn new() -> Self {
        WaitGroup {
            waiters: VecDeque::new(),
        }
    }

    /// Whether any waiter (woken, aborted, or still pending) is present.
    pub(crate) fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }

    /// Parks a fresh waiter at the back of the queue.
    pub(crate) fn wait(&mut self) -> Waiter<E> {
        let handle = WaiterHandle(Rc::new(RefCell::new(WaiterState {
            done: false,
            result: None,
            waker: None,
        })));
        self.waiters.push_back(handle.clone());
        Waiter { handle }
    }

    /// Wakes the earliest non-completed waiter, skipping ones that were
    /// already completed out of band (e.g. cancelled by the scheduler).
    pub(crate) fn wake_next(&mut self) {
        while let Some(handle) = self.waiters.pop_front() {
            if handle.complete(Ok(())) {
                break;
            }
        }
    }

    /// Completes every non-completed waiter successfully, returning how many
    /// waiters were actually woken (excluding ones already cancelled).
    pub(crate) fn wake_all(&mut self) -> usize {
        let mut woken = 0;
        while let Some(handle) = self.waiters.pop_front() {
            if handle.complete(Ok(())) {
                woken += 1;
            }
        }
        woken
    }

    /// Fails every non-completed waiter with `err`.
    pub(crate) fn abort(&mut self, err: E) {
        let mut aborted = 0;
        while let Some(handle) = self.waiters.pop_front() {
            if handle.complete(Err(err.clone())) {
                aborted += 1;
            }
        }
        if aborted > 0 {
            log::trace!("aborted {aborted} waiter(s)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Closed;
    use futures_executor::LocalPool;
    use futures_util::task::LocalSpawnExt;
    use std::rc::Rc;

    #[test]
    fn wake_next_wakes_earliest_first() {
        let mut pool = LocalPool::new();
        let spawner = pool.spawner();

        let wg = Rc::new(RefCell::new(WaitGroup::<Closed>::new()));
        let order = Rc::new(RefCell::new(Vec::new()));

        for i in 0..3 {
            let waiter = wg.borrow_mut().wait();
            let order = order.clone();
            spawner
                .spawn_local(async move {
                    waiter.await.unwrap();
                    order.borrow_mut().push(i);
                })
                .unwrap();
        }

        wg.borrow_mut().wake_next();
        pool.run_until_stalled();
        assert_eq!(*order.borrow(), vec![0]);

        wg.borrow_mut().wake_next();
        pool.run_until_stalled();
        assert_eq!(*order.borrow(), vec![0, 1]);
    }

    #[test]
    fn cancelled_head_is_skipped_by_wake_next() {
        let mut wg = WaitGroup::<Closed>::new();
        let first = wg.wait();
        let second = wg.wait();

        drop(first); // cancellation: marks the waiter done without a result
        assert!(!wg.is_empty());

        wg.wake_next();

        let woke = futures_executor::block_on(second);
        assert_eq!(woke, Ok(()));
    }

    #[test]
    fn wake_all_completes_every_pending_waiter() {
        let mut wg = WaitGroup::<Closed>::new();
        let a = wg.wait();
        let b = wg.wait();
        wg.wake_all();
        assert!(wg.is_empty());
        assert_eq!(futures_executor::block_on(a), Ok(()));
        assert_eq!(futures_executor::block_on(b), Ok(()));
    }

    #[test]
    fn abort_fails_every_pending_waiter() {
        let mut wg = WaitGroup::<Closed>::new();
        let a = wg.wait();
        wg.abort(Closed);
        assert_eq!(futures_executor::block_on(a), Err(Closed));
    }

    #[test]
    fn wake_next_on_empty_group_is_a_noop() {
        let mut wg = WaitGroup::<Closed>::new();
        wg.wake_next();
        assert!(wg.is_empty());
    }
}
