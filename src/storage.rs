//! Storage disciplines for buffered channels.
//!
//! A [`Storage`] is an ordered container a [`BufferedChannel`](crate::channel::BufferedChannel)
//! uses to hold messages between `send` and `receive`. Three disciplines ship
//! with the crate: FIFO (the default), LIFO, and a min-heap priority queue.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

/// An ordered, single-threaded message container.
///
/// `get` on an empty storage is a precondition violation (the discipline has
/// nothing to hand out); callers must check [`Storage::is_empty`] first.
pub trait Storage<M> {
    /// Creates an empty container.
    fn new() -> Self
    where
        Self: Sized;

    /// Inserts a message.
    fn put(&mut self, msg: M);

    /// Removes and returns one message, in the discipline's order.
    ///
    /// # Panics
    ///
    /// Panics if the storage is empty.
    fn get(&mut self) -> M;

    /// The number of messages currently held.
    fn len(&self) -> usize;

    /// Whether the storage holds no messages.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// First-in, first-out discipline (a plain queue). The default for
/// [`buffered`](crate::channel::buffered).
#[derive(Debug)]
pub struct Fifo<M>(VecDeque<M>);

impl<M> Storage<M> for Fifo<M> {
    fn new() -> Self {
        Fifo(VecDeque::new())
    }

    fn put(&mut self, msg: M) {
        self.0.push_back(msg);
    }

    fn get(&mut self) -> M {
        self.0.pop_front().expect("get on empty storage")
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

/// Last-in, first-out discipline (a stack).
#[derive(Debug)]
pub struct Lifo<M>(Vec<M>);

impl<M> Storage<M> for Lifo<M> {
    fn new() -> Self {
        Lifo(Vec::new())
    }

    fn put(&mut self, msg: M) {
        self.0.push(msg);
    }

    fn get(&mut self) -> M {
        self.0.pop().expect("get on empty storage")
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

/// Min-heap discipline: `get` always returns the smallest element per `M`'s
/// [`Ord`] implementation.
#[derive(Debug)]
pub struct Priority<M: Ord>(BinaryHeap<Reverse<M>>);

impl<M: Ord> Storage<M> for Priority<M> {
    fn new() -> Self {
        Priority(BinaryHeap::new())
    }

    fn put(&mut self, msg: M) {
        self.0.push(Reverse(msg));
    }

    fn get(&mut self) -> M {
        self.0.pop().expect("get on empty storage").0
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}
