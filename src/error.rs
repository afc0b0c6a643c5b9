//! Error types returned by channel and select operations.

use std::error;
use std::fmt;

/// Which capability an operation attempted, for diagnostics and for `select`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ChannelOperation {
    /// A send was attempted.
    Send,
    /// A receive was attempted.
    Recv,
}

impl fmt::Display for ChannelOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelOperation::Send => "send".fmt(f),
            ChannelOperation::Recv => "recv".fmt(f),
        }
    }
}

/// The channel has been closed.
///
/// Returned (or wrapped) by every fallible channel operation once the
/// channel's `close()` has been called and no further messages can be
/// delivered through the affected side.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Closed;

impl error::Error for Closed {}

impl fmt::Display for Closed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        "channel is closed".fmt(f)
    }
}

/// The root error returned by [`select`](crate::select::select) and
/// [`select_receive`](crate::select::select_receive): every candidate
/// operation turned out to be closed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChannelError {
    /// Every candidate in the select was closed.
    Closed,
    /// A nowait operation found its channel not ready.
    NotReady(ChannelOperation),
}

impl From<Closed> for ChannelError {
    fn from(_: Closed) -> Self {
        ChannelError::Closed
    }
}

impl error::Error for ChannelError {}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::Closed => "channel is closed".fmt(f),
            ChannelError::NotReady(op) => write!(f, "channel not ready for {op}"),
        }
    }
}

/// An error returned when an attempt to send a message asynchronously is
/// unsuccessful because the channel closed while the send was parked.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct SendError<M>(pub M);

impl<M> error::Error for SendError<M> {}

impl<M> fmt::Debug for SendError<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendError").finish_non_exhaustive()
    }
}

impl<M> fmt::Display for SendError<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        "sending into a closed channel".fmt(f)
    }
}

/// An error returned when an attempt to receive a message asynchronously is
/// unsuccessful because the channel closed with nothing left to deliver.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RecvError;

impl error::Error for RecvError {}

impl fmt::Display for RecvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        "receiving from a closed channel".fmt(f)
    }
}

/// An error returned when a non-blocking send fails.
#[derive(Clone, Copy, Eq, PartialEq)]
pub enum TrySendError<M> {
    /// The channel is not ready to accept a message right now.
    NotReady(M),
    /// The channel is closed.
    Closed(M),
}

impl<M> error::Error for TrySendError<M> {}

impl<M> fmt::Debug for TrySendError<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrySendError::NotReady(_) => f.debug_tuple("NotReady").field(&"..").finish(),
            TrySendError::Closed(_) => f.debug_tuple("Closed").field(&"..").finish(),
        }
    }
}

impl<M> fmt::Display for TrySendError<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrySendError::NotReady(_) => "channel not ready".fmt(f),
            TrySendError::Closed(_) => "channel is closed".fmt(f),
        }
    }
}

/// An error returned when a non-blocking receive fails.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TryRecvError {
    /// The channel has no message to deliver right now.
    NotReady,
    /// The channel is closed and has nothing left to deliver.
    Closed,
}

impl error::Error for TryRecvError {}

impl fmt::Display for TryRecvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryRecvError::NotReady => "channel not ready".fmt(f),
            TryRecvError::Closed => "channel is closed".fmt(f),
        }
    }
}
