use thiserror::Error;

/// Errors returned by the quickheap/LST priority-queue family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeapError {
    /// The pivot stack or circular array could not be grown.
    #[error("allocation failed while growing capacity from {old} to {new}")]
    AllocationFailed {
        /// Capacity before the failed growth attempt.
        old: usize,
        /// Capacity that was requested.
        new: usize,
    },
    /// `extract(x)` was called with an element that is not currently stored.
    #[error("element not found")]
    NotFound,
}

/// Errors returned by the duplex channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The channel (or this end of it) has already been closed.
    #[error("channel is inactive")]
    Inactive,
    /// The outbound SPSC queue is full; caller should apply backpressure.
    #[error("outbound queue is full")]
    QueueFull,
    /// The control-plane transport could not deliver a message.
    ///
    /// Only ever returned for control-only operations (open/close/sleeping);
    /// the data path ignores transport failures because the data itself is
    /// already queued.
    #[error("control-plane transport failed")]
    TransportFailed,
}
