use std::time::Instant;

/// The payload moved through a channel's SPSC queues.
///
/// The channel only ever reads `when`/`sequence`/`ack`/`processing_time`/
/// `cpu_time`; everything else about the request or reply is opaque to it
/// and lives in whatever the caller embeds alongside (there is no `body`
/// field here on purpose — callers parametrise `Channel<T>` over their own
/// request/reply type and wrap it with the bookkeeping below, see
/// [`crate::channel::RequestEnvelope`] and [`crate::channel::ReplyEnvelope`]).
#[derive(Debug, Clone, Copy)]
pub struct DataDescriptor {
    /// When this descriptor was handed to the channel.
    pub when: Instant,
    /// Monotonically increasing per-direction sequence number.
    pub sequence: u64,
    /// The sender's most recent acknowledgement of the peer's sequence.
    pub ack: u64,
    /// Wall-clock time the responder spent producing this reply. Zero on
    /// requests, and on replies a zero value marks a NAK (excluded from the
    /// processing-time moving average).
    pub processing_time: std::time::Duration,
    /// CPU time accumulated by the responder while producing this reply.
    pub cpu_time: std::time::Duration,
}

impl DataDescriptor {
    /// Builds a request descriptor: `processing_time`/`cpu_time` are zero.
    #[must_use]
    pub fn request(when: Instant, sequence: u64, ack: u64) -> Self {
        Self {
            when,
            sequence,
            ack,
            processing_time: std::time::Duration::ZERO,
            cpu_time: std::time::Duration::ZERO,
        }
    }

    /// Builds a reply descriptor carrying responder timing.
    #[must_use]
    pub fn reply(
        when: Instant,
        sequence: u64,
        ack: u64,
        processing_time: std::time::Duration,
        cpu_time: std::time::Duration,
    ) -> Self {
        Self { when, sequence, ack, processing_time, cpu_time }
    }

    /// A reply carrying no useful work (`null_reply`): counted as a NAK.
    #[must_use]
    pub fn nak(when: Instant, sequence: u64, ack: u64) -> Self {
        Self::reply(when, sequence, ack, std::time::Duration::ZERO, std::time::Duration::ZERO)
    }
}
