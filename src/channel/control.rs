use std::sync::Arc;

use crate::error::ChannelError;
use crate::spsc::Spsc;

/// Arena-scoped handle to a channel, carried inside a [`ControlMessage`]
/// instead of a raw back-pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(pub u64);

/// Wire-level signal carried by a [`ControlMessage`].
///
/// The first five variants share numeric space with [`Event`]; the last two
/// are demultiplexed into a different `Event` by
/// [`super::channel::Channel::service_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Signal {
    Error = 0,
    DataToResponder = 1,
    DataToRequestor = 2,
    Open = 3,
    Close = 4,
    DataDoneResponder = 5,
    ResponderSleeping = 6,
}

/// The public event returned to a caller after demultiplexing a
/// [`ControlMessage`] via `service_message`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Error,
    DataToResponder,
    DataToRequestor,
    Open,
    Close,
    /// Translated from [`Signal::DataDoneResponder`].
    DataReadyRequestor,
    /// Translated from [`Signal::ResponderSleeping`]; no action required.
    Noop,
}

/// Fixed-size control-plane record: `{ signal, ack, channel_ref }`.
///
/// `ack` doubles as the close-handshake side indicator when `signal ==
/// Close` (`0` = responder-bound end closed, `1` = requestor-bound end
/// closed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlMessage {
    pub signal: Signal,
    pub ack: u64,
    pub channel_ref: ChannelId,
}

/// The channel's only dependency on an external transport: handing a
/// fixed-size [`ControlMessage`] off to whatever carries the
/// event-notification byte (an eventfd, a kqueue user event, …) on the
/// other side. Sending is the only operation the channel protocol needs;
/// receiving/demultiplexing is a property of the transport's own event
/// loop, modeled here only far enough to make the crate a runnable whole.
pub trait ControlPlane: Send + Sync {
    /// Attempts to deliver `message`. Transport failure is reported but,
    /// per the data-path error design, is ignored by callers on the data
    /// path and propagated only on control-only paths (open/close/sleeping).
    fn send(&self, message: ControlMessage) -> Result<(), ChannelError>;
}

/// An in-process [`ControlPlane`] backed by a [`Spsc`] of control records,
/// standing in for the ring-buffer-plus-eventfd transport external to this
/// crate. Used by tests and benches; a real deployment supplies its own
/// `ControlPlane` bridging to its actual notification mechanism.
pub struct RingControlPlane {
    ring: Arc<Spsc<ControlMessage>>,
}

impl RingControlPlane {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { ring: Arc::new(Spsc::new(capacity)) }
    }

    /// Polls for the next pending control message, if any. Stands in for
    /// the external event loop waking on the notification descriptor and
    /// draining the ring.
    pub fn poll(&self) -> Option<ControlMessage> {
        self.ring.pop()
    }
}

impl Clone for RingControlPlane {
    fn clone(&self) -> Self {
        Self { ring: Arc::clone(&self.ring) }
    }
}

impl ControlPlane for RingControlPlane {
    fn send(&self, message: ControlMessage) -> Result<(), ChannelError> {
        if self.ring.push(message) {
            Ok(())
        } else {
            Err(ChannelError::TransportFailed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_control_plane_roundtrips_a_message() {
        let cp = RingControlPlane::new(8);
        let msg = ControlMessage { signal: Signal::Open, ack: 0, channel_ref: ChannelId(7) };
        cp.send(msg).unwrap();
        assert_eq!(cp.poll(), Some(msg));
        assert_eq!(cp.poll(), None);
    }

    #[test]
    fn ring_control_plane_reports_transport_failure_when_full() {
        let cp = RingControlPlane::new(1);
        let msg = ControlMessage { signal: Signal::Close, ack: 1, channel_ref: ChannelId(1) };
        cp.send(msg).unwrap();
        assert_eq!(cp.send(msg), Err(ChannelError::TransportFailed));
    }
}
