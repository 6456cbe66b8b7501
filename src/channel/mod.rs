//! A duplex, two-thread request/reply channel: a requestor and a responder
//! trade [`descriptor::DataDescriptor`]-stamped payloads over a pair of
//! [`crate::spsc::Spsc`] queues, coordinated by a small
//! [`control::ControlMessage`] protocol so the responder can be asleep
//! between requests without the requestor busy-polling.

pub mod channel;
pub mod control;
pub mod descriptor;
pub mod end;

pub use channel::{
    Channel, ChannelMetrics, ReplyEnvelope, RequestEnvelope, RequestorHandle, ResponderHandle,
};
pub use control::{ChannelId, ControlMessage, ControlPlane, Event, RingControlPlane, Signal};
pub use descriptor::DataDescriptor;
