use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::{Config, SignalPolicy};
use crate::error::ChannelError;
use crate::spsc::Spsc;

use super::control::{ChannelId, ControlMessage, ControlPlane, Event, Signal};
use super::descriptor::DataDescriptor;
use super::end::EndState;

/// A request moving from requestor to responder: the channel only inspects
/// `descriptor`, `body` is opaque caller data.
#[derive(Debug, Clone)]
pub struct RequestEnvelope<Req> {
    pub descriptor: DataDescriptor,
    pub body: Req,
}

/// A reply moving from responder to requestor. `body` is `None` for a
/// [`ResponderHandle::null_reply`] — the sequence/ack protocol still runs,
/// but nothing is handed to the requestor's callback.
#[derive(Debug, Clone)]
pub struct ReplyEnvelope<Rep> {
    pub descriptor: DataDescriptor,
    pub body: Option<Rep>,
}

#[derive(Debug, Clone, Copy, Default)]
struct ResponderTiming {
    processing_time: Duration,
    cpu_time: Duration,
}

/// Aggregated, non-atomic snapshot of a channel's accounting, for
/// diagnostics and tests; never gates correctness.
#[derive(Debug, Clone, Copy)]
pub struct ChannelMetrics {
    pub requestor_sequence: u64,
    pub requestor_ack: u64,
    pub requestor_outstanding: u64,
    pub requestor_packets: u64,
    pub requestor_signals: u64,
    pub requestor_resignals: u64,
    pub responder_sequence: u64,
    pub responder_ack: u64,
    pub responder_outstanding: u64,
    pub responder_packets: u64,
    pub total_processing_time: Duration,
    pub total_cpu_time: Duration,
    pub active: bool,
}

struct ChannelInner<Req, Rep> {
    id: ChannelId,
    to_responder: Spsc<RequestEnvelope<Req>>,
    to_requestor: Spsc<ReplyEnvelope<Rep>>,
    active: AtomicBool,
    same_thread: bool,
    signal_policy: SignalPolicy,
    requestor_control: Box<dyn ControlPlane>,
    responder_control: Box<dyn ControlPlane>,
    #[allow(clippy::type_complexity)]
    request_callback: Mutex<Option<Box<dyn FnMut(RequestEnvelope<Req>) + Send>>>,
    #[allow(clippy::type_complexity)]
    reply_callback: Mutex<Option<Box<dyn FnMut(ReplyEnvelope<Rep>) + Send>>>,
    requestor_end: Mutex<EndState>,
    responder_end: Mutex<EndState>,
    responder_timing: Mutex<ResponderTiming>,
}

/// Administrative handle shared by whichever thread services the
/// control-plane event loop: `service_message`, `service_kevent`, `active`,
/// `signal_open`, `debug`. Cheap to clone (an `Arc` bump).
pub struct Channel<Req, Rep> {
    inner: Arc<ChannelInner<Req, Rep>>,
}

impl<Req, Rep> Clone for Channel<Req, Rep> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

/// Exclusive, non-`Clone` handle for the thread that sends requests and
/// receives replies. Mirrors the "one writer, one reader per direction"
/// discipline by construction rather than by convention.
pub struct RequestorHandle<Req, Rep> {
    inner: Arc<ChannelInner<Req, Rep>>,
}

/// Exclusive, non-`Clone` handle for the thread that receives requests and
/// sends replies.
pub struct ResponderHandle<Req, Rep> {
    inner: Arc<ChannelInner<Req, Rep>>,
}

// Safety: each handle's mutable state (EndState) lives behind a Mutex, and
// the SPSC queues are themselves Send/Sync for Send payloads; no handle is
// Clone, so at most one instance of each exists to move to its owning
// thread.
unsafe impl<Req: Send, Rep: Send> Send for RequestorHandle<Req, Rep> {}
unsafe impl<Req: Send, Rep: Send> Send for ResponderHandle<Req, Rep> {}

impl<Req, Rep> Channel<Req, Rep> {
    /// Creates a channel in the active state, seeding both ends with the
    /// current timestamp, and returns the administrative handle plus the
    /// two direction-exclusive handles.
    #[must_use]
    pub fn create(
        id: ChannelId,
        requestor_control: impl ControlPlane + 'static,
        responder_control: impl ControlPlane + 'static,
        same_thread: bool,
        config: Config,
    ) -> (Channel<Req, Rep>, RequestorHandle<Req, Rep>, ResponderHandle<Req, Rep>) {
        let now = Instant::now();
        let inner = Arc::new(ChannelInner {
            id,
            to_responder: Spsc::new(config.queue_capacity),
            to_requestor: Spsc::new(config.queue_capacity),
            active: AtomicBool::new(true),
            same_thread,
            signal_policy: config.signal_policy,
            requestor_control: Box::new(requestor_control),
            responder_control: Box::new(responder_control),
            request_callback: Mutex::new(None),
            reply_callback: Mutex::new(None),
            requestor_end: Mutex::new(EndState::new(now, config.ema_inverse_alpha)),
            responder_end: Mutex::new(EndState::new(now, config.ema_inverse_alpha)),
            responder_timing: Mutex::new(ResponderTiming::default()),
        });
        (
            Channel { inner: Arc::clone(&inner) },
            RequestorHandle { inner: Arc::clone(&inner) },
            ResponderHandle { inner },
        )
    }

    #[must_use]
    pub fn id(&self) -> ChannelId {
        self.inner.id
    }

    #[must_use]
    pub fn active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Hands the channel off to the responder by sending an `Open` signal.
    pub fn signal_open(&self) -> Result<(), ChannelError> {
        self.inner.requestor_control.send(ControlMessage {
            signal: Signal::Open,
            ack: 0,
            channel_ref: self.inner.id,
        })
    }

    /// Demultiplexes one already-decoded control message. Translates
    /// `DataDoneResponder`/`ResponderSleeping` into their public `Event`s
    /// and flags the requestor end so a future send knows a signal was
    /// already owed; unconditionally re-nudges the responder afterward,
    /// since receipt of any control message means the responder may have
    /// fallen behind or gone idle.
    pub fn service_message(&self, message: ControlMessage) -> Event {
        let event = match message.signal {
            Signal::Error => Event::Error,
            Signal::DataToResponder => Event::DataToResponder,
            Signal::DataToRequestor => Event::DataToRequestor,
            Signal::Open => Event::Open,
            Signal::Close => Event::Close,
            Signal::DataDoneResponder => {
                self.inner.requestor_end.lock().unwrap().set_must_signal(true);
                Event::DataReadyRequestor
            }
            Signal::ResponderSleeping => {
                self.inner.requestor_end.lock().unwrap().set_must_signal(true);
                Event::Noop
            }
        };
        let _ = self.inner.responder_control.send(ControlMessage {
            signal: Signal::DataToResponder,
            ack: message.ack,
            channel_ref: self.inner.id,
        });
        self.inner.requestor_end.lock().unwrap().record_resignal();
        event
    }

    /// Accounting hook for a wakeup on the control-plane's notification
    /// descriptor; bumps both ends' kevent counters.
    pub fn service_kevent(&self) {
        self.inner.requestor_end.lock().unwrap().record_kevent();
        self.inner.responder_end.lock().unwrap().record_kevent();
    }

    /// Either end may initiate close. `ack` on the resulting `Close`
    /// message identifies which side: 0 for the responder-bound end, 1
    /// for the requestor-bound end.
    pub fn signal_responder_close(&self) -> Result<(), ChannelError> {
        self.inner.active.store(false, Ordering::Release);
        self.inner.requestor_control.send(ControlMessage {
            signal: Signal::Close,
            ack: 0,
            channel_ref: self.inner.id,
        })
    }

    pub fn responder_ack_close(&self) -> Result<(), ChannelError> {
        self.inner.active.store(false, Ordering::Release);
        self.inner.responder_control.send(ControlMessage {
            signal: Signal::Close,
            ack: 1,
            channel_ref: self.inner.id,
        })
    }

    #[must_use]
    pub fn metrics(&self) -> ChannelMetrics {
        let requestor = self.inner.requestor_end.lock().unwrap();
        let responder = self.inner.responder_end.lock().unwrap();
        let timing = *self.inner.responder_timing.lock().unwrap();
        ChannelMetrics {
            requestor_sequence: requestor.sequence(),
            requestor_ack: requestor.ack(),
            requestor_outstanding: requestor.requestor_outstanding(),
            requestor_packets: requestor.num_packets(),
            requestor_signals: requestor.num_signals(),
            requestor_resignals: requestor.num_resignals(),
            responder_sequence: responder.sequence(),
            responder_ack: responder.ack(),
            responder_outstanding: responder.responder_outstanding(),
            responder_packets: responder.num_packets(),
            total_processing_time: timing.processing_time,
            total_cpu_time: timing.cpu_time,
            active: self.active(),
        }
    }

    /// Writes a human-readable dump of the channel's accounting state.
    pub fn debug(&self, sink: &mut impl std::io::Write) -> std::io::Result<()> {
        let m = self.metrics();
        writeln!(sink, "channel {:?} active={}", self.inner.id, m.active)?;
        writeln!(
            sink,
            "  requestor: sequence={} ack={} outstanding={} packets={} signals={} resignals={}",
            m.requestor_sequence,
            m.requestor_ack,
            m.requestor_outstanding,
            m.requestor_packets,
            m.requestor_signals,
            m.requestor_resignals
        )?;
        writeln!(
            sink,
            "  responder: sequence={} ack={} outstanding={} packets={}",
            m.responder_sequence, m.responder_ack, m.responder_outstanding, m.responder_packets
        )?;
        writeln!(
            sink,
            "  accumulated responder timing: processing={:?} cpu={:?}",
            m.total_processing_time, m.total_cpu_time
        )
    }
}

impl<Req, Rep> RequestorHandle<Req, Rep> {
    pub fn set_recv_reply(&self, callback: impl FnMut(ReplyEnvelope<Rep>) + Send + 'static) {
        *self.inner.reply_callback.lock().unwrap() = Some(Box::new(callback));
    }

    /// Sends a request. On the same-thread fast path this invokes the
    /// responder's receive callback synchronously, touching no counters
    /// and no queue. Otherwise the descriptor is queued and a
    /// `DataToResponder` signal is sent (transport failures on this path
    /// are ignored — the data itself is already queued).
    pub fn send_request(&self, now: Instant, body: Req) -> Result<(), ChannelError> {
        if self.inner.same_thread {
            if let Some(cb) = self.inner.request_callback.lock().unwrap().as_mut() {
                cb(RequestEnvelope { descriptor: DataDescriptor::request(now, 0, 0), body });
            }
            return Ok(());
        }

        let (sequence, ack) = self.inner.requestor_end.lock().unwrap().record_send(now);
        let envelope = RequestEnvelope { descriptor: DataDescriptor::request(now, sequence, ack), body };
        if !self.inner.to_responder.push(envelope) {
            self.drain_replies();
            return Err(ChannelError::QueueFull);
        }
        let _ = self.inner.requestor_control.send(ControlMessage {
            signal: Signal::DataToResponder,
            ack: 0,
            channel_ref: self.inner.id,
        });
        // send_request never suppresses, so any must_signal hint set by the
        // demultiplexer is honored by construction; clear it so it does not
        // linger stale for the next read of `Channel::debug`.
        self.inner.requestor_end.lock().unwrap().set_must_signal(false);
        Ok(())
    }

    /// Pops and dispatches one reply, if any is queued. Returns whether a
    /// reply was popped.
    pub fn recv_reply(&self) -> bool {
        let Some(envelope) = self.inner.to_requestor.pop() else {
            return false;
        };
        {
            let mut end = self.inner.requestor_end.lock().unwrap();
            end.record_recv(Instant::now(), envelope.descriptor.sequence, envelope.descriptor.ack);
            end.record_reply_processing_time(envelope.descriptor.processing_time);
        }
        if let Some(cb) = self.inner.reply_callback.lock().unwrap().as_mut() {
            cb(envelope);
        }
        true
    }

    fn drain_replies(&self) {
        while self.recv_reply() {}
    }

    #[must_use]
    pub fn active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    pub fn signal_responder_close(&self) -> Result<(), ChannelError> {
        self.inner.active.store(false, Ordering::Release);
        self.inner.requestor_control.send(ControlMessage {
            signal: Signal::Close,
            ack: 0,
            channel_ref: self.inner.id,
        })
    }

    pub fn responder_ack_close(&self) -> Result<(), ChannelError> {
        self.inner.active.store(false, Ordering::Release);
        self.inner.responder_control.send(ControlMessage {
            signal: Signal::Close,
            ack: 1,
            channel_ref: self.inner.id,
        })
    }
}

impl<Req, Rep> ResponderHandle<Req, Rep> {
    pub fn set_recv_request(&self, callback: impl FnMut(RequestEnvelope<Req>) + Send + 'static) {
        *self.inner.request_callback.lock().unwrap() = Some(Box::new(callback));
    }

    /// Sends a reply carrying `body` plus the responder's timing for this
    /// request. Refuses if the channel is inactive. Same-thread fast path
    /// as in `send_request`.
    pub fn send_reply(
        &self,
        now: Instant,
        body: Rep,
        processing_time: Duration,
        cpu_time: Duration,
    ) -> Result<(), ChannelError> {
        if !self.inner.active.load(Ordering::Acquire) {
            return Err(ChannelError::Inactive);
        }

        if self.inner.same_thread {
            if let Some(cb) = self.inner.reply_callback.lock().unwrap().as_mut() {
                cb(ReplyEnvelope {
                    descriptor: DataDescriptor::reply(now, 0, 0, processing_time, cpu_time),
                    body: Some(body),
                });
            }
            self.accumulate_timing(processing_time, cpu_time);
            return Ok(());
        }

        self.send_reply_descriptor(now, Some(body), processing_time, cpu_time)
    }

    /// Advances the responder's sequence without delivering anything: the
    /// peer still observes a contiguous sequence, but no body reaches its
    /// callback. Runs the full protocol even on the same-thread path.
    pub fn null_reply(&self, now: Instant) -> Result<(), ChannelError> {
        if !self.inner.active.load(Ordering::Acquire) {
            return Err(ChannelError::Inactive);
        }
        self.send_reply_descriptor(now, None, Duration::ZERO, Duration::ZERO)
    }

    fn send_reply_descriptor(
        &self,
        now: Instant,
        body: Option<Rep>,
        processing_time: Duration,
        cpu_time: Duration,
    ) -> Result<(), ChannelError> {
        let (sequence, ack) = self.inner.responder_end.lock().unwrap().record_send(now);
        let descriptor = if body.is_none() {
            DataDescriptor::nak(now, sequence, ack)
        } else {
            DataDescriptor::reply(now, sequence, ack, processing_time, cpu_time)
        };
        let envelope = ReplyEnvelope { descriptor, body };
        if !self.inner.to_requestor.push(envelope) {
            self.drain_requests();
            return Err(ChannelError::QueueFull);
        }
        self.accumulate_timing(processing_time, cpu_time);
        self.drain_requests();

        let num_outstanding = self.inner.responder_end.lock().unwrap().responder_outstanding();
        if num_outstanding == 0 {
            let _ = self.inner.responder_control.send(ControlMessage {
                signal: Signal::DataDoneResponder,
                ack,
                channel_ref: self.inner.id,
            });
            return Ok(());
        }

        let their_view = self.inner.responder_end.lock().unwrap().their_view_of_my_sequence();
        let should_signal = self
            .inner
            .responder_end
            .lock()
            .unwrap()
            .should_signal_with_policy(self.inner.signal_policy, their_view, now);
        if should_signal {
            let _ = self.inner.responder_control.send(ControlMessage {
                signal: Signal::DataToRequestor,
                ack,
                channel_ref: self.inner.id,
            });
            self.inner.responder_end.lock().unwrap().record_signal(now);
        }
        Ok(())
    }

    fn accumulate_timing(&self, processing_time: Duration, cpu_time: Duration) {
        let mut timing = self.inner.responder_timing.lock().unwrap();
        timing.processing_time += processing_time;
        timing.cpu_time += cpu_time;
    }

    /// Pops and dispatches one request, if any is queued.
    pub fn recv_request(&self) -> bool {
        let Some(envelope) = self.inner.to_responder.pop() else {
            return false;
        };
        self.inner.responder_end.lock().unwrap().record_recv(
            Instant::now(),
            envelope.descriptor.sequence,
            envelope.descriptor.ack,
        );
        if let Some(cb) = self.inner.request_callback.lock().unwrap().as_mut() {
            cb(envelope);
        }
        true
    }

    fn drain_requests(&self) {
        while self.recv_request() {}
    }

    /// The responder has nothing left to do. If it still has outstanding
    /// work the requestor doesn't know about, nudge the requestor so it
    /// re-wakes the responder later; otherwise this is a no-op.
    pub fn responder_sleeping(&self) -> Result<(), ChannelError> {
        let outstanding = self.inner.responder_end.lock().unwrap().responder_outstanding();
        if outstanding > 0 {
            self.inner.responder_control.send(ControlMessage {
                signal: Signal::ResponderSleeping,
                ack: 0,
                channel_ref: self.inner.id,
            })
        } else {
            Ok(())
        }
    }

    #[must_use]
    pub fn active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }
}
