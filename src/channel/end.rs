use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::config::SignalPolicy;
use crate::invariants::{
    debug_assert_ack_le_sequence, debug_assert_peer_view_bounded, debug_assert_sequence_contiguous,
    debug_assert_stamp_monotonic,
};

/// Per-direction bookkeeping for one end of a [`super::channel::Channel`].
///
/// Everything here is single-owner and touched only by the thread that owns
/// this end, except [`EndState::their_view_of_my_sequence`], which the
/// peer's reader publishes and this end's writer reads as a pure
/// suppression heuristic.
pub struct EndState {
    sequence: u64,
    ack: u64,
    sequence_at_last_signal: u64,
    their_view_of_my_sequence: AtomicU64,
    num_packets: u64,
    num_signals: u64,
    num_resignals: u64,
    num_kevents: u64,
    last_write: Instant,
    last_read_other: Instant,
    last_sent_signal: Instant,
    mean_interval: Duration,
    mean_processing_time: Duration,
    ema_inverse_alpha: u64,
    must_signal: bool,
}

impl EndState {
    #[must_use]
    pub fn new(now: Instant, ema_inverse_alpha: u64) -> Self {
        Self {
            sequence: 0,
            ack: 0,
            sequence_at_last_signal: 0,
            their_view_of_my_sequence: AtomicU64::new(0),
            num_packets: 0,
            num_signals: 0,
            num_resignals: 0,
            num_kevents: 0,
            last_write: now,
            last_read_other: now,
            last_sent_signal: now,
            mean_interval: Duration::ZERO,
            mean_processing_time: Duration::ZERO,
            ema_inverse_alpha,
            must_signal: false,
        }
    }

    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    #[must_use]
    pub fn ack(&self) -> u64 {
        self.ack
    }

    /// Outstanding count as seen from the requestor side: sent requests not
    /// yet acknowledged by a reply.
    #[must_use]
    pub fn requestor_outstanding(&self) -> u64 {
        self.sequence.saturating_sub(self.ack)
    }

    /// Outstanding count as seen from the responder side: requests observed
    /// but not yet answered with a reply.
    #[must_use]
    pub fn responder_outstanding(&self) -> u64 {
        self.ack.saturating_sub(self.num_packets)
    }

    #[must_use]
    pub fn num_packets(&self) -> u64 {
        self.num_packets
    }

    #[must_use]
    pub fn num_signals(&self) -> u64 {
        self.num_signals
    }

    #[must_use]
    pub fn num_resignals(&self) -> u64 {
        self.num_resignals
    }

    #[must_use]
    pub fn num_kevents(&self) -> u64 {
        self.num_kevents
    }

    #[must_use]
    pub fn mean_interval(&self) -> Duration {
        self.mean_interval
    }

    /// Reads the peer's most recently published view of this end's
    /// sequence (the suppression heuristic). Acquire is sufficient: this
    /// value never gates correctness, only whether a signal is skipped.
    #[must_use]
    pub fn their_view_of_my_sequence(&self) -> u64 {
        let view = self.their_view_of_my_sequence.load(Ordering::Acquire);
        debug_assert_peer_view_bounded!(view, self.sequence);
        view
    }

    pub fn record_kevent(&mut self) {
        self.num_kevents += 1;
    }

    /// Advances `sequence`, stamps `last_write`, folds the inter-send gap
    /// into the interval EMA with weight `1/ema_inverse_alpha`, and bumps
    /// the packet counter for an outbound descriptor. Returns `(sequence,
    /// ack)` to stamp onto the descriptor — `ack` is this end's current
    /// acknowledgement of the peer's sequence (see [`EndState::record_recv`]).
    /// Used by both a requestor sending a request and a responder sending a
    /// reply; which of [`EndState::requestor_outstanding`] or
    /// [`EndState::responder_outstanding`] applies depends only on which end
    /// this is, not on this method.
    pub fn record_send(&mut self, now: Instant) -> (u64, u64) {
        let sample = now.saturating_duration_since(self.last_write);
        self.mean_interval = ema(self.mean_interval, sample, self.ema_inverse_alpha);
        debug_assert_stamp_monotonic!("last_write", self.last_write, now);
        self.last_write = now;
        self.sequence += 1;
        self.num_packets += 1;
        debug_assert_ack_le_sequence!(self.ack, self.sequence);
        (self.sequence, self.ack)
    }

    /// Folds a reply's round-trip processing time into its own EMA, unless
    /// it is zero (a NAK, conventionally excluded from the average).
    pub fn record_reply_processing_time(&mut self, processing_time: Duration) {
        if processing_time != Duration::ZERO {
            self.mean_processing_time =
                ema(self.mean_processing_time, processing_time, self.ema_inverse_alpha);
        }
    }

    #[must_use]
    pub fn mean_processing_time(&self) -> Duration {
        self.mean_processing_time
    }

    /// Folds an inbound descriptor's `sequence` (the peer's own counter,
    /// must be exactly one more than the last one observed) and `ack` (the
    /// peer's acknowledgement of *our* sequence) into this end's state:
    /// `sequence` becomes our new `ack` to send back, and `ack` is
    /// published as `their_view_of_my_sequence` for our writer to read.
    pub fn record_recv(&mut self, now: Instant, observed_sequence: u64, observed_ack: u64) {
        debug_assert_sequence_contiguous!(self.ack, observed_sequence);
        debug_assert_stamp_monotonic!("last_read_other", self.last_read_other, now);
        self.last_read_other = now;
        self.ack = observed_sequence;
        self.their_view_of_my_sequence.store(observed_ack, Ordering::Release);
    }

    /// Conservative predicate: signal unless the peer has already caught up
    /// to the sequence we signaled about last time.
    #[must_use]
    pub fn should_signal(&self, their_view: u64) -> bool {
        self.sequence_at_last_signal <= their_view
    }

    /// Applies `policy` on top of [`EndState::should_signal`]. `WindowedSkip`
    /// can only turn a `true` (conservative says signal) into `false`: when
    /// the peer is already within `window` of the last-signaled sequence and
    /// both `last_sent_signal` and `last_read_other` are fresher than one
    /// mean interval, the peer is assumed to be about to notice the new work
    /// on its own. It can never suppress a signal the conservative predicate
    /// already would not have sent.
    #[must_use]
    pub fn should_signal_with_policy(
        &self,
        policy: SignalPolicy,
        their_view: u64,
        now: Instant,
    ) -> bool {
        if !self.should_signal(their_view) {
            return false;
        }
        match policy {
            SignalPolicy::Conservative => true,
            SignalPolicy::WindowedSkip { window } => {
                let within_window = their_view.saturating_sub(self.sequence_at_last_signal) <= window;
                let signal_fresh = now.saturating_duration_since(self.last_sent_signal) < self.mean_interval;
                let read_fresh = now.saturating_duration_since(self.last_read_other) < self.mean_interval;
                !(within_window && signal_fresh && read_fresh)
            }
        }
    }

    pub fn record_signal(&mut self, now: Instant) {
        self.sequence_at_last_signal = self.sequence;
        self.last_sent_signal = now;
        self.num_signals += 1;
    }

    pub fn record_resignal(&mut self) {
        self.num_resignals += 1;
    }

    #[must_use]
    pub fn must_signal(&self) -> bool {
        self.must_signal
    }

    pub fn set_must_signal(&mut self, value: bool) {
        self.must_signal = value;
    }
}

fn ema(old: Duration, sample: Duration, inverse_alpha: u64) -> Duration {
    (sample + old * (inverse_alpha as u32 - 1).max(1)) / (inverse_alpha as u32).max(1)
}
