/// The suppression predicate used before sending a wake-up signal to the
/// requestor after a reply is queued.
///
/// `Conservative` always signals unless the peer has already seen the new
/// sequence number, and is the default. `WindowedSkip` re-derives a richer
/// predicate left disabled upstream (`ENABLE_SKIPS`/`SIGNAL_INTERVAL`); it
/// must be opted into explicitly, never enabled silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalPolicy {
    /// Always signal unless `sequence_at_last_signal > their_view_of_my_sequence`.
    Conservative,
    /// Additionally skip signaling when the peer is already within `window`
    /// sequence numbers of the last signal and has read/signaled recently.
    WindowedSkip {
        /// How many sequence numbers of slack to tolerate before re-signaling.
        window: u64,
    },
}

impl Default for SignalPolicy {
    fn default() -> Self {
        Self::Conservative
    }
}

/// Configuration for the SPSC queues and the quickheap/LST containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// SPSC ring capacity, as a power of two. Default 1024.
    pub queue_capacity: usize,
    /// Initial circular-array capacity for quickheap/LST. Default 2048.
    pub heap_initial_capacity: usize,
    /// Initial pivot-stack capacity. Default 32.
    pub pivot_stack_initial_capacity: usize,
    /// Inverse alpha for the exponential moving averages. Default 8.
    pub ema_inverse_alpha: u64,
    /// Signal-suppression policy; see [`SignalPolicy`].
    pub signal_policy: SignalPolicy,
}

impl Config {
    /// Creates a new configuration.
    ///
    /// # Panics
    ///
    /// Panics if `queue_capacity`, `heap_initial_capacity` or
    /// `pivot_stack_initial_capacity` is not a power of two, or is zero.
    #[must_use]
    pub const fn new(
        queue_capacity: usize,
        heap_initial_capacity: usize,
        pivot_stack_initial_capacity: usize,
        ema_inverse_alpha: u64,
        signal_policy: SignalPolicy,
    ) -> Self {
        assert!(queue_capacity.is_power_of_two(), "queue_capacity must be a power of two");
        assert!(
            heap_initial_capacity.is_power_of_two(),
            "heap_initial_capacity must be a power of two"
        );
        assert!(
            pivot_stack_initial_capacity > 0,
            "pivot_stack_initial_capacity must be nonzero"
        );
        assert!(ema_inverse_alpha > 0, "ema_inverse_alpha must be nonzero");

        Self {
            queue_capacity,
            heap_initial_capacity,
            pivot_stack_initial_capacity,
            ema_inverse_alpha,
            signal_policy,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(1024, 2048, 32, 8, SignalPolicy::Conservative)
    }
}

/// The default configuration.
pub const DEFAULT_CONFIG: Config = Config::new(1024, 2048, 32, 8, SignalPolicy::Conservative);

/// A configuration that additionally enables the re-derived windowed
/// suppression predicate; opt-in only.
pub const CONSERVATIVE_SIGNALING_CONFIG: Config =
    Config::new(1024, 2048, 32, 8, SignalPolicy::WindowedSkip { window: 4 });

/// Packet-priority buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Lowest urgency.
    Low,
    /// Default urgency.
    Normal,
    /// Above default.
    High,
    /// Must be handled immediately.
    Now,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}
