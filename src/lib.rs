//! ringkit - lock-free duplex request/reply channel and randomised
//! priority queues
//!
//! Two pieces that share one concern — moving work between two threads
//! without a global lock:
//!
//! - [`spsc::Spsc`] and [`channel`]: a bidirectional request/reply channel
//!   built from a pair of single-producer/single-consumer queues, with a
//!   small control-message protocol so the responder can sleep between
//!   requests instead of busy-polling.
//! - [`quickheap::QuickHeap`] and [`lst::Lst`]: two randomised priority
//!   queues over a shared circular-array/pivot-stack skeleton — quickheap is
//!   incremental quicksort, the leftmost skeleton tree adds O(1) amortised
//!   arbitrary-element removal via a back-index.
//!
//! # Example
//!
//! ```
//! use ringkit_rs::{Lst, Indexed, REMOVED};
//!
//! #[derive(Clone, Copy)]
//! struct Item(u64, i32);
//!
//! impl Indexed for Item {
//!     fn back_index(&self) -> i32 {
//!         self.1
//!     }
//!     fn set_back_index(&mut self, index: i32) {
//!         self.1 = index;
//!     }
//! }
//!
//! let mut lst: Lst<Item, _> = Lst::new(16, 4, |a: &Item, b: &Item| a.0.cmp(&b.0));
//! lst.insert(Item(3, REMOVED)).unwrap();
//! lst.insert(Item(1, REMOVED)).unwrap();
//! lst.insert(Item(2, REMOVED)).unwrap();
//! assert_eq!(lst.pop().map(|i| i.0), Some(1));
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod indexed;
mod invariants;
pub mod lst;
mod pivot_stack;
pub mod quickheap;
pub mod spsc;

pub use channel::{
    Channel, ChannelId, ChannelMetrics, ControlMessage, ControlPlane, DataDescriptor, Event,
    ReplyEnvelope, RequestEnvelope, RequestorHandle, ResponderHandle, RingControlPlane, Signal,
};
pub use config::{Config, Priority, SignalPolicy, CONSERVATIVE_SIGNALING_CONFIG, DEFAULT_CONFIG};
pub use error::{ChannelError, HeapError};
pub use indexed::{Indexed, REMOVED};
pub use lst::Lst;
pub use quickheap::{HeapMetrics, QuickHeap};
pub use spsc::Spsc;
