//! Debug assertion macros for the container and channel invariants.
//!
//! Active only in debug builds (`#[cfg(debug_assertions)]`), so there is
//! zero overhead in release builds. Used by `spsc`, `quickheap`, `lst` and
//! `channel`.

// =============================================================================
// Conservation: num_elements == reduce(idx + num_elements) walk
// =============================================================================

/// Assert the fictitious pivot always sits `num_elements` slots ahead of `idx`.
macro_rules! debug_assert_fictitious_pivot {
    ($fictitious:expr, $idx:expr, $num_elements:expr, $capacity:expr) => {
        debug_assert!(
            $fictitious == ($idx + $num_elements) % $capacity,
            "fictitious pivot {} does not equal reduce(idx {} + num_elements {})",
            $fictitious,
            $idx,
            $num_elements
        )
    };
}

// =============================================================================
// Pivots strictly increasing along the circular walk
// =============================================================================

/// Assert that two adjacent circular distances from `idx` are strictly increasing.
macro_rules! debug_assert_pivots_increasing {
    ($lower:expr, $higher:expr) => {
        debug_assert!(
            $lower < $higher,
            "pivot stack not strictly increasing along the circular walk: {} >= {}",
            $lower,
            $higher
        )
    };
}

// =============================================================================
// Back-index consistency, ack bound
// =============================================================================

/// Assert a live element's stored back-index equals its reduced array position.
macro_rules! debug_assert_back_index {
    ($stored:expr, $actual:expr) => {
        debug_assert!(
            $stored == $actual,
            "back-index {} does not match actual position {}",
            $stored,
            $actual
        )
    };
}

/// Assert `ack <= sequence` for a channel end.
macro_rules! debug_assert_ack_le_sequence {
    ($ack:expr, $sequence:expr) => {
        debug_assert!(
            $ack <= $sequence,
            "ack {} exceeds sequence {}",
            $ack,
            $sequence
        )
    };
}

/// Assert `their_view_of_my_sequence <= sequence`.
macro_rules! debug_assert_peer_view_bounded {
    ($their_view:expr, $sequence:expr) => {
        debug_assert!(
            $their_view <= $sequence,
            "peer's view of our sequence {} exceeds our sequence {}",
            $their_view,
            $sequence
        )
    };
}

/// Assert a wall-clock stamp field only moves forward.
macro_rules! debug_assert_stamp_monotonic {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new >= $old,
            "{} went backwards: {:?} -> {:?}",
            $name,
            $old,
            $new
        )
    };
}

/// Assert a sequence number observed on an inbound queue increases by exactly one.
macro_rules! debug_assert_sequence_contiguous {
    ($last:expr, $observed:expr) => {
        debug_assert!(
            $observed == $last + 1,
            "non-contiguous sequence: expected {}, observed {}",
            $last + 1,
            $observed
        )
    };
}

/// Assert an SPSC ring never holds more than its capacity.
macro_rules! debug_assert_bounded_count {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "count {} exceeds capacity {}",
            $count,
            $capacity
        )
    };
}

pub(crate) use debug_assert_ack_le_sequence;
pub(crate) use debug_assert_back_index;
pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_fictitious_pivot;
pub(crate) use debug_assert_peer_view_bounded;
pub(crate) use debug_assert_pivots_increasing;
pub(crate) use debug_assert_sequence_contiguous;
pub(crate) use debug_assert_stamp_monotonic;
