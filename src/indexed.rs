/// Accessor for an element's cached back-index into a container's circular
/// array.
///
/// [`crate::lst::Lst`] requires it so that `extract(x)` can find `x`'s
/// current array slot in O(1) rather than scanning. [`crate::quickheap::QuickHeap`]
/// does not require it, since it only ever removes the current minimum.
///
/// A back-index of `-1` marks an element that has been removed from the
/// container.
pub trait Indexed {
    /// Returns the element's cached back-index, or `-1` if not tracked.
    fn back_index(&self) -> i32;

    /// Updates the element's cached back-index.
    fn set_back_index(&mut self, index: i32);
}

/// Sentinel back-index meaning "removed" / "not currently stored".
pub const REMOVED: i32 = -1;
