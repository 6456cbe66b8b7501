use std::cmp::Ordering;
use std::fmt;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::error::HeapError;
use crate::invariants::{debug_assert_bounded_count, debug_assert_fictitious_pivot};
use crate::pivot_stack::PivotStack;

/// Aggregated, non-atomic snapshot of a heap's lifetime operation counts.
///
/// Cheap to compute from the fields a heap already tracks; useful for
/// debugging dumps and tests, never consulted for correctness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapMetrics {
    pub inserts: u64,
    pub pops: u64,
    /// Always `0` for [`crate::quickheap::QuickHeap`], which has no
    /// arbitrary-element removal; populated by [`crate::lst::Lst::metrics`].
    pub extracts: u64,
    pub expansions: u64,
    pub len: usize,
    pub capacity: usize,
}

/// Randomised incremental-quicksort priority queue over a circular array.
///
/// `QuickHeap` never needs to locate an arbitrary element by value, only the
/// current minimum, so unlike [`crate::lst::Lst`] it does not require `T:
/// Indexed` and elements carry no back-index.
pub struct QuickHeap<T, C> {
    heap: Vec<Option<T>>,
    idx: usize,
    capacity: usize,
    num_elements: usize,
    pivots: PivotStack,
    cmp: C,
    rng: SmallRng,
    inserts: u64,
    pops: u64,
    expansions: u64,
}

impl<T, C> fmt::Debug for QuickHeap<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuickHeap")
            .field("capacity", &self.capacity)
            .field("num_elements", &self.num_elements)
            .field("idx", &self.idx)
            .field("pivot_depth", &self.pivots.depth())
            .finish()
    }
}

impl<T, C> QuickHeap<T, C>
where
    C: Fn(&T, &T) -> Ordering,
{
    /// Creates an empty heap with the given circular-array capacity (must be
    /// a power of two; 2048 is a reasonable default) and comparator.
    #[must_use]
    pub fn new(capacity: usize, pivot_stack_initial_capacity: usize, cmp: C) -> Self {
        assert!(capacity.is_power_of_two(), "capacity must be a power of two");
        Self::with_seed(capacity, pivot_stack_initial_capacity, cmp, rand::random())
    }

    /// Creates an empty heap seeded deterministically, for reproducible tests.
    #[must_use]
    pub fn with_seed(capacity: usize, pivot_stack_initial_capacity: usize, cmp: C, seed: u64) -> Self {
        assert!(capacity.is_power_of_two(), "capacity must be a power of two");
        let mut heap = Vec::with_capacity(capacity);
        heap.resize_with(capacity, || None);
        Self {
            heap,
            idx: 0,
            capacity,
            num_elements: 0,
            pivots: PivotStack::new(pivot_stack_initial_capacity),
            cmp,
            rng: SmallRng::seed_from_u64(seed),
            inserts: 0,
            pops: 0,
            expansions: 0,
        }
    }

    /// Snapshot of this heap's lifetime operation counts.
    #[must_use]
    pub fn metrics(&self) -> HeapMetrics {
        HeapMetrics {
            inserts: self.inserts,
            pops: self.pops,
            extracts: 0,
            expansions: self.expansions,
            len: self.num_elements,
            capacity: self.capacity,
        }
    }

    /// Number of elements currently stored.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.num_elements
    }

    /// Whether the heap holds no elements.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_elements == 0
    }

    /// Current circular-array capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    fn pos(&self, logical: usize) -> usize {
        (self.idx + logical) % self.capacity
    }

    /// Circular distance of array position `p` from `idx`.
    #[inline]
    fn dist(&self, p: usize) -> usize {
        (p + self.capacity - self.idx) % self.capacity
    }

    fn fictitious(&self) -> usize {
        self.pivots.item(0) as usize
    }

    /// Inserts `x`, maintaining the pivot-stack invariants.
    ///
    /// Equivalent to walking the established pivot values from the outside
    /// in and insertion-sorting `x` among them: each pivot whose value is
    /// greater than `x` is shifted one slot further from `idx` (it is still
    /// valid there, since its bucket has no upper bound) until we find a
    /// pivot `x` is not smaller than, or run out of pivots, at which point
    /// `x` settles into the vacated slot.
    pub fn insert(&mut self, x: T) -> Result<(), HeapError> {
        if self.num_elements == self.capacity {
            self.expand()?;
        }

        let mut gap = self.fictitious();
        self.pivots.set(0, ((gap + 1) % self.capacity) as i32);

        let depth = self.pivots.depth();
        let mut i = 1;
        loop {
            if i >= depth {
                self.heap[gap] = Some(x);
                break;
            }
            let pivot_pos = self.pivots.item(i) as usize;
            let goes_here = {
                let pivot_val = self.heap[pivot_pos].as_ref().expect("pivot slot must be occupied");
                (self.cmp)(&x, pivot_val) != Ordering::Less
            };
            if goes_here {
                self.heap[gap] = Some(x);
                break;
            }
            self.heap[gap] = self.heap[pivot_pos].take();
            self.pivots.set(i, gap as i32);
            gap = pivot_pos;
            i += 1;
        }

        self.num_elements += 1;
        self.inserts += 1;
        debug_assert_fictitious_pivot!(self.fictitious(), self.idx, self.num_elements, self.capacity);
        debug_assert_bounded_count!(self.num_elements, self.capacity);
        Ok(())
    }

    /// Advances the incremental quicksort until the top pivot sits at `idx`,
    /// i.e. `heap[idx]` is known to be the minimum.
    fn settle_minimum(&mut self) {
        loop {
            let top = self.pivots.depth() - 1;
            let top_pos = self.pivots.item(top) as usize;
            // `dist` cannot distinguish 0 from a full-capacity wraparound, so
            // the still-unpartitioned top bucket's size is read from
            // num_elements directly when no real pivot has been pushed yet.
            let hi = if top == 0 { self.num_elements } else { self.dist(top_pos) };
            if hi == 0 {
                break;
            }
            let pivot_logical = self.rng.gen_range(0..hi);
            let split = self.hoare_partition(0, hi, pivot_logical);
            let split_pos = self.pos(split);
            self.pivots.push(split_pos as i32).expect("pivot stack push must not fail here");
        }
    }

    /// Hoare partition over logical offsets `[lo, hi)` from `idx`, with the
    /// pivot originally at logical offset `pivot_logical`. Returns the
    /// logical split point and guarantees the pivot element itself ends up
    /// there: plain Hoare partition leaves the pivot wherever the last swap
    /// put it, so its final resting position must be recovered explicitly.
    fn hoare_partition(&mut self, lo: usize, hi: usize, pivot_logical: usize) -> usize {
        let idx = self.idx;
        let capacity = self.capacity;
        let pos = |logical: usize| (idx + logical) % capacity;

        let mut pivot_logical = pivot_logical;
        let mut li: isize = lo as isize - 1;
        let mut lj: isize = hi as isize;

        let split = loop {
            loop {
                li += 1;
                let a = pos(li as usize);
                let p = pos(pivot_logical);
                if !less(&self.cmp, &self.heap, a, p) {
                    break;
                }
            }
            loop {
                lj -= 1;
                let b = pos(lj as usize);
                let p = pos(pivot_logical);
                if !greater(&self.cmp, &self.heap, b, p) {
                    break;
                }
            }
            if li >= lj {
                break lj as usize;
            }
            let pa = pos(li as usize);
            let pb = pos(lj as usize);
            self.heap.swap(pa, pb);
            if pivot_logical == li as usize {
                pivot_logical = lj as usize;
            } else if pivot_logical == lj as usize {
                pivot_logical = li as usize;
            }
        };

        if pivot_logical != split {
            let sp = pos(split);
            let pp = pos(pivot_logical);
            self.heap.swap(sp, pp);
        }
        split
    }

    /// Returns a reference to the minimum element, without removing it.
    #[must_use]
    pub fn peek(&mut self) -> Option<&T> {
        if self.num_elements == 0 {
            return None;
        }
        self.settle_minimum();
        self.heap[self.idx].as_ref()
    }

    /// Removes and returns the minimum element.
    pub fn pop(&mut self) -> Option<T> {
        if self.num_elements == 0 {
            return None;
        }
        self.settle_minimum();
        let old_idx = self.idx;
        let min = self.heap[old_idx].take();
        self.idx = (old_idx + 1) % self.capacity;
        self.num_elements -= 1;

        // settle_minimum leaves the top-of-stack pivot recorded exactly at
        // old_idx; that entry now describes an empty singleton bucket and
        // must be dropped before it is mistaken for a live boundary.
        while self.pivots.depth() > 1 && self.pivots.item(self.pivots.depth() - 1) as usize == old_idx {
            self.pivots.pop(1);
        }
        debug_assert_fictitious_pivot!(self.fictitious(), self.idx, self.num_elements, self.capacity);
        self.pops += 1;
        min
    }

    /// Doubles the backing circular array, re-basing `idx` to `0` and every
    /// pivot to its circular distance from the old `idx`.
    fn expand(&mut self) -> Result<(), HeapError> {
        let old_capacity = self.capacity;
        let new_capacity = old_capacity
            .checked_mul(2)
            .ok_or(HeapError::AllocationFailed { old: old_capacity, new: old_capacity })?;

        let mut grown = Vec::new();
        grown
            .try_reserve_exact(new_capacity)
            .map_err(|_| HeapError::AllocationFailed { old: old_capacity, new: new_capacity })?;
        grown.resize_with(new_capacity, || None);

        for logical in 0..old_capacity {
            let old_pos = (self.idx + logical) % old_capacity;
            grown[logical] = self.heap[old_pos].take();
        }

        let depth = self.pivots.depth();
        for k in 0..depth {
            let old_pos = self.pivots.item(k) as usize;
            let new_pos = (old_pos + old_capacity - self.idx) % old_capacity;
            self.pivots.set(k, new_pos as i32);
        }

        self.heap = grown;
        self.capacity = new_capacity;
        self.idx = 0;
        self.expansions += 1;
        Ok(())
    }
}

#[inline]
fn less<T>(cmp: &impl Fn(&T, &T) -> Ordering, heap: &[Option<T>], a: usize, b: usize) -> bool {
    cmp(heap[a].as_ref().expect("slot in live range must be occupied"), heap[b].as_ref().expect("slot in live range must be occupied"))
        == Ordering::Less
}

#[inline]
fn greater<T>(cmp: &impl Fn(&T, &T) -> Ordering, heap: &[Option<T>], a: usize, b: usize) -> bool {
    cmp(heap[a].as_ref().expect("slot in live range must be occupied"), heap[b].as_ref().expect("slot in live range must be occupied"))
        == Ordering::Greater
}
