use std::cmp::Ordering;
use std::fmt;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::error::HeapError;
use crate::indexed::{Indexed, REMOVED};
use crate::invariants::{debug_assert_bounded_count, debug_assert_fictitious_pivot};
use crate::pivot_stack::PivotStack;
use crate::quickheap::HeapMetrics;

/// Leftmost skeleton tree: a refinement of [`crate::quickheap::QuickHeap`]
/// giving O(1) amortised pop and O(log capacity) arbitrary deletion.
///
/// Recursively, an LST is either a bucket or a triple `(root, left_subtree,
/// right_bucket)` with `left_subtree ≤ root ≤ right_bucket`; the pivot stack
/// is the in-memory encoding of that recursion, with the fictitious
/// bottom-of-stack entry letting size/length arithmetic treat every level
/// uniformly.
///
/// `T` must implement [`Indexed`] so `extract` can locate an element in
/// O(1) given its current back-index rather than scanning. Since the
/// container owns `T` by value, a caller that needs to extract an
/// arbitrary element later typically shares the back-index through
/// interior mutability (e.g. `T = Rc<Cell<i32>>`-style handle alongside
/// the payload) rather than holding a direct reference into the LST.
pub struct Lst<T, C> {
    heap: Vec<Option<T>>,
    idx: usize,
    capacity: usize,
    num_elements: usize,
    pivots: PivotStack,
    cmp: C,
    rng: SmallRng,
    inserts: u64,
    pops: u64,
    extracts: u64,
    expansions: u64,
}

impl<T, C> fmt::Debug for Lst<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lst")
            .field("capacity", &self.capacity)
            .field("num_elements", &self.num_elements)
            .field("idx", &self.idx)
            .field("pivot_depth", &self.pivots.depth())
            .finish()
    }
}

impl<T, C> Lst<T, C>
where
    T: Indexed,
    C: Fn(&T, &T) -> Ordering,
{
    /// Creates an empty tree with the given circular-array capacity (must
    /// be a power of two; 2048 is a reasonable default) and comparator.
    #[must_use]
    pub fn new(capacity: usize, pivot_stack_initial_capacity: usize, cmp: C) -> Self {
        Self::with_seed(capacity, pivot_stack_initial_capacity, cmp, rand::random())
    }

    /// Creates an empty tree seeded deterministically, for reproducible tests.
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
            extracts: 0,
            expansions: 0,
        }
    }

    /// Snapshot of this tree's lifetime operation counts.
    #[must_use]
    pub fn metrics(&self) -> HeapMetrics {
        HeapMetrics {
            inserts: self.inserts,
            pops: self.pops,
            extracts: self.extracts,
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

    /// Whether the tree holds no elements.
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

    #[inline]
    fn dist(&self, p: usize) -> usize {
        (p + self.capacity - self.idx) % self.capacity
    }

    fn fictitious(&self) -> usize {
        self.pivots.item(0) as usize
    }

    /// `size(i)`: number of elements in subtree `i`.
    fn size(&self, i: usize) -> usize {
        if i == 0 {
            self.num_elements
        } else {
            self.dist(self.pivots.item(i) as usize)
        }
    }

    /// A subtree is a pure bucket iff it is the top of the stack.
    fn is_pure_bucket(&self, i: usize) -> bool {
        i == self.pivots.depth() - 1
    }

    /// Drops every pivot above `i`, merging everything above level `i` into
    /// a single bucket. O(1): only the stack depth changes.
    fn flatten(&mut self, i: usize) {
        let depth = self.pivots.depth();
        if depth > i + 1 {
            self.pivots.pop(depth - (i + 1));
        }
    }

    fn move_element(&mut self, from: usize, to: usize) {
        let mut elem = self.heap[from].take().expect("slot in live range must be occupied");
        elem.set_back_index(to as i32);
        self.heap[to] = Some(elem);
    }

    fn swap_tracked(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        if let Some(e) = self.heap[a].as_mut() {
            e.set_back_index(a as i32);
        }
        if let Some(e) = self.heap[b].as_mut() {
            e.set_back_index(b as i32);
        }
    }

    fn take_at(&mut self, pos: usize) -> Option<T> {
        let mut elem = self.heap[pos].take();
        if let Some(e) = elem.as_mut() {
            e.set_back_index(REMOVED);
        }
        elem
    }

    /// Partitions the pure bucket at the top of the stack, pushing a new
    /// pivot that exposes the next level down.
    fn partition(&mut self, level: usize) {
        debug_assert!(self.is_pure_bucket(level));
        let hi = self.size(level);
        debug_assert!(hi > 0);
        let pivot_logical = self.rng.gen_range(0..hi);
        let split = self.hoare_partition(0, hi, pivot_logical);
        let split_pos = self.pos(split);
        self.pivots.push(split_pos as i32).expect("pivot stack push must not fail here");
    }

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
            self.swap_tracked(pa, pb);
            if pivot_logical == li as usize {
                pivot_logical = lj as usize;
            } else if pivot_logical == lj as usize {
                pivot_logical = li as usize;
            }
        };

        if pivot_logical != split {
            let sp = pos(split);
            let pp = pos(pivot_logical);
            self.swap_tracked(sp, pp);
        }
        split
    }

    /// Descends from stack index 0 until a subtree of size 0 is found; its
    /// level's recorded position is `idx`.
    fn find_empty_left(&mut self) -> usize {
        let mut i = 0;
        loop {
            let sz = self.size(i);
            if sz == 0 {
                return i;
            }
            if self.is_pure_bucket(i) {
                self.partition(i);
            }
            i += 1;
        }
    }

    /// Returns a reference to the minimum element, without removing it.
    #[must_use]
    pub fn peek(&mut self) -> Option<&T> {
        if self.num_elements == 0 {
            return None;
        }
        let _ = self.find_empty_left();
        self.heap[self.idx].as_ref()
    }

    /// Removes and returns the minimum element.
    pub fn pop(&mut self) -> Option<T> {
        if self.num_elements == 0 {
            return None;
        }
        let level = self.find_empty_left();
        self.flatten(level);

        let old_idx = self.idx;
        let removed = self.take_at(old_idx);
        self.idx = (old_idx + 1) % self.capacity;
        self.num_elements -= 1;

        while self.pivots.depth() > 1 && self.pivots.item(self.pivots.depth() - 1) as usize == old_idx {
            self.pivots.pop(1);
        }
        debug_assert_fictitious_pivot!(self.fictitious(), self.idx, self.num_elements, self.capacity);
        self.pops += 1;
        removed
    }

    /// Shifts every non-bucket level's pivot outward by one slot, starting
    /// from the fictitious pivot, stopping at `target_level` where `x` is
    /// placed.
    fn bucket_add(&mut self, target_level: usize, x: T) {
        let mut gap = self.fictitious();
        self.pivots.set(0, ((gap + 1) % self.capacity) as i32);
        for r in 1..=target_level {
            let pivot_pos = self.pivots.item(r) as usize;
            self.move_element(pivot_pos, gap);
            self.pivots.set(r, gap as i32);
            gap = pivot_pos;
        }
        let mut elem = x;
        elem.set_back_index(gap as i32);
        self.heap[gap] = Some(elem);
    }

    /// Inserts `x`, maintaining the pivot-stack invariants.
    pub fn insert(&mut self, x: T) -> Result<(), HeapError> {
        if self.num_elements == self.capacity {
            self.expand()?;
        }

        let mut i = 0;
        let target = loop {
            let depth = self.pivots.depth();
            if i >= depth - 1 {
                break i;
            }
            let sz = self.size(i);
            let do_flatten = i != 0 && self.rng.gen_range(0..=sz) == 0;
            if do_flatten {
                self.flatten(i);
                break i;
            }
            let next_pivot_pos = self.pivots.item(i + 1) as usize;
            let goes_here = {
                let next_val = self.heap[next_pivot_pos].as_ref().expect("pivot slot must be occupied");
                (self.cmp)(&x, next_val) != Ordering::Less
            };
            if goes_here {
                break i;
            }
            i += 1;
        };

        self.bucket_add(target, x);
        self.num_elements += 1;
        self.inserts += 1;
        debug_assert_fictitious_pivot!(self.fictitious(), self.idx, self.num_elements, self.capacity);
        debug_assert_bounded_count!(self.num_elements, self.capacity);
        Ok(())
    }

    /// Finds which stack level currently bounds array position with
    /// circular distance `target_dist`, and whether it *is* that level's
    /// pivot.
    fn locate(&self, target_dist: usize) -> (usize, bool) {
        let depth = self.pivots.depth();
        for i in 0..depth {
            let di = self.size(i);
            if i > 0 && target_dist == di {
                return (i, true);
            }
            let lower_dist = if i + 1 < depth { self.size(i + 1) + 1 } else { 0 };
            if di > 0 && target_dist >= lower_dist && target_dist <= di - 1 {
                return (i, false);
            }
        }
        unreachable!("position not found at any pivot-stack level")
    }

    /// Removes and returns the element currently at `back_index`, the
    /// value most recently reported by [`Indexed::back_index`] for that
    /// element.
    ///
    /// If `x` isn't the current minimum, the level above it is flattened
    /// first so the bucket it ends up in is pure, then the freed slot is
    /// cascaded outward through every enclosing level: the bucket's last
    /// element fills the gap, that level's pivot shrinks by one, and the
    /// slot it vacates becomes the next gap one level out, all the way
    /// through the fictitious pivot — the reverse of [`Lst::bucket_add`]'s
    /// inward cascade on insertion.
    pub fn extract(&mut self, back_index: i32) -> Result<T, HeapError> {
        if back_index < 0 {
            return Err(HeapError::NotFound);
        }
        let pos = back_index as usize;
        if pos >= self.capacity || self.heap[pos].is_none() {
            return Err(HeapError::NotFound);
        }
        let d = self.dist(pos);
        if d >= self.num_elements {
            return Err(HeapError::NotFound);
        }

        if pos == self.idx {
            let removed = self.take_at(pos).ok_or(HeapError::NotFound)?;
            self.idx = (self.idx + 1) % self.capacity;
            self.num_elements -= 1;
            while self.pivots.depth() > 1 && self.pivots.item(self.pivots.depth() - 1) as usize == pos {
                self.pivots.pop(1);
            }
            self.extracts += 1;
            return Ok(removed);
        }

        let (level, _is_pivot) = self.locate(d);
        self.flatten(level);

        let removed = self.take_at(pos).ok_or(HeapError::NotFound)?;

        let mut gap = pos;
        for r in (0..=level).rev() {
            let pivot_pos = self.pivots.item(r) as usize;
            let last_pos = (pivot_pos + self.capacity - 1) % self.capacity;
            if gap != last_pos {
                self.move_element(last_pos, gap);
            }
            self.pivots.set(r, last_pos as i32);
            gap = last_pos;
        }

        self.num_elements -= 1;
        debug_assert_fictitious_pivot!(self.fictitious(), self.idx, self.num_elements, self.capacity);
        self.extracts += 1;
        Ok(removed)
    }

    /// Doubles the backing circular array, re-basing `idx` to `0` and
    /// every pivot to its circular distance from the old `idx`. Since pivot
    /// positions are stored absolute rather than `idx`-relative, no separate
    /// index-renormalisation pass is needed when `idx` itself later wraps
    /// past `0`.
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
            if let Some(mut elem) = self.heap[old_pos].take() {
                elem.set_back_index(logical as i32);
                grown[logical] = Some(elem);
            }
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
