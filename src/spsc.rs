use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Single-producer single-consumer ring buffer backing each direction of a
/// [`crate::channel::Channel`].
///
/// Unbounded `u64` head/tail sequence counters avoid the ABA problem instead
/// of wrapped indices; the buffer index is `sequence & mask`. Head and tail
/// live in their own 128-byte-aligned cache lines so producer and consumer
/// never false-share.
#[repr(C)]
pub struct Spsc<T> {
    tail: CacheAligned<AtomicU64>,
    cached_head: CacheAligned<UnsafeCell<u64>>,
    head: CacheAligned<AtomicU64>,
    cached_tail: CacheAligned<UnsafeCell<u64>>,
    mask: usize,
    buffer: UnsafeCell<Box<[MaybeUninit<T>]>>,
}

// SAFETY: producer and consumer each touch only the fields their role owns
// (tail/cached_head for the producer, head/cached_tail for the consumer);
// the buffer slots are handed off between them through the Acquire/Release
// protocol on head/tail. Requires `T: Send` to move payloads across threads.
unsafe impl<T: Send> Send for Spsc<T> {}
unsafe impl<T: Send> Sync for Spsc<T> {}

impl<T> Spsc<T> {
    /// Creates an empty queue. `capacity` must be a power of two.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity.is_power_of_two(), "capacity must be a power of two");
        let mut buffer = Vec::with_capacity(capacity);
        buffer.resize_with(capacity, MaybeUninit::uninit);
        Self {
            tail: CacheAligned::new(AtomicU64::new(0)),
            cached_head: CacheAligned::new(UnsafeCell::new(0)),
            head: CacheAligned::new(AtomicU64::new(0)),
            cached_tail: CacheAligned::new(UnsafeCell::new(0)),
            mask: capacity - 1,
            buffer: UnsafeCell::new(buffer.into_boxed_slice()),
        }
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Relaxed);
        tail.wrapping_sub(head) as usize
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// Pushes one item. Returns `false` if the queue is full. Single-writer:
    /// only the direction's producer thread may call this.
    pub fn push(&self, item: T) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);

        // SAFETY: cached_head is only ever written by the producer thread
        // (this call), so this unsynchronized read is data-race-free.
        let cached_head = unsafe { *self.cached_head.get() };
        let mut space = self.capacity() - tail.wrapping_sub(cached_head) as usize;

        if space == 0 {
            let head = self.head.load(Ordering::Acquire);
            // SAFETY: same single-writer argument as above; the Acquire load
            // just performed synchronizes with the consumer's Release store.
            unsafe {
                *self.cached_head.get() = head;
            }
            space = self.capacity() - tail.wrapping_sub(head) as usize;
            if space == 0 {
                return false;
            }
        }

        let idx = (tail as usize) & self.mask;
        // SAFETY: idx is in bounds; this slot is strictly ahead of the
        // consumer's head (guaranteed by the space check above), so the
        // consumer cannot be reading it concurrently.
        unsafe {
            let buffer = &mut *self.buffer.get();
            buffer[idx].write(item);
        }
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        true
    }

    /// Pops one item, or `None` if empty. Single-reader: only the
    /// direction's consumer thread may call this.
    pub fn pop(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);

        // SAFETY: cached_tail is only ever written by the consumer thread.
        let cached_tail = unsafe { *self.cached_tail.get() };
        let mut available = cached_tail.wrapping_sub(head) as usize;

        if available == 0 {
            let tail = self.tail.load(Ordering::Acquire);
            // SAFETY: same single-writer argument; synchronizes with the
            // producer's Release store above.
            unsafe {
                *self.cached_tail.get() = tail;
            }
            available = tail.wrapping_sub(head) as usize;
            if available == 0 {
                return None;
            }
        }

        let idx = (head as usize) & self.mask;
        // SAFETY: idx is in bounds and holds an initialized value published
        // by the producer's Release store (observed via the Acquire above).
        let item = unsafe {
            let buffer = &mut *self.buffer.get();
            buffer[idx].assume_init_read()
        };
        self.head.store(head.wrapping_add(1), Ordering::Release);
        Some(item)
    }

    /// Drains up to `max` items via `handler`, in FIFO order. Returns the
    /// number drained.
    pub fn drain_with<F: FnMut(T)>(&self, max: usize, mut handler: F) -> usize {
        let mut n = 0;
        while n < max {
            match self.pop() {
                Some(item) => {
                    handler(item);
                    n += 1;
                }
                None => break,
            }
        }
        n
    }
}

impl<T> Drop for Spsc<T> {
    fn drop(&mut self) {
        let head = *self.head.get_mut();
        let tail = *self.tail.get_mut();
        let count = tail.wrapping_sub(head) as usize;
        if count == 0 {
            return;
        }
        let buffer = self.buffer.get_mut();
        for i in 0..count {
            let idx = (head as usize).wrapping_add(i) & self.mask;
            // SAFETY: these are exactly the slots between head and tail,
            // which are always initialized by the push/pop protocol above.
            unsafe {
                ptr::drop_in_place(buffer[idx].as_mut_ptr());
            }
        }
    }
}

/// Prevents false sharing between producer-owned and consumer-owned fields
/// on common Intel/AMD cache-line prefetch widths.
#[repr(align(128))]
struct CacheAligned<T> {
    value: T,
}

impl<T> CacheAligned<T> {
    const fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T> std::ops::Deref for CacheAligned<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}
