//! Bounded lock-free rings for handing buffered values between two threads.
//!
//! A [`BufferRing`] carries filled buffers from a producer to a consumer and
//! overwrites the oldest undelivered buffer when it runs out of slots, so a
//! slow consumer loses history but always finds the most recent values. A
//! [`BufferPool`] holds spent buffers so their allocations can be recycled
//! instead of dropped and reallocated.
//!
//! Both are thin domain wrappers over `crossbeam_queue::ArrayQueue`. The MPMC
//! safety of the underlying queue matters: the producer of a [`BufferRing`]
//! may pop its own ring to reclaim a slot, racing the consumer's pop.

use crossbeam_queue::ArrayQueue;

/// A bounded lock-free queue of in-flight buffers.
///
/// Capacity is the number of values that can be in flight without loss.
/// Pushing into a full ring evicts the oldest undelivered buffer.
pub struct BufferRing<B> {
    queue: ArrayQueue<B>,
}

impl<B> BufferRing<B> {
    /// Create a ring with the given capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "BufferRing capacity must be > 0");
        Self {
            queue: ArrayQueue::new(capacity),
        }
    }

    /// The maximum number of buffers this ring can hold.
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// The number of buffers currently in flight.
    ///
    /// Racy by nature; only useful as a snapshot.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the ring is currently empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Push a buffer if a free slot is available.
    ///
    /// Returns the buffer back to the caller if the ring is full.
    pub fn push(&self, buffer: B) -> Result<(), B> {
        self.queue.push(buffer)
    }

    /// Push a buffer, evicting the oldest undelivered one if the ring is
    /// full.
    ///
    /// Returns the evicted buffer, or `None` if a free slot was available.
    /// The eviction may race a concurrent [`pop`](Self::pop); if the consumer
    /// takes the contended slot first, the push simply succeeds without
    /// evicting.
    pub fn push_overwrite(&self, buffer: B) -> Option<B> {
        self.queue.force_push(buffer)
    }

    /// Pop the oldest buffer, if any.
    pub fn pop(&self) -> Option<B> {
        self.queue.pop()
    }
}

/// A bounded lock-free pool of spare buffers.
///
/// The pool is a recycling station, not a channel: `take` and `put` may be
/// called from either side of a ring, and a `put` into a full pool silently
/// drops the buffer (the pool is sized so this only happens after a transient
/// imbalance).
pub struct BufferPool<B> {
    queue: ArrayQueue<B>,
}

impl<B> BufferPool<B> {
    /// Create a pool with the given capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "BufferPool capacity must be > 0");
        Self {
            queue: ArrayQueue::new(capacity),
        }
    }

    /// The maximum number of spare buffers this pool can hold.
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// The number of spare buffers currently available.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the pool has no spare buffers.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Return a spent buffer to the pool.
    ///
    /// If the pool is already full the buffer is dropped.
    pub fn put(&self, buffer: B) {
        let _ = self.queue.push(buffer);
    }

    /// Take a spare buffer, if one is available.
    pub fn take(&self) -> Option<B> {
        self.queue.pop()
    }
}
