//! Lock-free SPSC message queue, one per relay direction.
//!
//! # Architecture
//!
//! ```text
//! peer port task ──enqueue──▶ MessageQueue ──dequeue──▶ owning port task
//!                             (lock-free)
//! ```
//!
//! Each queue has exactly one writer (the task servicing the *other*
//! port, via receive events) and exactly one reader (the task servicing
//! the owning port, via request events). That discipline is what lets
//! the ring run on plain atomic index updates instead of a mutex, and
//! it is enforced at compile time: [`MessageQueue::split`] hands out a
//! single non-cloneable [`Producer`] and [`Consumer`] pair.
//!
//! A full queue rejects the new message (the old traffic wins); the
//! drop is recorded in a sticky overflow flag plus a running counter
//! and is otherwise silent. The bus transaction that delivered the
//! message has already completed and there is no NACK path.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::config::QUEUE_CAPACITY;
use crate::message::Message;

/// Fixed-capacity circular buffer of [`Message`]s.
///
/// # Safety
///
/// Uses `UnsafeCell` internally but is safe to use because:
/// - Exactly one producer and one consumer exist per queue (the
///   [`split`](Self::split) handles are not cloneable)
/// - The producer only writes slots in `[read_idx, read_idx + N)`
/// - The consumer only reads slots below `write_idx`
/// - All index coordination is Acquire/Release
///
/// # Memory Ordering
///
/// - Producer publishes a slot with a `Release` store of `write_idx`
/// - Consumer observes it with an `Acquire` load of `write_idx`
/// - Symmetrically for `read_idx`, so the producer never recycles a
///   slot the consumer is still copying out of
pub struct MessageQueue<const N: usize = QUEUE_CAPACITY> {
    /// Ring slots; bytes of a dequeued slot stay in place (marked
    /// `valid = false`) until the next wraparound write recycles them.
    slots: UnsafeCell<[Message; N]>,

    /// Next write position (monotonically increasing, wraps via mask).
    write_idx: AtomicU32,

    /// Next read position (monotonically increasing, wraps via mask).
    read_idx: AtomicU32,

    /// Sticky overflow flag. Set on every rejected enqueue; cleared
    /// only by [`take_overflow`](Self::take_overflow) (the stats
    /// reader), never by queue traffic.
    overflow: AtomicBool,

    /// Total messages dropped to overflow since boot.
    overflow_drops: AtomicU32,

    /// Whether the Producer/Consumer pair has been handed out.
    claimed: AtomicBool,
}

// SAFETY: single producer, single consumer, atomic coordination.
// No mutable aliasing possible through the split handles.
unsafe impl<const N: usize> Sync for MessageQueue<N> {}
unsafe impl<const N: usize> Send for MessageQueue<N> {}

impl<const N: usize> MessageQueue<N> {
    /// Mask for wrapping an index to the ring. N must be a power of 2.
    const MASK: usize = N - 1;

    /// Create a new empty queue.
    pub const fn new() -> Self {
        // Compile-time check: N must be power of 2
        assert!(N.is_power_of_two(), "Queue capacity must be power of 2");

        Self {
            slots: UnsafeCell::new([Message::EMPTY; N]),
            write_idx: AtomicU32::new(0),
            read_idx: AtomicU32::new(0),
            overflow: AtomicBool::new(false),
            overflow_drops: AtomicU32::new(0),
            claimed: AtomicBool::new(false),
        }
    }

    /// Split the queue into its write and read halves.
    ///
    /// Succeeds exactly once per queue: the handles are not cloneable
    /// and a second call returns `None`, so at most one writer and one
    /// reader can ever exist. Hand the [`Producer`] to the peer port's
    /// task and the [`Consumer`] to the owning port's task.
    ///
    /// Works through `&self` so a queue in a `static` can be split
    /// without `static mut`, and observers (stats) can keep reading
    /// the counters while the halves are live.
    pub fn split(&self) -> Option<(Producer<'_, N>, Consumer<'_, N>)> {
        if self.claimed.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some((Producer { queue: self }, Consumer { queue: self }))
    }

    /// Number of undequeued messages, in `[0, N]`.
    #[inline]
    pub fn len(&self) -> usize {
        let write = self.write_idx.load(Ordering::Acquire);
        let read = self.read_idx.load(Ordering::Acquire);
        write.wrapping_sub(read) as usize
    }

    /// Check if the queue holds no messages.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if the next enqueue would be rejected.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() >= N
    }

    /// Queue capacity in messages.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Peek the sticky overflow flag without clearing it.
    #[inline]
    pub fn overflow(&self) -> bool {
        self.overflow.load(Ordering::Relaxed)
    }

    /// Read and clear the sticky overflow flag.
    ///
    /// This is the only way the flag resets; enqueue attempts against a
    /// full queue keep re-setting it.
    #[inline]
    pub fn take_overflow(&self) -> bool {
        self.overflow.swap(false, Ordering::Relaxed)
    }

    /// Total messages dropped to overflow since boot.
    #[inline]
    pub fn overflow_drops(&self) -> u32 {
        self.overflow_drops.load(Ordering::Relaxed)
    }
}

impl<const N: usize> Default for MessageQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Write half of a [`MessageQueue`]. Exactly one exists per queue.
pub struct Producer<'a, const N: usize = QUEUE_CAPACITY> {
    queue: &'a MessageQueue<N>,
}

impl<'a, const N: usize> Producer<'a, N> {
    /// Enqueue a message captured from `bytes`.
    ///
    /// Returns `false` if the queue is full: the message is dropped,
    /// the sticky overflow flag is set and the drop counted. Existing
    /// entries are untouched either way.
    ///
    /// # Timing
    ///
    /// O(1), never blocks, never allocates.
    #[inline]
    pub fn enqueue(&mut self, bytes: &[u8], now_ms: u32) -> bool {
        let q = self.queue;

        // Only this handle advances write_idx, so a Relaxed load of our
        // own cursor is sufficient.
        let write = q.write_idx.load(Ordering::Relaxed);
        let read = q.read_idx.load(Ordering::Acquire);

        if write.wrapping_sub(read) >= N as u32 {
            q.overflow.store(true, Ordering::Relaxed);
            q.overflow_drops.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        // SAFETY: single producer; the slot at `write` is outside the
        // consumer's readable range until the Release store below.
        unsafe {
            (*q.slots.get())[(write as usize) & MessageQueue::<N>::MASK] =
                Message::capture(bytes, now_ms);
        }

        q.write_idx.store(write.wrapping_add(1), Ordering::Release);
        true
    }

    /// Number of undequeued messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if the next enqueue would be rejected.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.queue.is_full()
    }
}

/// Read half of a [`MessageQueue`]. Exactly one exists per queue.
pub struct Consumer<'a, const N: usize = QUEUE_CAPACITY> {
    queue: &'a MessageQueue<N>,
}

impl<'a, const N: usize> Consumer<'a, N> {
    /// Dequeue the oldest message, marking its slot invalid.
    ///
    /// Returns `None` if the queue is empty.
    ///
    /// # Timing
    ///
    /// O(1), never blocks, never allocates.
    #[inline]
    pub fn dequeue(&mut self) -> Option<Message> {
        let q = self.queue;

        let read = q.read_idx.load(Ordering::Relaxed);
        let write = q.write_idx.load(Ordering::Acquire);

        if read == write {
            return None;
        }

        // SAFETY: single consumer; the producer cannot touch this slot
        // until read_idx advances past it (Release store below).
        let msg = unsafe {
            let slot = &mut (*q.slots.get())[(read as usize) & MessageQueue::<N>::MASK];
            let msg = *slot;
            slot.valid = false;
            msg
        };

        q.read_idx.store(read.wrapping_add(1), Ordering::Release);
        Some(msg)
    }

    /// Number of undequeued messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if the queue holds no messages.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
