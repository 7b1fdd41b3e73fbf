//! Bounded ring buffer of PCM samples.

use crate::format::AudioSample;

/// A bounded circular FIFO of interleaved samples.
///
/// Capacity is fixed at construction and never changes. Both transient
/// boundary conditions are handled in-band rather than as errors:
/// dequeuing from an empty buffer yields silence, and enqueuing into a
/// full buffer truncates the unwritten remainder. Both self-correct on
/// subsequent invocations because the rate controller actively drives
/// occupancy back toward its setpoint.
///
/// The buffer itself is single-context; the one instance shared with
/// the real-time callback is wrapped in a mutex at that seam.
pub struct RingBuffer<T> {
    head: usize,
    tail: usize,
    cursize: usize,
    storage: Box<[T]>,
}

impl<T: AudioSample> RingBuffer<T> {
    /// Creates a ring buffer holding up to `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            head: 0,
            tail: 0,
            cursize: 0,
            storage: vec![T::SILENCE; capacity].into_boxed_slice(),
        }
    }

    /// Copies samples in until the slice is exhausted or occupancy
    /// reaches `capacity - 1`, whichever comes first.
    ///
    /// Returns the number of samples actually written; the remainder of
    /// an overflowing call is silently truncated. Truncation never
    /// overwrites unread data and is a deliberate latency bound, not a
    /// fault - callers that care can compare the return value against
    /// `data.len()`.
    pub fn enqueue(&mut self, data: &[T]) -> usize {
        let mut written = 0;
        for &sample in data {
            if self.cursize >= self.storage.len() - 1 {
                break;
            }
            self.storage[self.tail] = sample;
            self.tail = (self.tail + 1) % self.storage.len();
            self.cursize += 1;
            written += 1;
        }
        written
    }

    /// Removes and returns the oldest sample, or silence when empty.
    ///
    /// Underrun is expected steady-state behavior at stream start and
    /// under scheduling jitter; it is not a fault and does not mutate
    /// occupancy.
    #[inline]
    pub fn dequeue(&mut self) -> T {
        if self.cursize == 0 {
            return T::SILENCE;
        }
        let sample = self.storage[self.head];
        self.head = (self.head + 1) % self.storage.len();
        self.cursize -= 1;
        sample
    }

    /// Current number of samples held.
    #[inline]
    #[must_use]
    pub fn occupancy(&self) -> usize {
        self.cursize
    }

    /// Fixed capacity in samples.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Returns `true` if no samples are held.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cursize == 0
    }
}
