//! Fixed-capacity byte FIFO shared with interrupt handlers
//!
//! Storage for `N` bytes is reserved inline, so a buffer can live in a
//! `static` without an allocator. The logical capacity is chosen at setup
//! with [`RingBuffer::resize`] and never exceeds `N`.
//!
//! Every operation runs inside a critical section, which makes each call
//! atomic with respect to interrupt handlers touching the same buffer.
//! Pushing to a full buffer is rejected; existing data is never overwritten.

use core::cell::RefCell;

use critical_section::Mutex;

/// Requested capacity exceeds the reserved storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CapacityError {
    pub requested: usize,
    pub max: usize,
}

struct Ring<const N: usize> {
    data: [u8; N],
    /// Offset of the oldest byte
    head: usize,
    len: usize,
    capacity: usize,
}

impl<const N: usize> Ring<N> {
    fn slot(&self, index: usize) -> usize {
        (self.head + index) % self.capacity
    }

    fn push_back(&mut self, byte: u8) -> bool {
        if self.len >= self.capacity {
            return false;
        }
        let tail = self.slot(self.len);
        self.data[tail] = byte;
        self.len += 1;
        true
    }

    fn pop_front(&mut self) -> Option<u8> {
        if self.len == 0 {
            return None;
        }
        let byte = self.data[self.head];
        self.head = self.slot(1);
        self.len -= 1;
        Some(byte)
    }

    fn pop(&mut self, n: usize) {
        if n >= self.len {
            self.clear();
        } else {
            self.head = self.slot(n);
            self.len -= n;
        }
    }

    fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

/// Interrupt-safe byte ring buffer
pub struct RingBuffer<const N: usize> {
    inner: Mutex<RefCell<Ring<N>>>,
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RingBuffer<N> {
    /// Create an empty buffer using all `N` bytes of storage
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Ring {
                data: [0; N],
                head: 0,
                len: 0,
                capacity: N,
            })),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut Ring<N>) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }

    /// Set the logical capacity, discarding all buffered bytes
    ///
    /// Meant for setup. A capacity of 0 rejects every push.
    pub fn resize(&self, capacity: usize) -> Result<(), CapacityError> {
        if capacity > N {
            return Err(CapacityError {
                requested: capacity,
                max: N,
            });
        }
        self.with(|ring| {
            ring.clear();
            ring.capacity = capacity;
        });
        Ok(())
    }

    /// Append a byte, returning `false` if the buffer is full
    pub fn push_back(&self, byte: u8) -> bool {
        self.with(|ring| ring.push_back(byte))
    }

    /// Remove and return the oldest byte, if any
    pub fn try_pop_front(&self) -> Option<u8> {
        self.with(Ring::pop_front)
    }

    /// Remove and return the oldest byte, or 0 if the buffer is empty
    ///
    /// Check [`size`](Self::size) first, or use
    /// [`try_pop_front`](Self::try_pop_front), to tell a stored 0 apart.
    pub fn pop_front(&self) -> u8 {
        self.try_pop_front().unwrap_or(0)
    }

    /// Discard up to `n` of the oldest bytes
    pub fn pop(&self, n: usize) {
        self.with(|ring| ring.pop(n));
    }

    /// Discard everything, keeping the capacity
    pub fn clear(&self) {
        self.with(Ring::clear);
    }

    /// Number of buffered bytes
    pub fn size(&self) -> usize {
        self.with(|ring| ring.len)
    }

    /// Free space, in bytes
    pub fn available_size(&self) -> usize {
        self.with(|ring| ring.capacity - ring.len)
    }

    /// The `index`-th oldest byte, without removing it
    pub fn peek(&self, index: usize) -> Option<u8> {
        self.with(|ring| (index < ring.len).then(|| ring.data[ring.slot(index)]))
    }

    pub fn capacity(&self) -> usize {
        self.with(|ring| ring.capacity)
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn is_full(&self) -> bool {
        self.with(|ring| ring.len == ring.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::VecDeque;

    #[test]
    fn test_new_uses_full_storage() {
        let ring = RingBuffer::<8>::new();
        assert_eq!(ring.capacity(), 8);
        assert!(ring.is_empty());
        assert_eq!(ring.available_size(), 8);
    }

    #[test]
    fn test_fifo_order() {
        let ring = RingBuffer::<4>::new();
        assert!(ring.push_back(1));
        assert!(ring.push_back(2));
        assert!(ring.push_back(3));
        assert_eq!(ring.pop_front(), 1);
        assert_eq!(ring.pop_front(), 2);
        assert_eq!(ring.pop_front(), 3);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_wraps_around_storage() {
        let ring = RingBuffer::<3>::new();
        for round in 0..10u8 {
            assert!(ring.push_back(round));
            assert!(ring.push_back(round.wrapping_mul(7)));
            assert_eq!(ring.try_pop_front(), Some(round));
            assert_eq!(ring.try_pop_front(), Some(round.wrapping_mul(7)));
        }
        assert!(ring.is_empty());
    }

    #[test]
    fn test_overflow_rejects_without_overwriting() {
        let ring = RingBuffer::<4>::new();
        ring.resize(3).unwrap();
        for byte in 0..3 {
            assert!(ring.push_back(byte));
        }
        assert!(ring.is_full());
        assert!(!ring.push_back(0xFF));
        assert!(!ring.push_back(0xFE));
        assert_eq!(ring.size(), 3);
        assert_eq!(ring.pop_front(), 0);
        assert_eq!(ring.pop_front(), 1);
        assert_eq!(ring.pop_front(), 2);
    }

    #[test]
    fn test_pop_front_empty_returns_zero() {
        let ring = RingBuffer::<2>::new();
        assert_eq!(ring.pop_front(), 0);
        assert_eq!(ring.try_pop_front(), None);
    }

    #[test]
    fn test_pop_discards_oldest() {
        let ring = RingBuffer::<8>::new();
        for byte in 1..=5 {
            ring.push_back(byte);
        }
        ring.pop(2);
        assert_eq!(ring.size(), 3);
        assert_eq!(ring.peek(0), Some(3));
        ring.pop(10);
        assert!(ring.is_empty());
        assert!(ring.push_back(9));
        assert_eq!(ring.pop_front(), 9);
    }

    #[test]
    fn test_peek() {
        let ring = RingBuffer::<4>::new();
        ring.push_back(0xAA);
        ring.push_back(0xBB);
        assert_eq!(ring.peek(0), Some(0xAA));
        assert_eq!(ring.peek(1), Some(0xBB));
        assert_eq!(ring.peek(2), None);
        assert_eq!(ring.size(), 2);
    }

    #[test]
    fn test_resize_discards_contents() {
        let ring = RingBuffer::<16>::new();
        ring.push_back(1);
        ring.push_back(2);
        assert_eq!(ring.resize(4), Ok(()));
        assert!(ring.is_empty());
        assert_eq!(ring.capacity(), 4);
        assert_eq!(ring.available_size(), 4);
    }

    #[test]
    fn test_resize_beyond_storage() {
        let ring = RingBuffer::<16>::new();
        ring.push_back(1);
        assert_eq!(
            ring.resize(17),
            Err(CapacityError {
                requested: 17,
                max: 16
            })
        );
        // Failed resize leaves the buffer alone
        assert_eq!(ring.capacity(), 16);
        assert_eq!(ring.size(), 1);
    }

    #[test]
    fn test_zero_capacity_rejects_everything() {
        let ring = RingBuffer::<4>::new();
        ring.resize(0).unwrap();
        assert!(ring.is_full());
        assert!(!ring.push_back(1));
        assert_eq!(ring.try_pop_front(), None);
        ring.pop(1);
        assert_eq!(ring.peek(0), None);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Push(u8),
        Pop,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![any::<u8>().prop_map(Op::Push), Just(Op::Pop)]
    }

    proptest! {
        #[test]
        fn prop_matches_fifo_model(
            capacity in 0usize..=16,
            ops in proptest::collection::vec(op(), 0..200),
        ) {
            let ring = RingBuffer::<16>::new();
            ring.resize(capacity).unwrap();
            let mut model = VecDeque::new();

            for op in ops {
                match op {
                    Op::Push(byte) => {
                        let full = model.len() == capacity;
                        prop_assert_eq!(ring.push_back(byte), !full);
                        if !full {
                            model.push_back(byte);
                        }
                    }
                    Op::Pop => {
                        prop_assert_eq!(ring.try_pop_front(), model.pop_front());
                    }
                }
                prop_assert_eq!(ring.size(), model.len());
                prop_assert!(ring.size() <= ring.capacity());
                prop_assert_eq!(ring.available_size(), capacity - model.len());
            }
        }

        #[test]
        fn prop_overflow_signaling(capacity in 0usize..=32, extra in 1usize..16) {
            let ring = RingBuffer::<32>::new();
            ring.resize(capacity).unwrap();
            for i in 0..capacity + extra {
                prop_assert_eq!(ring.push_back(i as u8), i < capacity);
            }
            prop_assert_eq!(ring.size(), capacity);
        }
    }
}
