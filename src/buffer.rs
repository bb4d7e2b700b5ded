//! Fixed-capacity ring buffer for slow-time sample histories.
//!
//! Every per-frame history in the pipeline (slow-time samples, phase traces,
//! filtered waveforms, peak-index histories) is a `RingBuffer`. Push is O(1)
//! and evicts the oldest element once the buffer is full; access by recency
//! is O(1). This replaces the "roll the whole array and overwrite the last
//! slot" update pattern, which costs O(n) per frame.

/// Fixed-capacity, insertion-ordered sample history.
///
/// Two usage modes, matching the two kinds of history in the pipeline:
///
/// * [`RingBuffer::new`] starts empty. Reads before the first fill return
///   `None` / short windows — the cold-start rule for the amplitude ring.
/// * [`RingBuffer::zeroed`] starts logically full of `T::default()`, the
///   equivalent of a pre-allocated zero array that is rolled in place. The
///   phase, waveform, and index rings use this mode so trailing windows are
///   well-defined from the first frame.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    buf: Vec<T>,
    /// Index of the oldest element (only meaningful when `len > 0`).
    head: usize,
    len: usize,
    cap: usize,
}

impl<T: Clone + Default> RingBuffer<T> {
    /// Create an empty ring with the given capacity.
    ///
    /// # Panics
    /// Panics if `cap` is zero — a zero-capacity history is a config bug.
    pub fn new(cap: usize) -> Self {
        assert!(cap > 0, "ring buffer capacity must be nonzero");
        Self {
            buf: Vec::with_capacity(cap),
            head: 0,
            len: 0,
            cap,
        }
    }

    /// Create a ring pre-filled to capacity with `T::default()`.
    pub fn zeroed(cap: usize) -> Self {
        assert!(cap > 0, "ring buffer capacity must be nonzero");
        Self {
            buf: vec![T::default(); cap],
            head: 0,
            len: cap,
            cap,
        }
    }

    /// Configured capacity. Never changes after construction.
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Current number of stored elements (== capacity once full).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.cap
    }

    /// Append a sample, evicting the oldest if full.
    pub fn push(&mut self, value: T) {
        if self.len < self.cap {
            if self.buf.len() < self.cap {
                self.buf.push(value);
            } else {
                let idx = (self.head + self.len) % self.cap;
                self.buf[idx] = value;
            }
            self.len += 1;
        } else {
            self.buf[self.head] = value;
            self.head = (self.head + 1) % self.cap;
        }
    }

    /// Element `age` steps back from the newest (0 = newest).
    pub fn recent(&self, age: usize) -> Option<&T> {
        if age >= self.len {
            return None;
        }
        let idx = (self.head + self.len - 1 - age) % self.cap;
        Some(&self.buf[idx])
    }

    /// Newest element, if any.
    pub fn newest(&self) -> Option<&T> {
        self.recent(0)
    }

    /// Iterate the stored elements oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        (0..self.len).map(move |i| {
            let idx = (self.head + i) % self.cap;
            &self.buf[idx]
        })
    }

    /// Copy of the trailing `n` elements, oldest to newest.
    ///
    /// Capped at the current length; a shorter `Vec` means the ring has not
    /// filled that far yet.
    pub fn tail(&self, n: usize) -> Vec<T> {
        let n = n.min(self.len);
        (0..n)
            .map(|i| {
                let idx = (self.head + self.len - n + i) % self.cap;
                self.buf[idx].clone()
            })
            .collect()
    }

    /// Overwrite the trailing `values.len()` elements in place, oldest to
    /// newest. Used to write a recomputed unwrap window back over the ring.
    ///
    /// # Panics
    /// Panics if more values are supplied than elements stored.
    pub fn overwrite_tail(&mut self, values: &[T]) {
        assert!(
            values.len() <= self.len,
            "overwrite_tail: window longer than stored history"
        );
        let start = self.len - values.len();
        for (i, v) in values.iter().enumerate() {
            let idx = (self.head + start + i) % self.cap;
            self.buf[idx] = v.clone();
        }
    }

    /// Reset every stored element to `T::default()`, keeping length and
    /// capacity unchanged. The in-place zeroing used by the periodic reset.
    pub fn fill_default(&mut self) {
        for v in &mut self.buf {
            *v = T::default();
        }
    }

    /// Drop all elements, keeping capacity. Cold-start rings (amplitude,
    /// hysteresis) restart their fill from scratch after a reset.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.head = 0;
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_invariant() {
        let mut ring: RingBuffer<u32> = RingBuffer::new(4);
        for i in 0..4 {
            ring.push(i);
        }
        assert_eq!(ring.len(), 4);
        assert!(ring.is_full());

        // Each subsequent push evicts exactly the oldest element.
        for i in 4..20 {
            ring.push(i);
            assert_eq!(ring.len(), 4);
            assert_eq!(*ring.newest().unwrap(), i);
            assert_eq!(*ring.recent(3).unwrap(), i - 3);
        }
    }

    #[test]
    fn test_insertion_order_is_arrival_order() {
        let mut ring: RingBuffer<u32> = RingBuffer::new(3);
        for i in 0..7 {
            ring.push(i);
        }
        let contents: Vec<u32> = ring.iter().copied().collect();
        assert_eq!(contents, vec![4, 5, 6]);
    }

    #[test]
    fn test_prefill_reads_return_none() {
        let ring: RingBuffer<f64> = RingBuffer::new(8);
        assert!(ring.newest().is_none());
        assert!(ring.recent(0).is_none());
        assert!(ring.tail(8).is_empty());
    }

    #[test]
    fn test_zeroed_is_logically_full() {
        let ring: RingBuffer<f64> = RingBuffer::zeroed(16);
        assert!(ring.is_full());
        assert_eq!(ring.tail(16), vec![0.0; 16]);
    }

    #[test]
    fn test_tail_and_overwrite_tail() {
        let mut ring: RingBuffer<i64> = RingBuffer::zeroed(5);
        for i in 1..=7 {
            ring.push(i);
        }
        assert_eq!(ring.tail(3), vec![5, 6, 7]);

        ring.overwrite_tail(&[50, 60, 70]);
        assert_eq!(ring.tail(5), vec![3, 4, 50, 60, 70]);
        // Overwrite must not disturb capacity or ordering.
        ring.push(8);
        assert_eq!(ring.tail(5), vec![4, 50, 60, 70, 8]);
    }

    #[test]
    fn test_fill_default_keeps_capacity() {
        let mut ring: RingBuffer<f64> = RingBuffer::zeroed(4);
        for i in 0..6 {
            ring.push(i as f64);
        }
        ring.fill_default();
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.capacity(), 4);
        assert_eq!(ring.tail(4), vec![0.0; 4]);
    }

    #[test]
    fn test_clear_restarts_fill() {
        let mut ring: RingBuffer<bool> = RingBuffer::new(3);
        ring.push(true);
        ring.push(false);
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.capacity(), 3);
        ring.push(true);
        assert_eq!(ring.len(), 1);
    }
}
