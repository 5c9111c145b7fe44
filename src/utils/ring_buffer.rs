/// A fixed-capacity window of samples.
///
/// Samples are kept in arrival order. Once the window is full, every push
/// evicts and returns the oldest sample, which is what the sliding
/// recurrences need to retire its contribution.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    /// Backing storage, allocated once
    data: Box<[T]>,
    /// Slot holding the oldest sample
    head: usize,
    /// Number of samples currently held, never above `data.len()`
    len: usize,
}

impl<T: Default + Copy> RingBuffer<T> {
    /// Creates an empty window, panics if `capacity` is zero
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "window can not be zero");
        Self {
            data: vec![T::default(); capacity].into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Pushes a sample, returning the evicted one when the window was already full
    pub fn push(&mut self, value: T) -> Option<T> {
        let cap = self.capacity();
        if self.is_full() {
            let evicted = core::mem::replace(&mut self.data[self.head], value);
            self.head = (self.head + 1) % cap;
            Some(evicted)
        } else {
            self.data[(self.head + self.len) % cap] = value;
            self.len += 1;
            None
        }
    }

    pub fn clear(&mut self) {
        self.data.fill(T::default());
        self.head = 0;
        self.len = 0;
    }

    /// Iterates from the oldest to the newest sample
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        (0..self.len).map(move |i| &self.data[(self.head + i) % self.capacity()])
    }
}
