use num_traits::Float;

use crate::{RingBuffer, helper};

/// Streaming co-moments of two series sampled on the same dates.
///
/// Keeps the moving averages of `x`, `y` and `x·y` with the same sliding
/// recurrence as [`crate::Moments`], so the means it tracks are bit-identical
/// to those of two separate `Moments` fed with the same samples. The
/// covariance is derived from them as `E[XY] - E[X]E[Y]`.
#[derive(Debug, Clone)]
pub struct PairedMoments<T> {
    /// Window period
    period: usize,
    /// Pairs currently inside the window
    buf: RingBuffer<(T, T)>,
    /// Most recent pair
    value: Option<(T, T)>,
    /// Pair evicted by the most recent update
    popped: Option<(T, T)>,
    /// Moving averages of x and y
    mean: (T, T),
    /// Moving average of products
    mean_prod: T,
}

impl<T: Float + Default> PairedMoments<T> {
    /// Creates empty co-moments over `period` pairs, panics if `period` is zero
    ///
    /// # Arguments
    ///
    /// * `period` - The window period
    ///
    /// # Returns
    ///
    /// * `Self` - The co-moments object
    pub fn new(period: usize) -> Self {
        Self {
            period,
            buf: RingBuffer::new(period),
            value: None,
            popped: None,
            mean: (T::zero(), T::zero()),
            mean_prod: T::zero(),
        }
    }

    /// Resets the co-moments to the empty state
    ///
    /// # Returns
    ///
    /// * `&mut Self` - The co-moments object
    pub fn reset(&mut self) -> &mut Self {
        self.buf.clear();
        self.value = None;
        self.popped = None;
        self.mean = (T::zero(), T::zero());
        self.mean_prod = T::zero();
        self
    }

    /// Feeds the next pair of samples
    ///
    /// # Arguments
    ///
    /// * `value` - The pair `(x, y)` entering the window
    ///
    /// # Returns
    ///
    /// * `&mut Self` - The co-moments object
    ///
    /// # Examples
    ///
    /// ```
    /// use event_study::PairedMoments;
    /// use assert_approx_eq::assert_approx_eq;
    ///
    /// let mut stats = PairedMoments::new(3);
    /// let mut results = vec![];
    /// let inputs = [(2.0, 1.0), (4.0, 3.0), (6.0, 2.0), (8.0, 5.0), (10.0, 7.0)];
    /// inputs.iter().for_each(|i| {
    ///     stats.next(*i).cov().map(|v| results.push(v));
    /// });
    ///
    /// let expected: [f64; 5] = [0.0, 1.0, 0.6667, 1.3333, 3.3333];
    /// for (i, e) in expected.iter().enumerate() {
    ///     assert_approx_eq!(e, results[i], 0.001);
    /// }
    /// ```
    pub fn next(&mut self, (x, y): (T, T)) -> &mut Self {
        let first = self.buf.is_empty();
        self.popped = self.buf.push((x, y));
        self.value = Some((x, y));

        if first {
            self.mean = (x, y);
            self.mean_prod = x * y;
        } else {
            self.update(x, y);
        }
        self
    }

    fn update(&mut self, x: T, y: T) -> Option<()> {
        let n = T::from(self.buf.len())?;
        let (old_x, old_y, old_prod) = match self.popped {
            Some((px, py)) => (px, py, px * py),
            None => (self.mean.0, self.mean.1, self.mean_prod),
        };
        self.mean.0 = helper::moving_average(self.mean.0, old_x, x, n);
        self.mean.1 = helper::moving_average(self.mean.1, old_y, y, n);
        self.mean_prod = helper::moving_average(self.mean_prod, old_prod, x * y, n);
        Some(())
    }

    /// Returns the window period
    pub const fn period(&self) -> usize {
        self.period
    }

    /// Returns the effective window, the number of pairs currently inside it
    pub fn count(&self) -> usize {
        self.buf.len()
    }

    /// Returns true once the window has filled up to its period
    pub fn is_ready(&self) -> bool {
        self.buf.is_full()
    }

    /// Returns the most recent pair
    pub const fn value(&self) -> Option<(T, T)> {
        self.value
    }

    /// Returns the moving averages of `x` and `y`
    ///
    /// # Returns
    ///
    /// * `Option<(T, T)>` - The moving averages, or `None` before the first pair
    pub fn mean(&self) -> Option<(T, T)> {
        self.value.map(|_| self.mean)
    }

    /// Returns the moving average of `x·y`
    ///
    /// # Returns
    ///
    /// * `Option<T>` - The moving product average, or `None` before the first pair
    pub fn mean_prod(&self) -> Option<T> {
        self.value.map(|_| self.mean_prod)
    }

    /// Returns the population covariance over the effective window
    ///
    /// Defined as zero for a single pair.
    ///
    /// # Returns
    ///
    /// * `Option<T>` - The covariance, or `None` before the first pair
    pub fn cov(&self) -> Option<T> {
        match self.count() {
            0 => None,
            1 => Some(T::zero()),
            _ => Some(helper::moving_covariance(
                self.mean.0,
                self.mean.1,
                self.mean_prod,
            )),
        }
    }

    /// Returns the pairs inside the window, oldest first
    pub fn samples(&self) -> Vec<(T, T)> {
        self.buf.iter().copied().collect()
    }
}
