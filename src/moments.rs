use num_traits::Float;

use crate::{RingBuffer, helper};

/// Streaming first and second moments of a single series.
///
/// The window expands from one sample up to `period` samples and slides from
/// then on. Every update is a single step of the sliding mean recurrence:
///
/// ```text
/// MA[i] = MA[i-1] + (x[i] - old) / n
/// ```
///
/// where `n` is the effective window and `old` is the sample evicted from a
/// full window, or `MA[i-1]` while the window is still expanding. The squared
/// average follows the same recurrence over `x²`, and the variance is derived
/// from both as `MAS - MA²`. Nothing is ever re-summed over the window, so an
/// update costs O(1) regardless of `period`.
#[derive(Debug, Clone)]
pub struct Moments<T> {
    /// Window period
    period: usize,
    /// Samples currently inside the window
    buf: RingBuffer<T>,
    /// Most recent sample
    value: Option<T>,
    /// Sample evicted by the most recent update
    popped: Option<T>,
    /// Moving average
    mean: T,
    /// Moving average of squares
    mean_sq: T,
}

impl<T: Float + Default> Moments<T> {
    /// Creates empty moments over `period` samples, panics if `period` is zero
    ///
    /// # Arguments
    ///
    /// * `period` - The window period
    ///
    /// # Returns
    ///
    /// * `Self` - The moments object
    pub fn new(period: usize) -> Self {
        Self {
            period,
            buf: RingBuffer::new(period),
            value: None,
            popped: None,
            mean: T::zero(),
            mean_sq: T::zero(),
        }
    }

    /// Resets the moments to the empty state
    ///
    /// # Returns
    ///
    /// * `&mut Self` - The moments object
    pub fn reset(&mut self) -> &mut Self {
        self.buf.clear();
        self.value = None;
        self.popped = None;
        self.mean = T::zero();
        self.mean_sq = T::zero();
        self
    }

    /// Feeds the next sample of the series
    ///
    /// # Arguments
    ///
    /// * `value` - The sample entering the window
    ///
    /// A non-finite sample leaves the moving averages NaN for good, even after
    /// it has left the window, because the recurrence subtracts it back out.
    ///
    /// # Returns
    ///
    /// * `&mut Self` - The moments object
    ///
    /// # Examples
    ///
    /// ```
    /// use event_study::Moments;
    /// use assert_approx_eq::assert_approx_eq;
    ///
    /// let mut moments = Moments::<f64>::new(3);
    /// let mut results = vec![];
    /// for r in [0.01, 0.03, -0.01, 0.05] {
    ///     moments.next(r).mean().map(|m| results.push(m));
    /// }
    ///
    /// let expected: [f64; 4] = [0.01, 0.02, 0.01, 0.07 / 3.0];
    /// for (e, r) in expected.iter().zip(&results) {
    ///     assert_approx_eq!(*e, *r, 1e-12);
    /// }
    /// ```
    pub fn next(&mut self, value: T) -> &mut Self {
        let first = self.buf.is_empty();
        self.popped = self.buf.push(value);
        self.value = Some(value);

        if first {
            self.mean = value;
            self.mean_sq = value * value;
        } else {
            self.update(value);
        }
        self
    }

    fn update(&mut self, value: T) -> Option<()> {
        let n = T::from(self.buf.len())?;
        let (old, old_sq) = match self.popped {
            Some(p) => (p, p * p),
            None => (self.mean, self.mean_sq),
        };
        self.mean = helper::moving_average(self.mean, old, value, n);
        self.mean_sq = helper::moving_average(self.mean_sq, old_sq, value * value, n);
        Some(())
    }

    /// Returns the window period
    pub const fn period(&self) -> usize {
        self.period
    }

    /// Returns the effective window, the number of samples currently inside it
    pub fn count(&self) -> usize {
        self.buf.len()
    }

    /// Returns true once the window has filled up to its period
    pub fn is_ready(&self) -> bool {
        self.buf.is_full()
    }

    /// Returns the most recent sample
    pub const fn value(&self) -> Option<T> {
        self.value
    }

    /// Returns the sample evicted by the most recent update, if the window was full
    pub const fn popped(&self) -> Option<T> {
        self.popped
    }

    /// Returns the moving average
    ///
    /// # Returns
    ///
    /// * `Option<T>` - The moving average, or `None` before the first sample
    pub fn mean(&self) -> Option<T> {
        self.value.map(|_| self.mean)
    }

    /// Returns the moving average of squared samples
    ///
    /// # Returns
    ///
    /// * `Option<T>` - The moving squared average, or `None` before the first sample
    pub fn mean_sq(&self) -> Option<T> {
        self.value.map(|_| self.mean_sq)
    }

    /// Returns the population variance over the effective window
    ///
    /// Defined as zero for a single sample.
    ///
    /// # Returns
    ///
    /// * `Option<T>` - The variance, or `None` before the first sample
    pub fn variance(&self) -> Option<T> {
        match self.count() {
            0 => None,
            1 => Some(T::zero()),
            _ => Some(helper::moving_variance(self.mean, self.mean_sq)),
        }
    }

    /// Returns the population standard deviation over the effective window
    ///
    /// # Returns
    ///
    /// * `Option<T>` - The standard deviation, or `None` before the first sample
    pub fn stddev(&self) -> Option<T> {
        self.variance().map(T::sqrt)
    }

    /// Returns true if every sample inside the window is the same value
    ///
    /// The recurrence can not tell a flat window from one with a tiny spread:
    /// a window that went flat after earlier moves keeps a rounding residue in
    /// [`Moments::variance`]. This check looks at the samples themselves.
    pub fn is_flat(&self) -> bool {
        let mut samples = self.buf.iter();
        match samples.next() {
            Some(first) => samples.all(|v| v == first),
            None => false,
        }
    }

    /// Returns the samples inside the window, oldest first
    pub fn samples(&self) -> Vec<T> {
        self.buf.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;
    use crate::helper::{mean, population_variance};

    fn inputs() -> Vec<f64> {
        (0..40)
            .map(|i| 0.02 * (i as f64 * 0.7).sin() + 0.005 * (i as f64 * 1.9).cos())
            .collect()
    }

    #[test]
    fn first_sample_defines_the_moments() {
        let mut moments = Moments::new(5);
        assert_eq!(moments.mean(), None);
        assert_eq!(moments.variance(), None);

        moments.next(0.03);
        assert_eq!(moments.mean(), Some(0.03));
        assert_eq!(moments.mean_sq(), Some(0.03 * 0.03));
        assert_eq!(moments.variance(), Some(0.0));
    }

    #[test]
    fn mean_matches_direct_mean_over_effective_window() {
        let inputs = inputs();
        for period in [1, 2, 5, 13] {
            let mut moments = Moments::new(period);
            for (i, &x) in inputs.iter().enumerate() {
                let n = (i + 1).min(period);
                let window = &inputs[i + 1 - n..=i];
                let got = moments.next(x).mean().unwrap_or(f64::NAN);
                assert_approx_eq!(got, mean(window).unwrap_or_default(), 1e-9);
            }
        }
    }

    #[test]
    fn variance_matches_direct_variance_over_effective_window() {
        let inputs = inputs();
        for period in [2, 4, 10, 40] {
            let mut moments = Moments::new(period);
            for (i, &x) in inputs.iter().enumerate() {
                let n = (i + 1).min(period);
                let window = &inputs[i + 1 - n..=i];
                let got = moments.next(x).variance().unwrap_or(f64::NAN);
                assert_approx_eq!(got, population_variance(window).unwrap_or_default(), 1e-9);
            }
        }
    }

    #[test]
    fn window_longer_than_series_gives_whole_series_mean() {
        let inputs = inputs();
        let mut moments = Moments::new(inputs.len() + 10);
        inputs.iter().for_each(|&x| {
            moments.next(x);
        });
        assert!(!moments.is_ready());
        assert_eq!(moments.count(), inputs.len());
        assert_approx_eq!(
            moments.mean().unwrap_or(f64::NAN),
            mean(&inputs).unwrap_or_default(),
            1e-9
        );
    }

    #[test]
    fn constant_zero_series_has_exactly_zero_variance() {
        let mut moments = Moments::new(3);
        for _ in 0..10 {
            assert_eq!(moments.next(0.0).variance(), Some(0.0));
        }
    }

    #[test]
    fn window_gone_flat_after_moves_is_flat_and_never_negative() {
        let returns = [0.0, 0.0123, -0.0071, 0.0094, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        for period in [3, 5, 7] {
            let mut moments = Moments::new(period);
            for &r in &returns {
                let var = moments.next(r).variance().unwrap_or(f64::NAN);
                assert!(var >= 0.0, "period {period}: {var:e}");
                assert!(moments.stddev().is_some());
            }
            assert!(moments.is_flat());
            assert!(moments.variance().unwrap_or(f64::NAN) < 1e-18);
        }
        let mut moving = Moments::new(3);
        moving.next(0.0).next(0.0).next(0.01);
        assert!(!moving.is_flat());
        assert!(!Moments::<f64>::new(3).is_flat());
    }

    #[test]
    fn non_finite_sample_poisons_later_means() {
        let mut moments = Moments::new(3);
        moments.next(0.01).next(0.02).next(f64::INFINITY);
        for _ in 0..8 {
            moments.next(0.01);
        }
        assert!(moments.samples().iter().all(|v| v.is_finite()));
        assert!(moments.mean().is_some_and(f64::is_nan));
    }

    #[test]
    fn tracks_evicted_samples() {
        let mut moments = Moments::new(2);
        moments.next(1.0).next(2.0);
        assert_eq!(moments.popped(), None);
        assert!(moments.is_ready());
        moments.next(3.0);
        assert_eq!(moments.popped(), Some(1.0));
        assert_eq!(moments.value(), Some(3.0));
        assert_eq!(moments.samples(), vec![2.0, 3.0]);
        assert_approx_eq!(moments.stddev().unwrap_or(f64::NAN), 0.5, 1e-12);
    }

    #[test]
    fn reset_matches_fresh_instance() {
        let inputs = inputs();
        let mut reused = Moments::new(4);
        inputs.iter().take(7).for_each(|&x| {
            reused.next(x);
        });
        reused.reset();

        let mut fresh = Moments::new(4);
        for &x in &inputs {
            assert_eq!(reused.next(x).mean(), fresh.next(x).mean());
        }
    }
}
