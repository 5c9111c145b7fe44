//! Sliding-window recurrences and the direct formulas they are checked against.

use num_traits::Float;

use crate::Kbn;

/// Single step of the sliding mean recurrence
///
/// # Arguments
///
/// * `prev` - The mean before the update
/// * `old` - The contribution leaving the window: the evicted sample once the
///   window is full, or `prev` itself while the window is still expanding
/// * `new` - The sample entering the window
/// * `n` - The effective window after the update
///
/// # Returns
///
/// * `T` - The updated mean
#[inline]
pub fn moving_average<T: Float>(prev: T, old: T, new: T, n: T) -> T {
    prev + (new - old) / n
}

/// Population variance from the first two moving moments, `E[X²] - E[X]²`
///
/// Clamped at zero. Rounding in the recurrences can leave the difference a
/// few ulps below zero once the window has gone flat.
#[inline]
pub fn moving_variance<T: Float>(mean: T, mean_sq: T) -> T {
    (mean_sq - mean * mean).max(T::zero())
}

/// Population covariance from moving moments, `E[XY] - E[X]E[Y]`
#[inline]
pub fn moving_covariance<T: Float>(mean_x: T, mean_y: T, mean_prod: T) -> T {
    mean_prod - mean_x * mean_y
}

/// Returns the arithmetic mean of a slice
///
/// Direct, non-streaming computation using Kahan-Babuska-Neumaier summation.
///
/// # Returns
///
/// * `Option<T>` - The mean, or `None` if the slice is empty
pub fn mean<T: Float + Default>(values: &[T]) -> Option<T> {
    if values.is_empty() {
        return None;
    }
    let mut sum = Kbn::<T>::default();
    for &v in values {
        sum += v;
    }
    T::from(values.len()).map(|n| sum.total() / n)
}

/// Returns the population variance of a slice, computed in two passes
///
/// # Returns
///
/// * `Option<T>` - The variance, or `None` if the slice is empty
pub fn population_variance<T: Float + Default>(values: &[T]) -> Option<T> {
    let mean = mean(values)?;
    let n = T::from(values.len())?;
    let mut acc = Kbn::<T>::default();
    for &v in values {
        let d = v - mean;
        acc += d * d;
    }
    Some(acc.total() / n)
}

/// Returns the population covariance of two equally long slices
///
/// # Returns
///
/// * `Option<T>` - The covariance, or `None` if the slices are empty or differ in length
pub fn population_covariance<T: Float + Default>(xs: &[T], ys: &[T]) -> Option<T> {
    if xs.len() != ys.len() {
        return None;
    }
    let mean_x = mean(xs)?;
    let mean_y = mean(ys)?;
    let n = T::from(xs.len())?;
    let mut acc = Kbn::<T>::default();
    for (&x, &y) in xs.iter().zip(ys) {
        acc += (x - mean_x) * (y - mean_y);
    }
    Some(acc.total() / n)
}
