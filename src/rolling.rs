//! Rolling statistic series over return series.
//!
//! Each container owns one parallel series per statistic, one entry per
//! return it was fed, indexed by position. The bulk entry points are plain
//! loops over the single-step `append`, so both call styles yield
//! bit-identical values.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Moments, PairedMoments, Result, ReturnPoint, ReturnSeries, returns::ensure_after};

/// A dated value of a rolling statistic
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovingPoint {
    /// Date of the sample that produced the value
    pub date: NaiveDate,
    /// Statistic value
    pub value: f64,
}

impl MovingPoint {
    /// Creates a dated statistic value
    pub const fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Moving average, moving squared average and moving variance of one return series
#[derive(Debug, Clone)]
pub struct RollingStatistics {
    moments: Moments<f64>,
    average: Vec<MovingPoint>,
    squared_average: Vec<MovingPoint>,
    variance: Vec<MovingPoint>,
}

impl RollingStatistics {
    /// Creates empty statistics, panics if `window` is zero
    pub fn new(window: usize) -> Self {
        Self {
            moments: Moments::new(window),
            average: Vec::new(),
            squared_average: Vec::new(),
            variance: Vec::new(),
        }
    }

    /// Computes the statistics over a whole series
    ///
    /// # Arguments
    ///
    /// * `series` - Returns in strictly increasing date order
    /// * `window` - The window period
    ///
    /// # Returns
    ///
    /// * `Result<Self>` - One entry per return, or [`Error::Alignment`] if the
    ///   series is not strictly increasing by date
    pub fn compute(series: &ReturnSeries, window: usize) -> Result<Self> {
        let mut stats = Self::new(window);
        for point in series {
            stats.append(*point)?;
        }
        Ok(stats)
    }

    /// Extends every statistic by the single-step recurrence for one more return
    ///
    /// # Arguments
    ///
    /// * `point` - The next return, dated after the last one appended
    ///
    /// # Returns
    ///
    /// * `Result<&mut Self>` - The statistics object
    pub fn append(&mut self, point: ReturnPoint) -> Result<&mut Self> {
        ensure_after(self.last_date(), point.date)?;
        let moments = self.moments.next(point.value);
        let (Some(mean), Some(mean_sq), Some(variance)) =
            (moments.mean(), moments.mean_sq(), moments.variance())
        else {
            return Err(Error::InsufficientData {
                required: 1,
                available: 0,
            });
        };

        self.average.push(MovingPoint::new(point.date, mean));
        self.squared_average.push(MovingPoint::new(point.date, mean_sq));
        self.variance.push(MovingPoint::new(point.date, variance));
        Ok(self)
    }

    /// Returns the window period
    pub const fn window(&self) -> usize {
        self.moments.period()
    }

    /// Returns the number of returns appended so far
    pub fn len(&self) -> usize {
        self.average.len()
    }

    /// Returns true if nothing has been appended
    pub fn is_empty(&self) -> bool {
        self.average.is_empty()
    }

    /// Moving average series
    pub fn average(&self) -> &[MovingPoint] {
        &self.average
    }

    /// Moving squared average series
    pub fn squared_average(&self) -> &[MovingPoint] {
        &self.squared_average
    }

    /// Moving variance series
    pub fn variance(&self) -> &[MovingPoint] {
        &self.variance
    }

    /// Returns the latest moving variance
    pub fn last_variance(&self) -> Option<MovingPoint> {
        self.variance.last().copied()
    }

    /// Returns the latest moving squared average
    pub fn last_squared_average(&self) -> Option<MovingPoint> {
        self.squared_average.last().copied()
    }

    /// Returns the number of returns inside the current window
    pub fn effective_window(&self) -> usize {
        self.moments.count()
    }

    /// Returns true if every return inside the current window is the same value
    pub fn is_flat(&self) -> bool {
        self.moments.is_flat()
    }

    /// Returns the returns inside the current window, oldest first
    pub fn window_samples(&self) -> Vec<f64> {
        self.moments.samples()
    }

    fn last_date(&self) -> Option<NaiveDate> {
        self.average.last().map(|p| p.date)
    }
}

/// Moving product average and moving covariance of two date-aligned return series
#[derive(Debug, Clone)]
pub struct RollingCovariance {
    moments: PairedMoments<f64>,
    product_average: Vec<MovingPoint>,
    covariance: Vec<MovingPoint>,
}

impl RollingCovariance {
    /// Creates an empty covariance, panics if `window` is zero
    pub fn new(window: usize) -> Self {
        Self {
            moments: PairedMoments::new(window),
            product_average: Vec::new(),
            covariance: Vec::new(),
        }
    }

    /// Computes the covariance over two whole series
    ///
    /// # Arguments
    ///
    /// * `x` - Returns in strictly increasing date order
    /// * `y` - Returns on exactly the same dates as `x`
    /// * `window` - The window period
    ///
    /// # Returns
    ///
    /// * `Result<Self>` - One entry per pair, or [`Error::Alignment`] if the
    ///   series differ in length or dates
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{Days, NaiveDate};
    /// use event_study::{ReturnPoint, ReturnSeries, RollingCovariance, RollingStatistics};
    /// use assert_approx_eq::assert_approx_eq;
    ///
    /// let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    /// let market: ReturnSeries = [0.01, -0.02, 0.015, 0.005, -0.01]
    ///     .iter()
    ///     .zip(0..)
    ///     .map(|(&r, i)| ReturnPoint::new(start + Days::new(i), r))
    ///     .collect();
    /// let stock: ReturnSeries = market
    ///     .iter()
    ///     .map(|p| ReturnPoint::new(p.date, 2.0 * p.value))
    ///     .collect();
    ///
    /// let cov = RollingCovariance::compute(&stock, &market, 3).unwrap();
    /// let var = RollingStatistics::compute(&market, 3).unwrap();
    /// let beta = cov.last_covariance().unwrap().value / var.last_variance().unwrap().value;
    /// assert_approx_eq!(beta, 2.0, 1e-9);
    /// ```
    pub fn compute(x: &ReturnSeries, y: &ReturnSeries, window: usize) -> Result<Self> {
        if x.len() != y.len() {
            return Err(Error::alignment(format!(
                "paired series differ in length: {} and {}",
                x.len(),
                y.len()
            )));
        }
        let mut cov = Self::new(window);
        for (a, b) in x.iter().zip(y) {
            cov.append(*a, *b)?;
        }
        Ok(cov)
    }

    /// Extends the covariance by the single-step recurrence for one more pair
    ///
    /// # Arguments
    ///
    /// * `x` - The next return of the first series
    /// * `y` - The next return of the second series, on the same date as `x`
    ///
    /// # Returns
    ///
    /// * `Result<&mut Self>` - The covariance object
    pub fn append(&mut self, x: ReturnPoint, y: ReturnPoint) -> Result<&mut Self> {
        if x.date != y.date {
            return Err(Error::alignment(format!(
                "paired returns dated {} and {}",
                x.date, y.date
            )));
        }
        ensure_after(self.covariance.last().map(|p| p.date), x.date)?;
        let moments = self.moments.next((x.value, y.value));
        let (Some(mean_prod), Some(cov)) = (moments.mean_prod(), moments.cov()) else {
            return Err(Error::InsufficientData {
                required: 1,
                available: 0,
            });
        };

        self.product_average.push(MovingPoint::new(x.date, mean_prod));
        self.covariance.push(MovingPoint::new(x.date, cov));
        Ok(self)
    }

    /// Returns the window period
    pub const fn window(&self) -> usize {
        self.moments.period()
    }

    /// Returns the number of pairs appended so far
    pub fn len(&self) -> usize {
        self.covariance.len()
    }

    /// Returns true if nothing has been appended
    pub fn is_empty(&self) -> bool {
        self.covariance.is_empty()
    }

    /// Moving product average series
    pub fn product_average(&self) -> &[MovingPoint] {
        &self.product_average
    }

    /// Moving covariance series
    pub fn covariance(&self) -> &[MovingPoint] {
        &self.covariance
    }

    /// Returns the latest moving covariance
    pub fn last_covariance(&self) -> Option<MovingPoint> {
        self.covariance.last().copied()
    }

    /// Returns the pairs inside the current window, oldest first
    pub fn window_samples(&self) -> Vec<(f64, f64)> {
        self.moments.samples()
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;
    use chrono::Days;

    use super::*;
    use crate::helper::{mean, population_covariance, population_variance};

    fn series(values: &[f64]) -> ReturnSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap_or(NaiveDate::MIN);
        values
            .iter()
            .zip(0..)
            .map(|(&v, i)| ReturnPoint::new(start + Days::new(i), v))
            .collect()
    }

    fn market() -> Vec<f64> {
        (0..60)
            .map(|i| 0.012 * (i as f64 * 0.8).sin() - 0.003 * (i as f64 * 0.35).cos())
            .collect()
    }

    fn stock() -> Vec<f64> {
        market()
            .iter()
            .enumerate()
            .map(|(i, m)| 0.0005 + 1.3 * m + 0.004 * (i as f64 * 2.1).sin())
            .collect()
    }

    #[test]
    fn series_lengths_match_input() {
        let returns = series(&market());
        let stats = RollingStatistics::compute(&returns, 10).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(stats.len(), returns.len());
        assert_eq!(stats.average().len(), returns.len());
        assert_eq!(stats.squared_average().len(), returns.len());
        assert_eq!(stats.variance().len(), returns.len());
        assert_eq!(stats.window(), 10);
    }

    #[test]
    fn index_zero_boundary_values() {
        let returns = series(&[0.0, 0.02, -0.01]);
        let stats = RollingStatistics::compute(&returns, 2).unwrap_or_else(|e| panic!("{e}"));
        let cov = RollingCovariance::compute(&returns, &returns, 2).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(stats.average()[0].value, 0.0);
        assert_eq!(stats.variance()[0].value, 0.0);
        assert_eq!(cov.covariance()[0].value, 0.0);
    }

    #[test]
    fn bulk_equals_single_step_appends() {
        let returns = series(&market());
        let other = series(&stock());
        let bulk = RollingStatistics::compute(&returns, 7).unwrap_or_else(|e| panic!("{e}"));
        let bulk_cov = RollingCovariance::compute(&other, &returns, 7).unwrap_or_else(|e| panic!("{e}"));

        let mut stepped = RollingStatistics::new(7);
        let mut stepped_cov = RollingCovariance::new(7);
        for (x, m) in other.iter().zip(&returns) {
            assert!(stepped.append(*m).is_ok());
            assert!(stepped_cov.append(*x, *m).is_ok());
        }

        assert_eq!(bulk.average(), stepped.average());
        assert_eq!(bulk.squared_average(), stepped.squared_average());
        assert_eq!(bulk.variance(), stepped.variance());
        assert_eq!(bulk_cov.product_average(), stepped_cov.product_average());
        assert_eq!(bulk_cov.covariance(), stepped_cov.covariance());
    }

    #[test]
    fn variance_matches_direct_formula_at_every_index() {
        let values = market();
        let stats = RollingStatistics::compute(&series(&values), 12).unwrap_or_else(|e| panic!("{e}"));
        for (i, point) in stats.variance().iter().enumerate() {
            let n = (i + 1).min(12);
            let expected = population_variance(&values[i + 1 - n..=i]).unwrap_or_default();
            assert_approx_eq!(point.value, expected, 1e-9);
        }
    }

    #[test]
    fn covariance_matches_direct_formula_at_every_index() {
        let xs = stock();
        let ys = market();
        let cov = RollingCovariance::compute(&series(&xs), &series(&ys), 9)
            .unwrap_or_else(|e| panic!("{e}"));
        for (i, point) in cov.covariance().iter().enumerate() {
            let n = (i + 1).min(9);
            let expected =
                population_covariance(&xs[i + 1 - n..=i], &ys[i + 1 - n..=i]).unwrap_or_default();
            assert_approx_eq!(point.value, expected, 1e-9);
        }
    }

    #[test]
    fn full_length_window_averages_whole_series() {
        let values = market();
        for window in [values.len(), values.len() + 5] {
            let stats =
                RollingStatistics::compute(&series(&values), window).unwrap_or_else(|e| panic!("{e}"));
            let last = stats.average().last().map(|p| p.value).unwrap_or(f64::NAN);
            assert_approx_eq!(last, mean(&values).unwrap_or_default(), 1e-9);
        }
    }

    #[test]
    fn beta_converges_with_window() {
        // y = 1.5x + e, where e is a zero-mean oscillation unrelated to x
        let n = 600;
        let xs: Vec<f64> = (0..n).map(|i| 0.02 * (i as f64 * 0.7).sin()).collect();
        let ys: Vec<f64> = xs
            .iter()
            .enumerate()
            .map(|(i, x)| 1.5 * x + 0.006 * (i as f64 * 2.3 + 1.0).sin())
            .collect();
        let (x, y) = (series(&xs), series(&ys));

        let beta = |window| {
            let cov = RollingCovariance::compute(&y, &x, window).unwrap_or_else(|e| panic!("{e}"));
            let var = RollingStatistics::compute(&x, window).unwrap_or_else(|e| panic!("{e}"));
            let cov = cov.last_covariance().map(|p| p.value).unwrap_or(f64::NAN);
            cov / var.last_variance().map(|p| p.value).unwrap_or(f64::NAN)
        };

        let error = |window| (beta(window) - 1.5).abs();
        assert!(error(50) > error(150));
        assert!(error(150) > error(600));
        assert!(error(600) < 1e-3);
    }

    #[test]
    fn perfectly_proportional_series_have_beta_two() {
        let xs = market();
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x).collect();
        let cov = RollingCovariance::compute(&series(&ys), &series(&xs), 10)
            .unwrap_or_else(|e| panic!("{e}"));
        let var = RollingStatistics::compute(&series(&xs), 10).unwrap_or_else(|e| panic!("{e}"));
        for (c, v) in cov.covariance().iter().zip(var.variance()).skip(9) {
            assert_approx_eq!(c.value / v.value, 2.0, 1e-9);
        }
    }

    #[test]
    fn constant_series_has_exactly_zero_variance() {
        let stats = RollingStatistics::compute(&series(&[0.0; 8]), 3).unwrap_or_else(|e| panic!("{e}"));
        assert!(stats.variance().iter().all(|p| p.value == 0.0));
    }

    #[test]
    fn append_rejects_unsorted_dates() {
        let mut returns = series(&[0.01, 0.02, 0.03]).as_slice().to_vec();
        returns.swap(0, 2);
        let result = RollingStatistics::compute(&ReturnSeries::from_points(returns), 2);
        assert!(matches!(result, Err(Error::Alignment { .. })));
    }

    #[test]
    fn covariance_rejects_misaligned_series() {
        let x = series(&[0.01, 0.02, 0.03]);
        let shorter = series(&[0.01, 0.02]);
        assert!(matches!(
            RollingCovariance::compute(&x, &shorter, 2),
            Err(Error::Alignment { .. })
        ));

        let mut cov = RollingCovariance::new(2);
        let (a, b) = (x.as_slice()[0], x.as_slice()[1]);
        assert!(matches!(cov.append(a, b), Err(Error::Alignment { .. })));
        assert!(cov.is_empty());
    }

    #[test]
    fn window_samples_track_the_window() {
        let returns = series(&[0.01, 0.02, 0.03, 0.04]);
        let stats = RollingStatistics::compute(&returns, 3).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(stats.window_samples(), vec![0.02, 0.03, 0.04]);
        let cov = RollingCovariance::compute(&returns, &returns, 2).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(cov.window_samples(), vec![(0.03, 0.03), (0.04, 0.04)]);
    }
}
