//! Simple percentage returns.

use chrono::NaiveDate;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{Error, PricePoint, Result};

/// A dated return
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnPoint {
    /// Date the return is realised on
    pub date: NaiveDate,
    /// Simple return, `0.01` for one percent
    pub value: f64,
}

impl ReturnPoint {
    /// Creates a dated return
    pub const fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Returns ordered by date.
///
/// Rolling computations consume the series strictly in date order. A series
/// assembled out of order is put right by [`ReturnSeries::ensure_sorted`],
/// and [`ReturnSeries::push`] refuses points that would break the order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReturnSeries {
    points: Vec<ReturnPoint>,
}

impl ReturnSeries {
    /// Creates an empty series
    pub const fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Wraps points as they are, without sorting them
    pub const fn from_points(points: Vec<ReturnPoint>) -> Self {
        Self { points }
    }

    /// Appends a point dated strictly after the current last point
    pub fn push(&mut self, point: ReturnPoint) -> Result<()> {
        ensure_after(self.last().map(|p| p.date), point.date)?;
        self.points.push(point);
        Ok(())
    }

    /// Returns true if the points are in non-decreasing date order
    pub fn is_sorted(&self) -> bool {
        self.points.windows(2).all(|w| w[0].date <= w[1].date)
    }

    /// Sorts the points by date in place if they are out of order
    ///
    /// # Returns
    ///
    /// * `bool` - True if the series had to be re-sorted
    pub fn ensure_sorted(&mut self) -> bool {
        if self.is_sorted() {
            return false;
        }
        debug!("re-sorting {} returns by date", self.points.len());
        self.points.sort_by_key(|p| p.date);
        true
    }

    /// Returns the position of `date`, the series must be sorted
    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        self.points.binary_search_by_key(&date, |p| p.date).ok()
    }

    /// Returns the return on `date`, the series must be sorted
    pub fn value_at(&self, date: NaiveDate) -> Option<f64> {
        self.position(date).map(|i| self.points[i].value)
    }

    /// Returns the dates whose return is infinite or NaN
    pub fn degeneracies(&self) -> Vec<NaiveDate> {
        self.points
            .iter()
            .filter(|p| !p.value.is_finite())
            .map(|p| p.date)
            .collect()
    }

    /// Surfaces the first non-finite return as [`Error::ArithmeticDegeneracy`]
    ///
    /// A non-finite return fed to the rolling statistics leaves their moving
    /// averages NaN from then on, even after it leaves the window. One zero
    /// close before the event is enough to make every later forecast NaN.
    pub fn ensure_finite(&self) -> Result<()> {
        match self.points.iter().find(|p| !p.value.is_finite()) {
            Some(p) => Err(Error::ArithmeticDegeneracy { date: p.date }),
            None => Ok(()),
        }
    }

    /// Returns the number of points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the series is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the point at `index`
    pub fn get(&self, index: usize) -> Option<&ReturnPoint> {
        self.points.get(index)
    }

    /// Returns the first point
    pub fn first(&self) -> Option<&ReturnPoint> {
        self.points.first()
    }

    /// Returns the last point
    pub fn last(&self) -> Option<&ReturnPoint> {
        self.points.last()
    }

    /// Returns the points
    pub fn as_slice(&self) -> &[ReturnPoint] {
        &self.points
    }

    /// Iterates over the points
    pub fn iter(&self) -> core::slice::Iter<'_, ReturnPoint> {
        self.points.iter()
    }

    /// Returns the return values without their dates
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }
}

impl FromIterator<ReturnPoint> for ReturnSeries {
    fn from_iter<I: IntoIterator<Item = ReturnPoint>>(iter: I) -> Self {
        Self::from_points(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ReturnSeries {
    type Item = &'a ReturnPoint;
    type IntoIter = core::slice::Iter<'a, ReturnPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Rejects a date that does not come strictly after `last`
pub(crate) fn ensure_after(last: Option<NaiveDate>, date: NaiveDate) -> Result<()> {
    match last {
        Some(last) if date <= last => Err(Error::alignment(format!(
            "{date} does not follow {last}"
        ))),
        _ => Ok(()),
    }
}

/// Computes simple returns of the closing prices
///
/// The prices must already be in date order, this function does not sort.
/// The first point has no prior close and its return is zero by convention.
/// A zero prior close yields an infinite or NaN return which is kept as is;
/// see [`ReturnSeries::degeneracies`].
///
/// # Arguments
///
/// * `prices` - Candles in ascending date order
///
/// # Returns
///
/// * `ReturnSeries` - One return per candle
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use event_study::{PricePoint, compute_returns};
/// use assert_approx_eq::assert_approx_eq;
///
/// let day = |d| NaiveDate::from_ymd_opt(2020, 3, d).unwrap();
/// let prices: Vec<_> = [100.0, 102.0, 101.0, 105.0]
///     .iter()
///     .zip(2..)
///     .map(|(&close, d)| PricePoint::from_close(day(d), close))
///     .collect();
///
/// let returns = compute_returns(&prices).values();
/// let expected: [f64; 4] = [0.0, 0.02, -0.00980392, 0.03960396];
/// for (e, r) in expected.iter().zip(&returns) {
///     assert_approx_eq!(*e, *r, 1e-8);
/// }
/// ```
pub fn compute_returns(prices: &[PricePoint]) -> ReturnSeries {
    let Some(first) = prices.first() else {
        return ReturnSeries::new();
    };
    core::iter::once(ReturnPoint::new(first.date, 0.0))
        .chain(prices.windows(2).map(|w| simple_return(&w[0], &w[1])))
        .collect()
}

fn simple_return(prev: &PricePoint, curr: &PricePoint) -> ReturnPoint {
    if prev.close == 0.0 {
        warn!(
            "zero close on {} makes the return on {} degenerate",
            prev.date, curr.date
        );
    }
    ReturnPoint::new(curr.date, (curr.close - prev.close) / prev.close)
}
