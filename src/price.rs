//! Daily price candles.

use std::{fs::File, io, path::Path};

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{Result, ReturnSeries, compute_returns};

/// One daily candle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Trading date
    pub date: NaiveDate,
    /// Opening price
    pub open: f64,
    /// Highest price
    pub high: f64,
    /// Lowest price
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Traded volume
    pub volume: f64,
}

impl PricePoint {
    /// Creates a candle from all of its fields
    pub const fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Creates a flat candle where every price equals `close` and volume is zero
    pub const fn from_close(date: NaiveDate, close: f64) -> Self {
        Self::new(date, close, close, close, close, 0.0)
    }
}

/// Candles ordered by date, at most one per date.
///
/// Candles from a data source may arrive out of order or overlap between
/// fetched ranges; construction sorts them and keeps the first candle seen
/// for each date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Sorts and deduplicates the candles by date
    pub fn new(mut points: Vec<PricePoint>) -> Self {
        let fetched = points.len();
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        if points.len() < fetched {
            debug!(
                "dropped {} duplicate candles, {} remain",
                fetched - points.len(),
                points.len()
            );
        }
        Self { points }
    }

    /// Reads candles from delimited text with a `date,open,high,low,close,volume` header
    ///
    /// # Arguments
    ///
    /// * `reader` - The source of the delimited text
    /// * `delimiter` - The field delimiter
    ///
    /// # Returns
    ///
    /// * `Result<Self>` - The sorted, deduplicated series
    pub fn from_csv_reader<R: io::Read>(reader: R, delimiter: u8) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let points = rdr
            .deserialize()
            .collect::<core::result::Result<Vec<PricePoint>, _>>()?;
        Ok(Self::new(points))
    }

    /// Reads candles from a delimited text file, see [`PriceSeries::from_csv_reader`]
    pub fn from_csv_path(path: impl AsRef<Path>, delimiter: u8) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_csv_reader(io::BufReader::new(file), delimiter)
    }

    /// Returns the candles dated within `[start, end]`
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            points: self
                .points
                .iter()
                .filter(|p| start <= p.date && p.date <= end)
                .copied()
                .collect(),
        }
    }

    /// Computes the simple returns of the closing prices
    pub fn returns(&self) -> ReturnSeries {
        compute_returns(&self.points)
    }

    /// Returns the number of candles
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if there are no candles
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the candles in date order
    pub fn as_slice(&self) -> &[PricePoint] {
        &self.points
    }

    /// Iterates over the candles in date order
    pub fn iter(&self) -> impl Iterator<Item = &PricePoint> {
        self.points.iter()
    }
}

impl FromIterator<PricePoint> for PriceSeries {
    fn from_iter<I: IntoIterator<Item = PricePoint>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
