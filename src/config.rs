//! Event study configuration.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// How the cumulative abnormal return column is aggregated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarMethod {
    /// `CAR[i] = AR[i-1] + AR[i]`, with `CAR[0] = 0`
    #[default]
    Pairwise,
    /// Running total of abnormal returns from the first fitted date
    Running,
}

/// Parameters of the CAPM estimation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapmConfig {
    /// Rolling window length
    pub window: usize,
    /// Number of returns to forecast past the estimation period
    pub period: usize,
    /// Risk-free rate per return period
    pub risk_free_rate: f64,
    /// First date of the estimation period, inclusive
    pub start: NaiveDate,
    /// Last date of the estimation period, inclusive
    pub end: NaiveDate,
}

impl CapmConfig {
    /// Checks the window, period, rate and date range
    pub fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(Error::InvalidConfig("window must be at least 1".into()));
        }
        if self.period == 0 {
            return Err(Error::InvalidConfig("period must be at least 1".into()));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "risk-free rate {} is not finite",
                self.risk_free_rate
            )));
        }
        if self.start > self.end {
            return Err(Error::InvalidConfig(format!(
                "estimation start {} is after its end {}",
                self.start, self.end
            )));
        }
        Ok(())
    }
}

/// Everything needed to run an event study.
///
/// Missing fields fall back to the defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventStudyConfig {
    /// Instrument ticker
    pub ticker: String,
    /// Benchmark index ticker
    pub benchmark: String,
    /// Risk-free rate per return period
    pub risk_free_rate: f64,
    /// Rolling window length
    pub window: usize,
    /// Number of returns to forecast from the event onwards
    pub period: usize,
    /// First date of price history
    pub start: NaiveDate,
    /// Last date of price history
    pub end: NaiveDate,
    /// Event date, the estimation period ends the day before
    pub event: NaiveDate,
    /// Report field delimiter
    pub delimiter: char,
    /// Cumulative abnormal return aggregation in the report
    pub car_method: CarMethod,
}

impl Default for EventStudyConfig {
    fn default() -> Self {
        let ymd = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN);
        Self {
            ticker: "TCS".into(),
            benchmark: "MOEX".into(),
            risk_free_rate: 0.045,
            window: 50,
            period: 50,
            start: ymd(2019, 1, 1),
            end: ymd(2020, 10, 4),
            event: ymd(2020, 3, 6),
            delimiter: ',',
            car_method: CarMethod::Pairwise,
        }
    }
}

impl EventStudyConfig {
    /// Checks the configuration, see also [`CapmConfig::validate`]
    pub fn validate(&self) -> Result<()> {
        if self.ticker.trim().is_empty() || self.benchmark.trim().is_empty() {
            return Err(Error::InvalidConfig("ticker and benchmark are required".into()));
        }
        if !(self.start < self.event && self.event <= self.end) {
            return Err(Error::InvalidConfig(format!(
                "event {} must fall after start {} and no later than end {}",
                self.event, self.start, self.end
            )));
        }
        self.delimiter_byte()?;
        self.capm()?.validate()
    }

    /// Returns the last day of the estimation period, the day before the event
    pub fn estimation_end(&self) -> Result<NaiveDate> {
        self.event
            .pred_opt()
            .ok_or_else(|| Error::InvalidConfig(format!("no day precedes event {}", self.event)))
    }

    /// Returns the estimation parameters
    pub fn capm(&self) -> Result<CapmConfig> {
        Ok(CapmConfig {
            window: self.window,
            period: self.period,
            risk_free_rate: self.risk_free_rate,
            start: self.start,
            end: self.estimation_end()?,
        })
    }

    /// Returns the delimiter as a single byte, it must be ASCII
    pub fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                Error::InvalidConfig(format!("delimiter {:?} is not ASCII", self.delimiter))
            })
    }
}
