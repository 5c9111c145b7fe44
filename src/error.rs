//! Error types for the estimation pipeline.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type for the estimation pipeline.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors raised while building series, estimating the model or writing a report.
///
/// Every kind aborts the pipeline except [`Error::ArithmeticDegeneracy`],
/// which only flags a non-finite return; see [`Error::is_fatal`].
#[derive(Debug, Error)]
pub enum Error {
    /// Instrument and benchmark can not be lined up by date
    #[error("alignment error: {reason}")]
    Alignment {
        /// What was misaligned
        reason: String,
    },

    /// Not enough points for the requested window or period
    #[error("insufficient data: {required} points required, {available} available")]
    InsufficientData {
        /// Points the computation needs
        required: usize,
        /// Points actually available
        available: usize,
    },

    /// Beta requested while the market moving variance is exactly zero
    #[error("moving variance is zero at {date}, beta is undefined")]
    DivideByZero {
        /// Date of the zero variance
        date: NaiveDate,
    },

    /// The forecast would read past the end of the aligned series
    #[error("index {index} is out of range for an aligned series of length {len}")]
    IndexOutOfRange {
        /// Last index the forecast needs
        index: usize,
        /// Length of the aligned series
        len: usize,
    },

    /// A return was computed against a zero prior close
    #[error("degenerate return on {date}: prior close is zero")]
    ArithmeticDegeneracy {
        /// Date of the non-finite return
        date: NaiveDate,
    },

    /// Configuration values out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// CSV reading or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn alignment(reason: impl Into<String>) -> Self {
        Self::Alignment {
            reason: reason.into(),
        }
    }

    /// Returns false for the kinds that are surfaced without aborting the pipeline
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::ArithmeticDegeneracy { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_degeneracy_is_recoverable() {
        let date = NaiveDate::from_ymd_opt(2020, 3, 6).unwrap_or(NaiveDate::MIN);
        assert!(!Error::ArithmeticDegeneracy { date }.is_fatal());
        assert!(Error::DivideByZero { date }.is_fatal());
        assert!(Error::alignment("no overlapping dates").is_fatal());
        assert!(Error::IndexOutOfRange { index: 10, len: 5 }.is_fatal());
    }

    #[test]
    fn messages_name_the_problem() {
        let err = Error::InsufficientData {
            required: 50,
            available: 12,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data: 50 points required, 12 available"
        );
    }
}
