//! Delimited-text reports of an event study.

use std::{fs, io, path::Path};

use log::info;

use crate::{CarMethod, EventStudy, EventStudyConfig, Result};

/// Column names of a report, in order
pub const HEADER: [&str; 6] = [
    "Date",
    "ActualReturn",
    "ForecastedReturn",
    "BenchmarkReturn",
    "AbnormalReturn",
    "CumulativeAbnormalReturn",
];

/// How a report is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    /// Field delimiter
    pub delimiter: u8,
    /// Aggregation of the cumulative abnormal return column
    pub car_method: CarMethod,
    /// Digits after the decimal point
    pub precision: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            car_method: CarMethod::default(),
            precision: 6,
        }
    }
}

impl ReportOptions {
    /// Takes the delimiter and aggregation from an event study configuration
    pub fn from_config(config: &EventStudyConfig) -> Result<Self> {
        Ok(Self {
            delimiter: config.delimiter_byte()?,
            car_method: config.car_method,
            ..Self::default()
        })
    }
}

/// Writes one row per fitted date after a [`HEADER`] row
///
/// Dates are written as `YYYY-MM-DD` and returns with
/// [`ReportOptions::precision`] decimals.
///
/// # Arguments
///
/// * `study` - The event study to report
/// * `writer` - Destination of the delimited text
/// * `options` - Delimiter, aggregation and precision
///
/// # Returns
///
/// * `Result<()>` - [`crate::Error::Csv`] or [`crate::Error::Io`] if writing fails
pub fn write_csv<W: io::Write>(study: &EventStudy, writer: W, options: &ReportOptions) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(options.delimiter)
        .from_writer(writer);
    wtr.write_record(HEADER)?;

    let p = options.precision;
    for row in study.rows(options.car_method) {
        wtr.write_record([
            row.date.format("%Y-%m-%d").to_string(),
            format!("{:.*}", p, row.actual),
            format!("{:.*}", p, row.forecast),
            format!("{:.*}", p, row.benchmark),
            format!("{:.*}", p, row.abnormal),
            format!("{:.*}", p, row.cumulative),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes a report to `path`, creating missing parent directories
///
/// The report is rendered in memory first, so a failure never leaves a
/// partial file behind.
pub fn write_csv_file(study: &EventStudy, path: impl AsRef<Path>, options: &ReportOptions) -> Result<()> {
    let path = path.as_ref();
    let mut buf = Vec::new();
    write_csv(study, &mut buf, options)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, &buf)?;
    info!("wrote {} report rows to {}", study.abnormal_returns().len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{Days, NaiveDate};

    use super::*;
    use crate::{Capm, CapmConfig, ReturnPoint, ReturnSeries};

    fn day(i: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 2, 3).unwrap_or(NaiveDate::MIN) + Days::new(i)
    }

    fn study() -> EventStudy {
        let series = |scale: f64, phase: f64| -> ReturnSeries {
            (0..20)
                .map(|i| ReturnPoint::new(day(i), scale * (i as f64 * 0.8 + phase).sin()))
                .collect()
        };
        let config = CapmConfig {
            window: 5,
            period: 4,
            risk_free_rate: 0.0,
            start: day(0),
            end: day(9),
        };
        Capm::estimate(&series(0.02, 0.3), &series(0.01, 0.0), &config)
            .unwrap_or_else(|e| panic!("{e}"))
            .abnormal_returns()
    }

    fn render(options: &ReportOptions) -> String {
        let mut buf = Vec::new();
        write_csv(&study(), &mut buf, options).unwrap_or_else(|e| panic!("{e}"));
        String::from_utf8(buf).unwrap_or_default()
    }

    #[test]
    fn header_then_one_row_per_fitted_date() {
        let text = render(&ReportOptions::default());
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Date,ActualReturn,ForecastedReturn,BenchmarkReturn,AbnormalReturn,CumulativeAbnormalReturn"
        );
        assert_eq!(lines.len(), 1 + 14);
        assert!(lines[1].starts_with("2020-02-03,"));
        assert!(lines[14].starts_with("2020-02-16,"));
    }

    #[test]
    fn numbers_have_six_decimals() {
        let text = render(&ReportOptions::default());
        for line in text.lines().skip(1) {
            for field in line.split(',').skip(1) {
                let decimals = field.split('.').nth(1).map(str::len);
                assert_eq!(decimals, Some(6), "{field}");
            }
        }
        // estimation rows have no abnormal return
        let first: Vec<_> = text.lines().nth(1).unwrap_or_default().split(',').collect();
        assert!(first[4] == "0.000000" || first[4] == "-0.000000");
    }

    #[test]
    fn delimiter_is_configurable() {
        let text = render(&ReportOptions {
            delimiter: b';',
            ..ReportOptions::default()
        });
        assert!(text.lines().all(|l| l.split(';').count() == 6));
        assert!(!text.contains(','));
    }

    #[test]
    fn running_and_pairwise_columns_differ() {
        let pairwise = render(&ReportOptions::default());
        let running = render(&ReportOptions {
            car_method: CarMethod::Running,
            ..ReportOptions::default()
        });
        assert_eq!(pairwise.lines().count(), running.lines().count());
        assert_ne!(pairwise, running);
    }

    #[test]
    fn options_follow_the_config() {
        let config = EventStudyConfig {
            delimiter: '\t',
            car_method: CarMethod::Running,
            ..EventStudyConfig::default()
        };
        let options = ReportOptions::from_config(&config).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(options.delimiter, b'\t');
        assert_eq!(options.car_method, CarMethod::Running);
        assert_eq!(options.precision, 6);
    }
}
