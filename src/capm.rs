//! CAPM estimation and recursive forecasting.

use ahash::RandomState;
use chrono::NaiveDate;
use hashbrown::{HashMap, HashSet};
use log::{debug, info};

use crate::{
    CapmConfig, Error, EventStudy, MovingPoint, Result, ReturnPoint, ReturnSeries,
    RollingCovariance, RollingStatistics, helper,
};

/// A single-factor market model fitted over an estimation period and
/// extended past it with forecast returns.
///
/// Construction runs the whole estimation:
///
/// 1. the benchmark is aligned to the instrument's dates,
/// 2. the instrument's returns are restricted to the estimation period,
/// 3. rolling statistics are computed over that period for the instrument,
///    for the benchmark on the same dates, and for the pair,
/// 4. `period` expected returns are forecast, one date at a time, with
///    `re = rf + β · (Rm − rf)`.
///
/// Each forecast is appended to the fitted series and fed back into the
/// rolling statistics, so later forecasts are estimated over windows that
/// contain earlier forecasts rather than realised returns.
#[derive(Debug, Clone)]
pub struct Capm {
    config: CapmConfig,
    /// Instrument returns over the whole history
    actual: ReturnSeries,
    /// Benchmark returns over the whole history
    benchmark: ReturnSeries,
    /// Benchmark returns on instrument dates, in date order
    market: ReturnSeries,
    /// Benchmark return by date, over the same dates as `market`
    lookup: HashMap<NaiveDate, f64, RandomState>,
    /// Estimation period returns followed by forecast returns
    fitted: ReturnSeries,
    /// Benchmark returns on the fitted dates
    paired_market: ReturnSeries,
    instrument_stats: RollingStatistics,
    market_stats: RollingStatistics,
    covariance: RollingCovariance,
    /// Beta used for each forecast
    betas: Vec<MovingPoint>,
    /// Number of fitted returns that belong to the estimation period
    estimation_len: usize,
}

impl Capm {
    /// Fits the model and forecasts `config.period` returns past the estimation period
    ///
    /// # Arguments
    ///
    /// * `instrument` - Instrument returns over the whole history
    /// * `benchmark` - Benchmark returns over the whole history
    /// * `config` - Window, forecast period, risk-free rate and estimation period
    ///
    /// # Returns
    ///
    /// * `Result<Self>` - The fitted model, or
    ///   - [`Error::Alignment`] if fewer than `window` dates are shared by both series,
    ///   - [`Error::InsufficientData`] if the estimation period holds fewer than `window` returns,
    ///   - [`Error::IndexOutOfRange`] if fewer than `period` shared dates follow the estimation period,
    ///   - [`Error::DivideByZero`] if the benchmark's moving variance is zero when beta is needed
    pub fn estimate(
        instrument: &ReturnSeries,
        benchmark: &ReturnSeries,
        config: &CapmConfig,
    ) -> Result<Self> {
        config.validate()?;

        let mut actual = instrument.clone();
        let mut benchmark = benchmark.clone();
        actual.ensure_sorted();
        benchmark.ensure_sorted();

        let (market, lookup) = align(&actual, &benchmark);
        if market.is_empty() {
            return Err(Error::alignment(
                "instrument and benchmark share no dates",
            ));
        }
        if market.len() < config.window {
            return Err(Error::alignment(format!(
                "{} shared dates, the window needs {}",
                market.len(),
                config.window
            )));
        }

        let mut fitted = ReturnSeries::new();
        let mut paired_market = ReturnSeries::new();
        for point in actual
            .iter()
            .filter(|p| config.start <= p.date && p.date <= config.end)
        {
            if let Some(&rm) = lookup.get(&point.date) {
                fitted.push(*point)?;
                paired_market.push(ReturnPoint::new(point.date, rm))?;
            }
        }
        if fitted.len() < config.window {
            return Err(Error::InsufficientData {
                required: config.window,
                available: fitted.len(),
            });
        }

        let instrument_stats = RollingStatistics::compute(&fitted, config.window)?;
        let market_stats = RollingStatistics::compute(&paired_market, config.window)?;
        let covariance = RollingCovariance::compute(&fitted, &paired_market, config.window)?;
        info!(
            "estimated over {} returns from {} to {} with a window of {}",
            fitted.len(),
            config.start,
            config.end,
            config.window
        );

        let estimation_len = fitted.len();
        let mut capm = Self {
            config: config.clone(),
            actual,
            benchmark,
            market,
            lookup,
            fitted,
            paired_market,
            instrument_stats,
            market_stats,
            covariance,
            betas: Vec::with_capacity(config.period),
            estimation_len,
        };
        capm.log_drift();
        capm.forecast()?;
        Ok(capm)
    }

    fn forecast(&mut self) -> Result<()> {
        let last = self
            .fitted
            .last()
            .map(|p| p.date)
            .ok_or(Error::InsufficientData {
                required: 1,
                available: 0,
            })?;
        let cursor = self
            .market
            .position(last)
            .map(|i| i + 1)
            .ok_or_else(|| Error::alignment(format!("{last} is missing from the market series")))?;
        let end = cursor + self.config.period;
        if end > self.market.len() {
            return Err(Error::IndexOutOfRange {
                index: end - 1,
                len: self.market.len(),
            });
        }

        let rf = self.config.risk_free_rate;
        for idx in cursor..end {
            let rm = self.market.as_slice()[idx];
            let beta = self.beta()?;
            let forecast = ReturnPoint::new(rm.date, rf + beta * (rm.value - rf));

            self.betas.push(MovingPoint::new(rm.date, beta));
            self.fitted.push(forecast)?;
            self.paired_market.push(rm)?;
            self.instrument_stats.append(forecast)?;
            self.market_stats.append(rm)?;
            self.covariance.append(forecast, rm)?;
        }
        debug!(
            "forecast {} returns from {} through {}",
            self.config.period,
            self.market.as_slice()[cursor].date,
            self.market.as_slice()[end - 1].date
        );
        Ok(())
    }

    fn log_drift(&self) {
        let samples = self.market_stats.window_samples();
        let direct = helper::population_variance(&samples);
        if let Some((direct, streaming)) = direct.zip(self.market_stats.last_variance()) {
            debug!(
                "market variance drift at {}: {:e}",
                streaming.date,
                (streaming.value - direct).abs()
            );
        }
    }

    /// Returns the latest beta, `Cov(instrument, market) / Var(market)`
    ///
    /// The market's moving variance counts as zero when the returns in the
    /// window are all equal, or when it is within rounding of zero relative
    /// to the moving squared average. The recurrence leaves a residue of a
    /// few ulps in a window that went flat after earlier moves.
    ///
    /// # Returns
    ///
    /// * `Result<f64>` - The beta, or [`Error::DivideByZero`] if the market's
    ///   moving variance is zero
    pub fn beta(&self) -> Result<f64> {
        let (Some(cov), Some(var), Some(mas)) = (
            self.covariance.last_covariance(),
            self.market_stats.last_variance(),
            self.market_stats.last_squared_average(),
        ) else {
            return Err(Error::InsufficientData {
                required: 1,
                available: 0,
            });
        };
        let n = self.market_stats.effective_window() as f64;
        if self.market_stats.is_flat() || var.value <= f64::EPSILON * mas.value * n {
            return Err(Error::DivideByZero { date: var.date });
        }
        Ok(cov.value / var.value)
    }

    /// Computes abnormal returns against the fitted series
    pub fn abnormal_returns(self) -> EventStudy {
        EventStudy::from_capm(self)
    }

    /// Estimation parameters
    pub const fn config(&self) -> &CapmConfig {
        &self.config
    }

    /// Instrument returns over the whole history
    pub const fn actual_returns(&self) -> &ReturnSeries {
        &self.actual
    }

    /// Benchmark returns over the whole history
    pub const fn benchmark_returns(&self) -> &ReturnSeries {
        &self.benchmark
    }

    /// Benchmark returns on instrument dates
    pub const fn market_returns(&self) -> &ReturnSeries {
        &self.market
    }

    /// Returns the benchmark return on `date`, if both series have that date
    pub fn benchmark_return(&self, date: NaiveDate) -> Option<f64> {
        self.lookup.get(&date).copied()
    }

    /// Estimation period returns followed by forecast returns
    pub const fn fitted_returns(&self) -> &ReturnSeries {
        &self.fitted
    }

    /// Benchmark returns on the fitted dates, index-aligned with [`Capm::fitted_returns`]
    pub const fn paired_market_returns(&self) -> &ReturnSeries {
        &self.paired_market
    }

    /// The forecast part of the fitted returns
    pub fn forecast_returns(&self) -> &[ReturnPoint] {
        &self.fitted.as_slice()[self.estimation_len..]
    }

    /// Number of fitted returns that belong to the estimation period
    pub const fn estimation_len(&self) -> usize {
        self.estimation_len
    }

    /// Rolling statistics of the fitted instrument returns
    pub const fn instrument_statistics(&self) -> &RollingStatistics {
        &self.instrument_stats
    }

    /// Rolling statistics of the paired market returns
    pub const fn market_statistics(&self) -> &RollingStatistics {
        &self.market_stats
    }

    /// Rolling covariance of the fitted instrument returns and the paired market returns
    pub const fn covariance(&self) -> &RollingCovariance {
        &self.covariance
    }

    /// The beta behind each forecast, dated like the forecast
    pub fn betas(&self) -> &[MovingPoint] {
        &self.betas
    }
}

/// Keeps the benchmark returns whose date the instrument also has
fn align(
    instrument: &ReturnSeries,
    benchmark: &ReturnSeries,
) -> (ReturnSeries, HashMap<NaiveDate, f64, RandomState>) {
    let mut dates = HashSet::with_hasher(RandomState::new());
    dates.extend(instrument.iter().map(|p| p.date));

    let market: ReturnSeries = benchmark
        .iter()
        .filter(|p| dates.contains(&p.date))
        .copied()
        .collect();
    let mut lookup = HashMap::with_capacity_and_hasher(market.len(), RandomState::new());
    lookup.extend(market.iter().map(|p| (p.date, p.value)));
    (market, lookup)
}
