//! Abnormal and cumulative abnormal returns around an event.

use chrono::NaiveDate;
use log::{info, warn};

use crate::{
    Capm, CarMethod, EventStudyConfig, Kbn, MovingPoint, PriceSeries, Result, ReturnPoint,
    ReturnSeries,
};

/// Abnormal returns of an instrument against a fitted [`Capm`]
#[derive(Debug, Clone)]
pub struct EventStudy {
    capm: Capm,
    abnormal: ReturnSeries,
    cumulative: Vec<MovingPoint>,
}

/// One dated row of an event study, as written to a report
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventStudyRow {
    /// Date of the row
    pub date: NaiveDate,
    /// Realised instrument return
    pub actual: f64,
    /// Fitted or forecast instrument return
    pub forecast: f64,
    /// Benchmark return
    pub benchmark: f64,
    /// `actual - forecast`
    pub abnormal: f64,
    /// Cumulative abnormal return
    pub cumulative: f64,
}

impl EventStudy {
    /// Computes abnormal returns over every fitted date
    ///
    /// The abnormal return on each fitted date is the instrument's realised
    /// return on that date minus the fitted one. Inside the estimation period
    /// both are the same realised return, so abnormal returns are zero there.
    pub fn from_capm(capm: Capm) -> Self {
        let actual = capm.actual_returns();
        let abnormal: ReturnSeries = capm
            .fitted_returns()
            .iter()
            .filter_map(|fitted| {
                actual
                    .value_at(fitted.date)
                    .map(|r| ReturnPoint::new(fitted.date, r - fitted.value))
            })
            .collect();
        let cumulative = pairwise_cumulative(&abnormal);
        Self {
            capm,
            abnormal,
            cumulative,
        }
    }

    /// The fitted model
    pub const fn capm(&self) -> &Capm {
        &self.capm
    }

    /// Abnormal returns, one per fitted date
    pub const fn abnormal_returns(&self) -> &ReturnSeries {
        &self.abnormal
    }

    /// Cumulative abnormal returns by the pairwise recurrence, see [`pairwise_cumulative`]
    pub fn cumulative_abnormal_returns(&self) -> &[MovingPoint] {
        &self.cumulative
    }

    /// Cumulative abnormal returns as a running total, see [`running_cumulative`]
    pub fn running_car(&self) -> Vec<MovingPoint> {
        running_cumulative(&self.abnormal)
    }

    /// Cumulative abnormal returns aggregated by `method`
    pub fn cumulative(&self, method: CarMethod) -> Vec<MovingPoint> {
        match method {
            CarMethod::Pairwise => self.cumulative.clone(),
            CarMethod::Running => self.running_car(),
        }
    }

    /// Lines up every series on the fitted dates
    pub fn rows(&self, method: CarMethod) -> Vec<EventStudyRow> {
        let actual = self.capm.actual_returns();
        let fitted = self.capm.fitted_returns();
        let market = self.capm.paired_market_returns();
        self.abnormal
            .iter()
            .zip(self.cumulative(method))
            .zip(fitted.iter().zip(market))
            .filter_map(|((ar, car), (fit, rm))| {
                Some(EventStudyRow {
                    date: ar.date,
                    actual: actual.value_at(ar.date)?,
                    forecast: fit.value,
                    benchmark: rm.value,
                    abnormal: ar.value,
                    cumulative: car.value,
                })
            })
            .collect()
    }
}

/// Sums each abnormal return with the one before it
///
/// `CAR[0] = 0` and `CAR[i] = AR[i-1] + AR[i]`. This is a two-term rolling
/// sum, not a running total from the first date.
pub fn pairwise_cumulative(abnormal: &ReturnSeries) -> Vec<MovingPoint> {
    let points = abnormal.as_slice();
    points
        .iter()
        .enumerate()
        .map(|(i, ar)| {
            let car = match i {
                0 => 0.0,
                _ => points[i - 1].value + ar.value,
            };
            MovingPoint::new(ar.date, car)
        })
        .collect()
}

/// Running total of abnormal returns from the first date, with compensated summation
pub fn running_cumulative(abnormal: &ReturnSeries) -> Vec<MovingPoint> {
    let mut total = Kbn::<f64>::default();
    abnormal
        .iter()
        .map(|ar| {
            total += ar.value;
            MovingPoint::new(ar.date, total.total())
        })
        .collect()
}

/// Runs an event study over two price histories
///
/// Both histories are cut to `[config.start, config.end]`, converted to
/// returns, fitted over the estimation period ending the day before
/// `config.event`, and forecast `config.period` returns from there. Any
/// error aborts the run before a result exists, so nothing partial can be
/// reported.
///
/// A zero close yields a non-finite return, which is logged but not removed.
/// Once such a return enters the rolling statistics their moving averages
/// stay NaN, so a single zero close anywhere in the estimation period turns
/// every beta and forecast after it into NaN. Check
/// [`ReturnSeries::ensure_finite`] on the inputs first to reject such data.
///
/// # Arguments
///
/// * `config` - Event study configuration
/// * `instrument` - Instrument candles
/// * `benchmark` - Benchmark candles
///
/// # Returns
///
/// * `Result<EventStudy>` - The abnormal returns around the event
pub fn run(
    config: &EventStudyConfig,
    instrument: &PriceSeries,
    benchmark: &PriceSeries,
) -> Result<EventStudy> {
    config.validate()?;
    let capm_config = config.capm()?;
    info!(
        "event study of {} against {} around {}",
        config.ticker, config.benchmark, config.event
    );

    let instrument_returns = instrument.between(config.start, config.end).returns();
    let benchmark_returns = benchmark.between(config.start, config.end).returns();
    for (ticker, returns) in [
        (&config.ticker, &instrument_returns),
        (&config.benchmark, &benchmark_returns),
    ] {
        let degenerate = returns.degeneracies();
        if !degenerate.is_empty() {
            warn!(
                "{ticker} has {} non-finite returns, first on {}",
                degenerate.len(),
                degenerate[0]
            );
        }
    }

    let study = Capm::estimate(&instrument_returns, &benchmark_returns, &capm_config)?
        .abnormal_returns();
    info!(
        "{} abnormal returns, {} of them forecast",
        study.abnormal_returns().len(),
        study.capm().forecast_returns().len()
    );
    Ok(study)
}
