#![doc = include_str!("../README.md")]
#![deny(
    unsafe_code,
    unused_imports,
    unused_variables,
    unused_must_use,
    missing_docs,
    clippy::all,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented
)]

pub(crate) type Kbn<T> = compensated_summation::KahanBabuskaNeumaier<T>;

mod utils;
pub(crate) use utils::RingBuffer;
pub use utils::helper;

mod error;
pub use error::{Error, Result};

mod moments;
pub use moments::Moments;

mod paired_moments;
pub use paired_moments::PairedMoments;

mod price;
pub use price::{PricePoint, PriceSeries};

mod returns;
pub use returns::{ReturnPoint, ReturnSeries, compute_returns};

mod rolling;
pub use rolling::{MovingPoint, RollingCovariance, RollingStatistics};

mod config;
pub use config::{CapmConfig, CarMethod, EventStudyConfig};

mod capm;
pub use capm::Capm;

mod event_study;
pub use event_study::{EventStudy, EventStudyRow, pairwise_cumulative, run, running_cumulative};

pub mod report;
