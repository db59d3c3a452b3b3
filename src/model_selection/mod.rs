//! Model selection
//!
//! Fold generation, error metrics and backtesting for both lag-based
//! forecasters and statistical models.

mod backtesting;
mod metrics;
mod splitter;
mod statsmodels;

pub use backtesting::{backtesting_forecaster_multiseries, BacktestResult};
pub use metrics::Metric;
pub use splitter::{time_series_splitter, Fold};
pub use statsmodels::{backtesting_statsmodel, cv_statsmodel, AutoReg, StatsModel};
