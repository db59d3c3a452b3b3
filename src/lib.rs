//! lagcast - Lag-based forecasting of multiple time series
//!
//! This crate turns collections of time series into supervised-learning
//! matrices and trains regressors on them:
//! - Lagged predictors for one or many series, with exogenous variables
//! - Per-series scaling and exogenous transformations
//! - Recursive and direct multi-step forecasters
//! - Backtesting and cross-validation
//!
//! # Modules
//!
//! ## Data
//! - [`data`] - Columns, frames and time indexes
//! - [`io`] - Loading frames from polars DataFrames and CSV files
//!
//! ## Forecasting
//! - [`forecaster`] - Training matrices and forecasters
//! - [`preprocessing`] - Scalers, one-hot encoding, column transformers
//! - [`regressor`] - The regressor contract and reference estimators
//!
//! ## Evaluation
//! - [`model_selection`] - Fold splitting, metrics and backtesting
//!
//! ## Utilities
//! - [`config`] - Serializable forecaster and backtest settings
//! - [`utils`] - Date resolution and input validation
//!
//! # Example
//!
//! ```no_run
//! use lagcast::prelude::*;
//!
//! # fn main() -> lagcast::Result<()> {
//! let series = load_csv("series.csv", Some("date"))?;
//! let mut forecaster = ForecasterMultiSeries::new(LinearRegression::new(), 24i64)?;
//! forecaster.fit(&series, None)?;
//! let predictions = forecaster.predict(12, None, None, None)?;
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Data
pub mod data;
pub mod io;

// Forecasting
pub mod forecaster;
pub mod preprocessing;
pub mod regressor;

// Evaluation
pub mod model_selection;

// Utilities
pub mod config;
pub mod utils;

pub use error::{ForecastError, ForecastWarning, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{ForecastError, ForecastWarning, Result};

    // Data
    pub use crate::data::{Column, ColumnData, DType, Frame, Frequency, IndexLabel, TimeIndex};
    pub use crate::io::{frame_from_polars, load_csv};

    // Forecasting
    pub use crate::forecaster::{
        ForecasterDirect, ForecasterMultiSeries, ForecasterMultiVariate, LagsSpec,
        TrainingMatrices, TransformerSeries,
    };
    pub use crate::preprocessing::{ColumnTransformer, ScalerType};
    pub use crate::regressor::{KNeighborsRegressor, LinearRegression, Regressor};

    // Evaluation
    pub use crate::model_selection::{
        backtesting_forecaster_multiseries, backtesting_statsmodel, cv_statsmodel, Metric,
        StatsModel,
    };

    // Configuration
    pub use crate::config::{BacktestConfig, ForecasterConfig};
    pub use crate::utils::{date_to_index_position, DateInput, PositionOptions};
}
