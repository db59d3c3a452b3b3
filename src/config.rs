//! Forecaster and backtesting configuration
//!
//! Both configurations are plain serde structs that can be loaded from and
//! saved to JSON:
//!
//! ```json
//! {
//!   "lags": [1, 2, 24],
//!   "transformer_series": { "Single": "MinMax" },
//!   "transformer_exog": null,
//!   "drop_nan": false
//! }
//! ```

use crate::error::Result;
use crate::forecaster::{ForecasterMultiSeries, LagsSpec, TransformerSeries};
use crate::model_selection::Metric;
use crate::preprocessing::ColumnTransformer;
use crate::regressor::Regressor;
use crate::utils::DateInput;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings of a [`ForecasterMultiSeries`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecasterConfig {
    /// Lags used as predictors
    pub lags: LagsSpec,

    /// Scaling applied to each series before building the training matrices
    pub transformer_series: TransformerSeries,

    /// Transformation applied to the exogenous variables
    pub transformer_exog: Option<ColumnTransformer>,

    /// Drop training rows with NaN predictors instead of keeping them
    pub drop_nan: bool,
}

impl Default for ForecasterConfig {
    fn default() -> Self {
        Self {
            lags: LagsSpec::Count(1),
            transformer_series: TransformerSeries::default(),
            transformer_exog: None,
            drop_nan: false,
        }
    }
}

impl ForecasterConfig {
    pub fn new(lags: impl Into<LagsSpec>) -> Self {
        Self {
            lags: lags.into(),
            ..Self::default()
        }
    }

    pub fn with_transformer_series(mut self, transformer_series: TransformerSeries) -> Self {
        self.transformer_series = transformer_series;
        self
    }

    pub fn with_transformer_exog(mut self, transformer_exog: ColumnTransformer) -> Self {
        self.transformer_exog = Some(transformer_exog);
        self
    }

    pub fn with_drop_nan(mut self, drop_nan: bool) -> Self {
        self.drop_nan = drop_nan;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save the configuration to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

impl<R: Regressor> ForecasterMultiSeries<R> {
    /// Build an unfitted forecaster from a configuration
    pub fn from_config(regressor: R, config: &ForecasterConfig) -> Result<Self> {
        let mut forecaster = ForecasterMultiSeries::new(regressor, config.lags.clone())?
            .with_transformer_series(config.transformer_series.clone())
            .with_drop_nan(config.drop_nan);
        if let Some(transformer_exog) = &config.transformer_exog {
            forecaster = forecaster.with_transformer_exog(transformer_exog.unfitted());
        }
        Ok(forecaster)
    }
}

/// Settings of [`backtesting_forecaster_multiseries`](crate::model_selection::backtesting_forecaster_multiseries)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Observations used for the first training, as a count or as the last
    /// training date (inclusive)
    pub initial_train_size: DateInput,

    /// Observations predicted in each fold
    pub steps: usize,

    pub metric: Metric,

    /// Re-train the forecaster before every fold
    pub refit: bool,

    /// With `refit`, train on a window of constant size that slides forward
    /// instead of an expanding one
    pub fixed_train_size: bool,

    /// Series to evaluate; all series when `None`
    pub levels: Option<Vec<String>>,

    /// Keep a last fold shorter than `steps`
    pub allow_incomplete_fold: bool,

    /// Log the fold partitions
    pub verbose: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_train_size: DateInput::Position(1),
            steps: 1,
            metric: Metric::MeanSquaredError,
            refit: false,
            fixed_train_size: false,
            levels: None,
            allow_incomplete_fold: true,
            verbose: false,
        }
    }
}

impl BacktestConfig {
    pub fn new(initial_train_size: impl Into<DateInput>, steps: usize) -> Self {
        Self {
            initial_train_size: initial_train_size.into(),
            steps,
            ..Self::default()
        }
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_refit(mut self, refit: bool) -> Self {
        self.refit = refit;
        self
    }

    pub fn with_fixed_train_size(mut self, fixed_train_size: bool) -> Self {
        self.fixed_train_size = fixed_train_size;
        self
    }

    pub fn with_levels(mut self, levels: &[&str]) -> Self {
        self.levels = Some(levels.iter().map(|l| l.to_string()).collect());
        self
    }

    pub fn with_allow_incomplete_fold(mut self, allow: bool) -> Self {
        self.allow_incomplete_fold = allow;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
