//! Error metrics for backtesting

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Regression error metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    MeanSquaredError,
    MeanAbsoluteError,
    MeanAbsolutePercentageError,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::MeanSquaredError => "mean_squared_error",
            Metric::MeanAbsoluteError => "mean_absolute_error",
            Metric::MeanAbsolutePercentageError => "mean_absolute_percentage_error",
        }
    }

    /// Evaluate the metric. Pairs where either value is NaN are skipped.
    pub fn compute(&self, y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
        if y_true.len() != y_pred.len() {
            return Err(ForecastError::Shape {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }
        let pairs: Vec<(f64, f64)> = y_true
            .iter()
            .zip(y_pred)
            .filter(|(t, p)| !t.is_nan() && !p.is_nan())
            .map(|(t, p)| (*t, *p))
            .collect();
        if pairs.is_empty() {
            return Err(ForecastError::value_error(
                "Cannot compute a metric without observed values.",
            ));
        }

        let n = pairs.len() as f64;
        let total: f64 = match self {
            Metric::MeanSquaredError => pairs.iter().map(|(t, p)| (t - p).powi(2)).sum(),
            Metric::MeanAbsoluteError => pairs.iter().map(|(t, p)| (t - p).abs()).sum(),
            Metric::MeanAbsolutePercentageError => pairs
                .iter()
                .map(|(t, p)| (t - p).abs() / t.abs().max(f64::EPSILON))
                .sum(),
        };
        Ok(total / n)
    }
}

impl FromStr for Metric {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mean_squared_error" => Ok(Metric::MeanSquaredError),
            "mean_absolute_error" => Ok(Metric::MeanAbsoluteError),
            "mean_absolute_percentage_error" => Ok(Metric::MeanAbsolutePercentageError),
            other => Err(ForecastError::value_error(format!(
                "Allowed metrics are: 'mean_squared_error', 'mean_absolute_error' and \
                 'mean_absolute_percentage_error'. Got {}.",
                other
            ))),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
