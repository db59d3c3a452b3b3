//! Regression estimator contract
//!
//! Forecasters build the feature matrix and hand it to a [`Regressor`]. Any
//! estimator with `fit`/`predict` over `ndarray` matrices can be plugged in;
//! [`LinearRegression`] and [`KNeighborsRegressor`] are provided as
//! reference implementations.

mod knn;
mod linear;

pub use knn::{DistanceMetric, KNeighborsRegressor, WeightScheme};
pub use linear::LinearRegression;

use crate::error::{ForecastError, Result};
use ndarray::{Array1, Array2};

/// A regression estimator usable by the forecasters.
///
/// Direct forecasters clone the estimator once per step and fit the clones in
/// parallel, hence `Clone + Send + Sync`.
pub trait Regressor: Clone + Send + Sync {
    /// Estimator name used in messages
    fn name(&self) -> &str;

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Whether `fit_weighted` honours per-row weights
    fn accepts_sample_weight(&self) -> bool {
        false
    }

    /// Fit with per-row weights. Estimators that do not support weights
    /// return an error.
    fn fit_weighted(
        &mut self,
        _x: &Array2<f64>,
        _y: &Array1<f64>,
        _sample_weight: &Array1<f64>,
    ) -> Result<()> {
        Err(ForecastError::Regressor(format!(
            "{} does not accept `sample_weight` in its `fit` method.",
            self.name()
        )))
    }
}

pub(crate) fn check_fit_input(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(ForecastError::Shape {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(ForecastError::value_error(
            "Cannot fit a regressor on an empty training matrix.",
        ));
    }
    Ok(())
}
