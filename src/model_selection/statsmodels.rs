//! Backtesting and cross-validation of statistical models
//!
//! Statistical models (ARIMA-like models, exponential smoothing, ...) are
//! driven through the [`StatsModel`] trait. The caller supplies a fit
//! closure that builds a model with its order settings from a training
//! window, so the evaluation loops stay independent of any concrete model.
//! [`AutoReg`] is a small autoregressive reference model.

use super::metrics::Metric;
use super::splitter::{log_folds, time_series_splitter, Fold};
use crate::error::{ForecastError, Result};
use crate::forecaster::{create_lag_matrix, Lags, LagsSpec};
use crate::regressor::{LinearRegression, Regressor};
use ndarray::{concatenate, s, Array1, Array2, ArrayView2, Axis};
use tracing::debug;

/// A fitted statistical model that can forecast and absorb new observations
pub trait StatsModel: Sized {
    /// Forecast the `steps` values that follow the data seen so far.
    /// `exog` holds one row per step when the model uses exogenous regressors.
    fn forecast(&self, steps: usize, exog: Option<ArrayView2<'_, f64>>) -> Result<Vec<f64>>;

    /// Append observations to the model's data without re-estimating its
    /// parameters.
    fn extend(self, endog: &[f64], exog: Option<ArrayView2<'_, f64>>) -> Result<Self>;
}

fn check_exog_rows(y: &[f64], exog: Option<&Array2<f64>>) -> Result<()> {
    match exog {
        Some(exog) if exog.nrows() != y.len() => Err(ForecastError::value_error(format!(
            "`exog` must have the same number of samples as `y`. Got {} and {}.",
            exog.nrows(),
            y.len()
        ))),
        _ => Ok(()),
    }
}

fn exog_rows<'a>(
    exog: Option<&'a Array2<f64>>,
    rows: std::ops::Range<usize>,
) -> Option<ArrayView2<'a, f64>> {
    exog.map(|e| e.slice(s![rows, ..]))
}

/// Backtest a statistical model without refitting.
///
/// The model is fitted once with the first `initial_train_size`
/// observations. Each fold forecasts the next `steps` observations; before
/// the next fold the model is extended with the observations it just
/// forecast. The last fold only covers the remaining observations.
///
/// Returns the metric over all backtested observations and the
/// concatenated predictions.
pub fn backtesting_statsmodel<M, F>(
    y: &[f64],
    initial_train_size: usize,
    steps: usize,
    metric: Metric,
    exog: Option<&Array2<f64>>,
    fit_model: F,
    verbose: bool,
) -> Result<(f64, Vec<f64>)>
where
    M: StatsModel,
    F: Fn(&[f64], Option<ArrayView2<'_, f64>>) -> Result<M>,
{
    check_exog_rows(y, exog)?;
    let folds = time_series_splitter(y.len(), initial_train_size, steps, true)?;
    if verbose {
        log_folds(&folds, y.len(), initial_train_size, steps);
    }

    let mut model = fit_model(
        &y[..initial_train_size],
        exog_rows(exog, 0..initial_train_size),
    )?;
    let mut predictions = Vec::with_capacity(y.len() - initial_train_size);
    let mut previous: Option<&Fold> = None;
    for fold in &folds {
        if let Some(prev) = previous {
            model = model.extend(&y[prev.test.clone()], exog_rows(exog, prev.test.clone()))?;
        }
        let pred = model.forecast(fold.test_size(), exog_rows(exog, fold.test.clone()))?;
        debug!(fold_start = fold.test.start, n_pred = pred.len(), "fold forecast");
        predictions.extend(pred);
        previous = Some(fold);
    }

    let y_true = &y[initial_train_size..initial_train_size + predictions.len()];
    let value = metric.compute(y_true, &predictions)?;
    Ok((value, predictions))
}

/// Cross-validate a statistical model, refitting it on every expanding
/// training window.
///
/// Returns the metric of each fold and the concatenated predictions.
#[allow(clippy::too_many_arguments)]
pub fn cv_statsmodel<M, F>(
    y: &[f64],
    initial_train_size: usize,
    steps: usize,
    metric: Metric,
    exog: Option<&Array2<f64>>,
    fit_model: F,
    allow_incomplete_fold: bool,
    verbose: bool,
) -> Result<(Vec<f64>, Vec<f64>)>
where
    M: StatsModel,
    F: Fn(&[f64], Option<ArrayView2<'_, f64>>) -> Result<M>,
{
    check_exog_rows(y, exog)?;
    let folds = time_series_splitter(y.len(), initial_train_size, steps, allow_incomplete_fold)?;
    if verbose {
        log_folds(&folds, y.len(), initial_train_size, steps);
    }

    let mut metrics = Vec::with_capacity(folds.len());
    let mut predictions = Vec::new();
    for fold in &folds {
        let model = fit_model(&y[fold.train.clone()], exog_rows(exog, fold.train.clone()))?;
        let pred = model.forecast(fold.test_size(), exog_rows(exog, fold.test.clone()))?;
        metrics.push(metric.compute(&y[fold.test.clone()], &pred)?);
        predictions.extend(pred);
    }
    Ok((metrics, predictions))
}

/// Autoregressive model with constant, `y_t = c + sum(a_k * y_{t-k}) + b * x_t`,
/// estimated by least squares.
#[derive(Debug, Clone)]
pub struct AutoReg {
    lags: Lags,
    model: LinearRegression,
    history: Vec<f64>,
    n_exog: Option<usize>,
}

impl AutoReg {
    /// Estimate the model on `endog`, optionally with exogenous regressors
    /// aligned row by row with `endog`.
    pub fn fit(
        endog: &[f64],
        lags: impl Into<LagsSpec>,
        exog: Option<ArrayView2<'_, f64>>,
    ) -> Result<Self> {
        let lags = Lags::new(lags)?;
        let (x_lags, y) = create_lag_matrix("endog", endog, &lags)?;
        let x = match exog {
            Some(exog) => {
                if exog.nrows() != endog.len() {
                    return Err(ForecastError::value_error(format!(
                        "`exog` must have the same number of samples as `endog`. Got {} and {}.",
                        exog.nrows(),
                        endog.len()
                    )));
                }
                concatenate(Axis(1), &[x_lags.view(), exog.slice(s![lags.max_lag().., ..])])?
            }
            None => x_lags,
        };

        let mut model = LinearRegression::new();
        model.fit(&x, &y)?;
        Ok(Self {
            lags,
            model,
            history: endog.to_vec(),
            n_exog: exog.map(|e| e.ncols()),
        })
    }

    pub fn lags(&self) -> &[usize] {
        self.lags.as_slice()
    }

    /// Number of observations the model has seen
    pub fn nobs(&self) -> usize {
        self.history.len()
    }

    fn check_exog(&self, rows: usize, exog: Option<&ArrayView2<'_, f64>>) -> Result<()> {
        match (self.n_exog, exog) {
            (None, None) => Ok(()),
            (Some(n), Some(e)) if e.ncols() == n && e.nrows() >= rows => Ok(()),
            (Some(n), Some(e)) => Err(ForecastError::Shape {
                expected: format!("at least {} rows and {} columns in `exog`", rows, n),
                actual: format!("{} rows and {} columns", e.nrows(), e.ncols()),
            }),
            (Some(_), None) => Err(ForecastError::value_error(
                "Model fitted with exogenous regressors, `exog` must be provided.",
            )),
            (None, Some(_)) => Err(ForecastError::value_error(
                "Model fitted without exogenous regressors, `exog` must be `None`.",
            )),
        }
    }
}

impl StatsModel for AutoReg {
    fn forecast(&self, steps: usize, exog: Option<ArrayView2<'_, f64>>) -> Result<Vec<f64>> {
        self.check_exog(steps, exog.as_ref())?;
        let lags = self.lags.as_slice();
        let n_features = lags.len() + self.n_exog.unwrap_or(0);

        let mut extended = self.history.clone();
        for step in 0..steps {
            let mut row = Array1::<f64>::zeros(n_features);
            for (j, lag) in lags.iter().enumerate() {
                row[j] = extended[extended.len() - lag];
            }
            if let Some(exog) = &exog {
                for (j, v) in exog.row(step).iter().enumerate() {
                    row[lags.len() + j] = *v;
                }
            }
            let x = row.insert_axis(Axis(0));
            extended.push(self.model.predict(&x)?[0]);
        }
        Ok(extended.split_off(self.history.len()))
    }

    fn extend(mut self, endog: &[f64], exog: Option<ArrayView2<'_, f64>>) -> Result<Self> {
        self.check_exog(endog.len(), exog.as_ref())?;
        self.history.extend_from_slice(endog);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Forecasts the last observed value
    struct Naive {
        last: f64,
    }

    impl StatsModel for Naive {
        fn forecast(&self, steps: usize, _exog: Option<ArrayView2<'_, f64>>) -> Result<Vec<f64>> {
            Ok(vec![self.last; steps])
        }

        fn extend(self, endog: &[f64], _exog: Option<ArrayView2<'_, f64>>) -> Result<Self> {
            Ok(Naive {
                last: endog.last().copied().unwrap_or(self.last),
            })
        }
    }

    fn fit_naive(y: &[f64], _exog: Option<ArrayView2<'_, f64>>) -> Result<Naive> {
        Ok(Naive { last: y[y.len() - 1] })
    }

    #[test]
    fn test_backtesting_extends_between_folds() {
        let y: Vec<f64> = (0..10).map(|v| v as f64).collect();
        let (mae, preds) =
            backtesting_statsmodel(&y, 5, 2, Metric::MeanAbsoluteError, None, fit_naive, false)
                .unwrap();
        // folds forecast [5,6], [7,8], [9] from last values 4, 6, 8
        assert_eq!(preds, vec![4.0, 4.0, 6.0, 6.0, 8.0]);
        assert!((mae - 1.4).abs() < 1e-12);
    }

    #[test]
    fn test_cv_refits_each_fold() {
        let y: Vec<f64> = (0..10).map(|v| v as f64).collect();
        let (metrics, preds) = cv_statsmodel(
            &y,
            6,
            2,
            Metric::MeanAbsoluteError,
            None,
            fit_naive,
            true,
            false,
        )
        .unwrap();
        assert_eq!(preds, vec![5.0, 5.0, 7.0, 7.0]);
        assert_eq!(metrics, vec![1.5, 1.5]);
    }

    #[test]
    fn test_autoreg_recovers_ar1() {
        // y_t = 1 + 0.5 * y_{t-1}
        let mut y = vec![10.0];
        for _ in 0..30 {
            let last = y[y.len() - 1];
            y.push(1.0 + 0.5 * last);
        }
        let model = AutoReg::fit(&y[..20], 1i64, None).unwrap();
        let forecast = model.forecast(3, None).unwrap();
        for (p, t) in forecast.iter().zip(&y[20..23]) {
            assert!((p - t).abs() < 1e-6);
        }

        let model = model.extend(&y[20..25], None).unwrap();
        assert_eq!(model.nobs(), 25);
        let forecast = model.forecast(1, None).unwrap();
        assert!((forecast[0] - y[25]).abs() < 1e-6);
    }

    #[test]
    fn test_autoreg_exog_required() {
        let y: Vec<f64> = (0..20).map(|v| (v as f64).sin()).collect();
        let exog = Array2::from_shape_fn((20, 1), |(i, _)| i as f64);
        let model = AutoReg::fit(&y, 2i64, Some(exog.view())).unwrap();
        assert!(model.forecast(2, None).is_err());
        let future = Array2::from_shape_fn((2, 1), |(i, _)| (20 + i) as f64);
        assert_eq!(model.forecast(2, Some(future.view())).unwrap().len(), 2);
    }

    #[test]
    fn test_exog_length_mismatch() {
        let y = vec![1.0; 10];
        let exog = Array2::<f64>::zeros((9, 1));
        let err = backtesting_statsmodel(
            &y,
            5,
            2,
            Metric::MeanSquaredError,
            Some(&exog),
            fit_naive,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, ForecastError::ValueError(_)));
    }
}
