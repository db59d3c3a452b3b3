//! Direct multi-step forecasters
//!
//! One regressor is trained per forecast horizon. Step `k` is predicted by
//! model `k` from the same lag features plus the exogenous values at horizon
//! `k`, so there is no recursion and no error feedback between steps.

use super::lags::{Lags, LagsSpec};
use super::multiseries::TransformerSeries;
use crate::data::{Column, Frame, TimeIndex};
use crate::error::{ForecastError, ForecastWarning, Result};
use crate::preprocessing::{ColumnTransformer, Scaler, ScalerType};
use crate::regressor::Regressor;
use crate::utils::{check_exog, check_exog_alignment, check_same_names, check_series};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Maps the training index to one weight per training row
pub type WeightFunc = Arc<dyn Fn(&TimeIndex) -> Vec<f64> + Send + Sync>;

/// Output of `ForecasterMultiVariate::create_train_x_y`
#[derive(Debug, Clone)]
pub struct DirectTrainingMatrices {
    /// Lag columns of every series, then the exogenous columns of every step
    pub x_train: Frame,
    /// One target column per step, `{level}_step_{k}`
    pub y_train: Frame,
    /// Label of the last target of each row
    pub train_index: TimeIndex,
    pub series_col_names: Vec<String>,
    pub exog_col_names: Option<Vec<String>>,
    /// Warnings raised while building the matrices
    pub warnings: Vec<ForecastWarning>,
    n_lag_columns: usize,
}

#[derive(Clone)]
struct DirectState<R> {
    regressors: Vec<R>,
    series_col_names: Vec<String>,
    exog_col_names: Option<Vec<String>>,
    x_train_col_names: Vec<String>,
    scalers: HashMap<String, Scaler>,
    transformer_exog: Option<ColumnTransformer>,
    last_window: Frame,
}

/// Direct forecaster of one `level` series using the lags of several series
#[derive(Clone)]
pub struct ForecasterMultiVariate<R: Regressor> {
    regressor: R,
    level: String,
    lags: Lags,
    steps: usize,
    transformer_series: TransformerSeries,
    transformer_exog: Option<ColumnTransformer>,
    weight_func: Option<WeightFunc>,
    state: Option<DirectState<R>>,
    warnings: Vec<ForecastWarning>,
}

impl<R: Regressor + fmt::Debug> fmt::Debug for ForecasterMultiVariate<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForecasterMultiVariate")
            .field("regressor", &self.regressor)
            .field("level", &self.level)
            .field("lags", &self.lags.as_slice())
            .field("steps", &self.steps)
            .field("transformer_series", &self.transformer_series)
            .field("weight_func", &self.weight_func.is_some())
            .field("fitted", &self.state.is_some())
            .finish()
    }
}

impl<R: Regressor> ForecasterMultiVariate<R> {
    pub fn new(regressor: R, level: &str, lags: impl Into<LagsSpec>, steps: usize) -> Result<Self> {
        if steps < 1 {
            return Err(ForecastError::value_error(format!(
                "`steps` argument must be greater than or equal to 1. Got {}.",
                steps
            )));
        }
        Ok(Self {
            regressor,
            level: level.to_string(),
            lags: Lags::new(lags)?,
            steps,
            transformer_series: TransformerSeries::default(),
            transformer_exog: None,
            weight_func: None,
            state: None,
            warnings: Vec::new(),
        })
    }

    pub fn with_transformer_series(mut self, transformer_series: TransformerSeries) -> Self {
        self.transformer_series = transformer_series;
        self
    }

    pub fn with_transformer_exog(mut self, transformer_exog: ColumnTransformer) -> Self {
        self.transformer_exog = Some(transformer_exog);
        self
    }

    /// Weight training rows by a function of their index. Ignored, with a
    /// warning, when the regressor cannot take sample weights.
    pub fn with_weight_func(mut self, weight_func: WeightFunc) -> Self {
        if self.regressor.accepts_sample_weight() {
            self.weight_func = Some(weight_func);
        } else {
            self.warnings.push(
                ForecastWarning::IgnoredArgument(format!(
                    "Argument `weight_func` is ignored since regressor {} does not accept \
                     `sample_weight` in its `fit` method.",
                    self.regressor.name()
                ))
                .emit(),
            );
            self.weight_func = None;
        }
        self
    }

    pub fn set_lags(&mut self, lags: impl Into<LagsSpec>) -> Result<()> {
        self.lags = Lags::new(lags)?;
        Ok(())
    }

    pub fn lags(&self) -> &[usize] {
        self.lags.as_slice()
    }

    pub fn max_lag(&self) -> usize {
        self.lags.max_lag()
    }

    pub fn level(&self) -> &str {
        &self.level
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn has_weight_func(&self) -> bool {
        self.weight_func.is_some()
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    pub fn warnings(&self) -> &[ForecastWarning] {
        &self.warnings
    }

    pub fn x_train_col_names(&self) -> Option<&[String]> {
        self.state.as_ref().map(|s| s.x_train_col_names.as_slice())
    }

    /// Regressor fitted for `step` (1-based)
    pub fn regressor_for_step(&self, step: usize) -> Option<&R> {
        self.state
            .as_ref()
            .and_then(|s| step.checked_sub(1).and_then(|i| s.regressors.get(i)))
    }

    pub fn create_train_x_y(
        &self,
        series: &Frame,
        exog: Option<&Frame>,
    ) -> Result<DirectTrainingMatrices> {
        self.build_train(series, exog).map(|(m, _, _, _)| m)
    }

    #[allow(clippy::type_complexity)]
    fn build_train(
        &self,
        series: &Frame,
        exog: Option<&Frame>,
    ) -> Result<(
        DirectTrainingMatrices,
        HashMap<String, Scaler>,
        Option<ColumnTransformer>,
        Frame,
    )> {
        check_series(series)?;
        let series_col_names = series.column_names();
        if !series_col_names.contains(&self.level) {
            return Err(ForecastError::value_error(
                "One of the `series` columns must be named as the `level` of the forecaster.",
            ));
        }
        if let Some(state) = &self.state {
            check_same_names("series", &series_col_names, &state.series_col_names)?;
            if let (Some(expected), Some(exog)) = (&state.exog_col_names, exog) {
                check_same_names("exog", &exog.column_names(), expected)?;
            }
        }
        if let Some(exog) = exog {
            check_exog_alignment(series, exog)?;
            check_exog(exog)?;
        }

        let max_lag = self.lags.max_lag();
        let len = series.height();
        if len < max_lag + self.steps {
            return Err(ForecastError::value_error(format!(
                "Minimum length of `series` for training this forecaster is {}. Got {}.",
                max_lag + self.steps,
                len
            )));
        }
        let n_rows = len - max_lag - (self.steps - 1);

        let mut warnings = Vec::new();
        let (series, exog) = if series.index().is_regular() {
            (series.clone(), exog.cloned())
        } else {
            warnings.push(
                ForecastWarning::IndexOverwritten(format!(
                    "`series` has a {} without frequency or of a type that is not \
                     supported. Index is overwritten with a RangeIndex.",
                    series.index().kind()
                ))
                .emit(),
            );
            let range = TimeIndex::range(0, len as i64);
            let exog = exog.map(|e| e.clone().set_index(range.clone())).transpose()?;
            (series.clone().set_index(range)?, exog)
        };

        let mut scalers = HashMap::new();
        let mut transformed = HashMap::new();
        for name in &series_col_names {
            let values = series.values_f64(name)?;
            if values.iter().any(|v| v.is_nan()) {
                return Err(ForecastError::value_error(format!(
                    "Series '{}' has missing values.",
                    name
                )));
            }
            let kind = match &self.transformer_series {
                TransformerSeries::None => None,
                TransformerSeries::Single(kind) => Some(*kind),
                TransformerSeries::PerSeries(map) => map.get(name).copied(),
            };
            let values = match kind {
                Some(kind) => {
                    let mut scaler = Scaler::new(kind);
                    let scaled = scaler.fit_transform(&values)?;
                    scalers.insert(name.clone(), scaler);
                    scaled
                }
                None => values,
            };
            transformed.insert(name.clone(), values);
        }

        let mut x_columns = Vec::new();
        for name in &series_col_names {
            let values = &transformed[name];
            for &k in self.lags.as_slice() {
                let lagged = (0..n_rows).map(|i| values[max_lag + i - k]).collect();
                x_columns.push(Column::float(format!("{}_lag_{}", name, k), lagged));
            }
        }
        let n_lag_columns = x_columns.len();

        let (exog_transformed, transformer_exog) = match (&exog, &self.transformer_exog) {
            (Some(exog), Some(transformer)) => {
                let mut transformer = transformer.unfitted();
                let out = transformer.fit_transform(exog)?;
                (Some(out), Some(transformer))
            }
            (Some(exog), None) => (Some(exog.clone()), None),
            (None, _) => (None, None),
        };
        if let Some(exog) = &exog_transformed {
            for step in 1..=self.steps {
                let positions: Vec<usize> = (0..n_rows).map(|i| max_lag + step - 1 + i).collect();
                for column in exog.take_rows(&positions)?.into_columns() {
                    let name = format!("{}_step_{}", column.name(), step);
                    x_columns.push(column.rename(name));
                }
            }
        }

        let level_values = &transformed[&self.level];
        let y_columns = (1..=self.steps)
            .map(|step| {
                let values = (0..n_rows).map(|i| level_values[max_lag + step - 1 + i]).collect();
                Column::float(format!("{}_step_{}", self.level, step), values)
            })
            .collect();

        let row_index = TimeIndex::range(0, n_rows as i64);
        let last_target: Vec<usize> = (0..n_rows).map(|i| max_lag + self.steps - 1 + i).collect();
        let matrices = DirectTrainingMatrices {
            x_train: Frame::new(row_index.clone(), x_columns)?,
            y_train: Frame::new(row_index, y_columns)?,
            train_index: series.index().take(&last_target)?,
            series_col_names,
            exog_col_names: exog.as_ref().map(Frame::column_names),
            warnings,
            n_lag_columns,
        };
        debug!(
            rows = n_rows,
            columns = matrices.x_train.width(),
            steps = self.steps,
            "Direct training matrices created"
        );
        Ok((matrices, scalers, transformer_exog, series))
    }

    /// Columns used by the model of `step`: all lags plus the exogenous
    /// values at that horizon.
    pub fn filter_train_x_y_for_step(
        &self,
        step: usize,
        matrices: &DirectTrainingMatrices,
    ) -> Result<(Frame, Vec<f64>)> {
        if step < 1 || step > self.steps {
            return Err(ForecastError::value_error(format!(
                "Invalid value `step`. For this forecaster, minimum value is 1 \
                 and the maximum step is {}.",
                self.steps
            )));
        }
        let suffix = format!("_step_{}", step);
        let names: Vec<String> = matrices
            .x_train
            .column_names()
            .into_iter()
            .enumerate()
            .filter(|(j, name)| *j < matrices.n_lag_columns || name.ends_with(&suffix))
            .map(|(_, name)| name)
            .collect();
        let x = matrices.x_train.select(&names)?;
        let y = matrices
            .y_train
            .values_f64(&format!("{}_step_{}", self.level, step))?;
        Ok((x, y))
    }

    /// Fit one regressor per step, in parallel
    pub fn fit(&mut self, series: &Frame, exog: Option<&Frame>) -> Result<&mut Self> {
        self.state = None;
        let (mut matrices, scalers, transformer_exog, series) = self.build_train(series, exog)?;
        // warnings of a previous fit are replaced, construction warnings stay
        self.warnings
            .retain(|w| !matches!(w, ForecastWarning::IndexOverwritten(_)));
        self.warnings.append(&mut matrices.warnings);

        let weights = match &self.weight_func {
            Some(f) => {
                let w = f(&matrices.train_index);
                if w.len() != matrices.train_index.len() {
                    return Err(ForecastError::Shape {
                        expected: format!("{} weights", matrices.train_index.len()),
                        actual: w.len().to_string(),
                    });
                }
                Some(Array1::from_vec(w))
            }
            None => None,
        };

        let regressors = (1..=self.steps)
            .into_par_iter()
            .map(|step| -> Result<R> {
                let (x, y) = self.filter_train_x_y_for_step(step, &matrices)?;
                let x: Array2<f64> = x.to_array()?;
                let y = Array1::from_vec(y);
                let mut regressor = self.regressor.clone();
                match &weights {
                    Some(w) => regressor.fit_weighted(&x, &y, w)?,
                    None => regressor.fit(&x, &y)?,
                }
                Ok(regressor)
            })
            .collect::<Result<Vec<R>>>()?;

        info!(
            regressor = self.regressor.name(),
            level = %self.level,
            steps = self.steps,
            "Direct forecaster fitted"
        );

        let max_lag = self.lags.max_lag();
        let height = series.height();
        self.state = Some(DirectState {
            regressors,
            series_col_names: matrices.series_col_names,
            exog_col_names: matrices.exog_col_names,
            x_train_col_names: matrices.x_train.column_names(),
            scalers,
            transformer_exog,
            last_window: series.slice_rows(height - max_lag, height),
        });
        Ok(self)
    }

    /// Predict the next `steps` values of `level` (all trained steps when
    /// `None`).
    pub fn predict(
        &self,
        steps: Option<usize>,
        last_window: Option<&Frame>,
        exog: Option<&Frame>,
    ) -> Result<Frame> {
        let state = self.state.as_ref().ok_or_else(|| {
            ForecastError::NotFitted("Call `fit` with appropriate arguments before using predict.".to_string())
        })?;
        let steps = steps.unwrap_or(self.steps);
        if steps < 1 || steps > self.steps {
            return Err(ForecastError::value_error(format!(
                "`steps` must be between 1 and the number of steps the forecaster was \
                 trained for ({}). Got {}.",
                self.steps, steps
            )));
        }

        let window = last_window.unwrap_or(&state.last_window);
        let max_lag = self.lags.max_lag();
        if window.height() < max_lag {
            return Err(ForecastError::value_error(format!(
                "`last_window` must have as many values as needed to create the \
                 predictors. For this forecaster it is {}.",
                max_lag
            )));
        }

        let mut lag_features = Vec::new();
        for name in &state.series_col_names {
            let values = window.values_f64(name)?;
            let mut values = values[values.len() - max_lag..].to_vec();
            if let Some(scaler) = state.scalers.get(name) {
                values = scaler.transform(&values)?;
            }
            lag_features.extend(self.lags.as_slice().iter().map(|&k| values[values.len() - k]));
        }

        let exog = match (&state.exog_col_names, exog) {
            (None, None) => None,
            (Some(names), Some(exog)) => {
                check_same_names("exog", &exog.column_names(), names)?;
                if exog.height() < steps {
                    return Err(ForecastError::value_error(format!(
                        "`exog` must have at least as many values as `steps` predicted. \
                         Got {} values for {} steps.",
                        exog.height(),
                        steps
                    )));
                }
                let exog = exog.slice_rows(0, steps).select(names)?;
                let exog = match &state.transformer_exog {
                    Some(transformer) => transformer.transform(&exog)?,
                    None => exog,
                };
                Some(exog.to_array()?)
            }
            (Some(_), None) => {
                return Err(ForecastError::value_error(
                    "Forecaster trained with exogenous variable/s. Same variable/s must be \
                     provided when predicting.",
                ))
            }
            (None, Some(_)) => {
                return Err(ForecastError::value_error(
                    "Forecaster trained without exogenous variable/s. `exog` must be `None` \
                     when predicting.",
                ))
            }
        };

        let mut predictions = Vec::with_capacity(steps);
        for step in 1..=steps {
            let mut row = lag_features.clone();
            if let Some(exog) = &exog {
                row.extend(exog.row(step - 1).iter().copied());
            }
            let x = Array2::from_shape_vec((1, row.len()), row)?;
            let pred = state.regressors[step - 1].predict(&x)?;
            let value = pred.get(0).copied().ok_or_else(|| {
                ForecastError::Regressor("Regressor returned no prediction.".to_string())
            })?;
            predictions.push(value);
        }
        if let Some(scaler) = state.scalers.get(&self.level) {
            predictions = scaler.inverse_transform(&predictions)?;
        }

        Frame::new(
            window.index().extend_future(steps)?,
            vec![Column::float(self.level.clone(), predictions)],
        )
    }
}

/// Direct forecaster of a single series
#[derive(Clone)]
pub struct ForecasterDirect<R: Regressor> {
    inner: ForecasterMultiVariate<R>,
}

impl<R: Regressor + fmt::Debug> fmt::Debug for ForecasterDirect<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForecasterDirect")
            .field("inner", &self.inner)
            .finish()
    }
}

const DIRECT_LEVEL: &str = "y";

impl<R: Regressor> ForecasterDirect<R> {
    /// Untransformed by default; see [`ForecasterDirect::with_transformer_y`]
    pub fn new(regressor: R, lags: impl Into<LagsSpec>, steps: usize) -> Result<Self> {
        let inner = ForecasterMultiVariate::new(regressor, DIRECT_LEVEL, lags, steps)?
            .with_transformer_series(TransformerSeries::None);
        Ok(Self { inner })
    }

    pub fn with_transformer_y(mut self, scaler_type: ScalerType) -> Self {
        self.inner = self
            .inner
            .with_transformer_series(TransformerSeries::Single(scaler_type));
        self
    }

    pub fn with_transformer_exog(mut self, transformer_exog: ColumnTransformer) -> Self {
        self.inner = self.inner.with_transformer_exog(transformer_exog);
        self
    }

    pub fn with_weight_func(mut self, weight_func: WeightFunc) -> Self {
        self.inner = self.inner.with_weight_func(weight_func);
        self
    }

    pub fn set_lags(&mut self, lags: impl Into<LagsSpec>) -> Result<()> {
        self.inner.set_lags(lags)
    }

    pub fn lags(&self) -> &[usize] {
        self.inner.lags()
    }

    pub fn max_lag(&self) -> usize {
        self.inner.max_lag()
    }

    pub fn steps(&self) -> usize {
        self.inner.steps()
    }

    pub fn is_fitted(&self) -> bool {
        self.inner.is_fitted()
    }

    pub fn warnings(&self) -> &[ForecastWarning] {
        self.inner.warnings()
    }

    fn as_level(y: &Frame) -> Result<Frame> {
        let column = match y.columns() {
            [column] => column.clone().rename(DIRECT_LEVEL),
            _ => {
                return Err(ForecastError::value_error(format!(
                    "`y` must have exactly one column. Got {}.",
                    y.width()
                )))
            }
        };
        Frame::new(y.index().clone(), vec![column])
    }

    /// Train on the single column of `y`
    pub fn fit(&mut self, y: &Frame, exog: Option<&Frame>) -> Result<&mut Self> {
        self.inner.fit(&Self::as_level(y)?, exog)?;
        Ok(self)
    }

    /// Predictions in a column named `pred`
    pub fn predict(
        &self,
        steps: Option<usize>,
        last_window: Option<&Frame>,
        exog: Option<&Frame>,
    ) -> Result<Frame> {
        let last_window = last_window.map(Self::as_level).transpose()?;
        let pred = self.inner.predict(steps, last_window.as_ref(), exog)?;
        let columns = pred
            .columns()
            .iter()
            .map(|c| c.clone().rename("pred"))
            .collect();
        Frame::new(pred.index().clone(), columns)
    }
}
