//! Global forecaster for multiple series
//!
//! A single regressor is trained on the stacked lag matrices of every
//! series. One-hot columns named after the series tell the regressor which
//! series a row belongs to. Predictions are produced recursively: each
//! forecast is appended to the window and used as a lag for the next step.

use super::lags::{create_lag_matrix, Lags, LagsSpec};
use super::matrix::{apply_nan_policy, TrainingMatrices};
use crate::data::{Column, DType, Frame, Frequency, IndexKind, IndexLabel, TimeIndex};
use crate::error::{ForecastError, ForecastWarning, Result};
use crate::preprocessing::{ColumnTransformer, Scaler, ScalerType};
use crate::regressor::Regressor;
use crate::utils::{check_exog, check_exog_alignment, check_same_names, check_series, format_names};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Scaling applied to each series before the lags are built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransformerSeries {
    None,
    /// The same scaler kind, fitted independently on every series
    Single(ScalerType),
    /// A scaler per series name. Series without an entry are not transformed.
    PerSeries(HashMap<String, ScalerType>),
}

impl Default for TransformerSeries {
    fn default() -> Self {
        TransformerSeries::Single(ScalerType::Standard)
    }
}

#[derive(Debug, Clone, Default)]
struct FittedTransformers {
    series: HashMap<String, Scaler>,
    exog: Option<ColumnTransformer>,
}

/// Attributes learned by `fit`
#[derive(Debug, Clone)]
struct FittedState {
    series_col_names: Vec<String>,
    exog_col_names: Option<Vec<String>>,
    exog_dtypes: Option<Vec<(String, DType)>>,
    x_train_col_names: Vec<String>,
    index_kind: IndexKind,
    index_freq: Option<Frequency>,
    training_range: HashMap<String, (IndexLabel, IndexLabel)>,
    last_window: Frame,
    transformers: FittedTransformers,
}

/// Recursive multi-series forecaster
#[derive(Debug, Clone)]
pub struct ForecasterMultiSeries<R: Regressor> {
    regressor: R,
    lags: Lags,
    transformer_series: TransformerSeries,
    transformer_exog: Option<ColumnTransformer>,
    drop_nan: bool,
    state: Option<FittedState>,
    warnings: Vec<ForecastWarning>,
}

impl<R: Regressor> ForecasterMultiSeries<R> {
    /// Create a forecaster with a `StandardScaler` per series
    pub fn new(regressor: R, lags: impl Into<LagsSpec>) -> Result<Self> {
        Ok(Self {
            regressor,
            lags: Lags::new(lags)?,
            transformer_series: TransformerSeries::default(),
            transformer_exog: None,
            drop_nan: false,
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

    /// Drop training rows whose features contain NaN
    pub fn with_drop_nan(mut self, drop_nan: bool) -> Self {
        self.drop_nan = drop_nan;
        self
    }

    /// Replace the lags. The forecaster must be refitted afterwards.
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

    pub fn regressor(&self) -> &R {
        &self.regressor
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    /// Warnings raised by the last call to `fit`
    pub fn warnings(&self) -> &[ForecastWarning] {
        &self.warnings
    }

    pub fn series_col_names(&self) -> Option<&[String]> {
        self.state.as_ref().map(|s| s.series_col_names.as_slice())
    }

    pub fn exog_col_names(&self) -> Option<&[String]> {
        self.state.as_ref().and_then(|s| s.exog_col_names.as_deref())
    }

    pub fn x_train_col_names(&self) -> Option<&[String]> {
        self.state.as_ref().map(|s| s.x_train_col_names.as_slice())
    }

    /// First and last training label of each series
    pub fn training_range(&self) -> Option<&HashMap<String, (IndexLabel, IndexLabel)>> {
        self.state.as_ref().map(|s| &s.training_range)
    }

    /// Last `max_lag` observations seen during `fit`
    pub fn last_window(&self) -> Option<&Frame> {
        self.state.as_ref().map(|s| &s.last_window)
    }

    pub fn index_kind(&self) -> Option<IndexKind> {
        self.state.as_ref().map(|s| s.index_kind)
    }

    pub fn index_freq(&self) -> Option<Frequency> {
        self.state.as_ref().and_then(|s| s.index_freq)
    }

    /// Build the training matrices from `series` and optional `exog`.
    ///
    /// Transformers are fitted on the given data; the forecaster itself is
    /// left untouched.
    pub fn create_train_x_y(&self, series: &Frame, exog: Option<&Frame>) -> Result<TrainingMatrices> {
        self.build_train(series, exog).map(|(matrices, _, _)| matrices)
    }

    fn build_train(
        &self,
        series: &Frame,
        exog: Option<&Frame>,
    ) -> Result<(TrainingMatrices, FittedTransformers, Frame)> {
        check_series(series)?;
        let series_col_names = series.column_names();

        if let Some(state) = &self.state {
            check_same_names("series", &series_col_names, &state.series_col_names)?;
            match (&state.exog_col_names, exog) {
                (None, Some(_)) => {
                    return Err(ForecastError::value_error(
                        "Once the Forecaster has been trained, `exog` must be `None` because \
                         no exogenous variables were added during training.",
                    ))
                }
                (Some(expected), Some(exog)) => {
                    check_same_names("exog", &exog.column_names(), expected)?
                }
                _ => {}
            }
        }

        if let Some(exog) = exog {
            check_exog_alignment(series, exog)?;
            check_exog(exog)?;
        }

        let mut warnings = Vec::new();

        // Keep RangeIndex and DatetimeIndex with frequency, overwrite the rest
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
            let range = TimeIndex::range(0, series.height() as i64);
            let exog = exog.map(|e| e.clone().set_index(range.clone())).transpose()?;
            (series.clone().set_index(range)?, exog)
        };
        let index = series.index();

        let transformers_series = self.transformers_for(&series_col_names, &mut warnings);

        // Exog is transformed once on the whole table
        let (exog_transformed, transformer_exog) = match (&exog, &self.transformer_exog) {
            (Some(exog), Some(transformer)) => {
                let mut transformer = transformer.unfitted();
                let transformed = transformer.fit_transform(exog)?;
                (Some(transformed), Some(transformer))
            }
            (Some(exog), None) => (Some(exog.clone()), None),
            (None, _) => (None, None),
        };

        let max_lag = self.lags.max_lag();
        let lag_names = self.lags.column_names("");
        let mut fitted_scalers = HashMap::new();
        let mut series_indexes = HashMap::new();
        let mut blocks = Vec::with_capacity(series_col_names.len());
        let mut block_indexes = Vec::with_capacity(series_col_names.len());
        let mut y_train = Vec::new();

        for name in &series_col_names {
            let values = series.values_f64(name)?;
            let (start, end) = validity_window(&values).ok_or_else(|| {
                ForecastError::value_error(format!("All values of series '{}' are NaN.", name))
            })?;
            series_indexes.insert(name.clone(), index.slice(start, end));
            let mut trimmed = values[start..end].to_vec();

            if let Some(kind) = transformers_series.get(name) {
                let mut scaler = Scaler::new(*kind);
                trimmed = scaler.fit_transform(&trimmed)?;
                fitted_scalers.insert(name.clone(), scaler);
            }

            let (x_lags, y) = create_lag_matrix(name, &trimmed, &self.lags)?;
            let n_rows = y.len();
            let positions: Vec<usize> = (start + max_lag..end).collect();

            let mut columns: Vec<Column> = lag_names
                .iter()
                .enumerate()
                .map(|(j, lag_name)| Column::float(lag_name.clone(), x_lags.column(j).to_vec()))
                .collect();
            if let Some(exog) = &exog_transformed {
                columns.extend(exog.take_rows(&positions)?.into_columns());
            }
            for other in &series_col_names {
                let flag = if other == name { 1.0 } else { 0.0 };
                columns.push(Column::float(other.clone(), vec![flag; n_rows]));
            }

            blocks.push(Frame::new(TimeIndex::range(0, n_rows as i64), columns)?);
            block_indexes.push(index.take(&positions)?);
            y_train.extend(y.iter().copied());
        }

        let x_train = Frame::concat_rows(&blocks)?;
        let x_train = x_train.set_index(TimeIndex::range(0, y_train.len() as i64))?;
        let train_index = TimeIndex::concat(&block_indexes.iter().collect::<Vec<_>>())?;

        let (x_train, y_train, train_index) =
            apply_nan_policy(x_train, y_train, train_index, self.drop_nan, &mut warnings)?;

        debug!(
            rows = y_train.len(),
            columns = x_train.width(),
            n_series = series_col_names.len(),
            "Training matrices created"
        );

        let matrices = TrainingMatrices {
            x_train,
            y_train,
            train_index,
            series_indexes,
            series_col_names,
            exog_col_names: exog.as_ref().map(Frame::column_names),
            exog_dtypes: exog.as_ref().map(Frame::dtypes),
            warnings,
        };
        let transformers = FittedTransformers {
            series: fitted_scalers,
            exog: transformer_exog,
        };
        Ok((matrices, transformers, series))
    }

    /// Scaler kind for each series that is transformed
    fn transformers_for(
        &self,
        series_col_names: &[String],
        warnings: &mut Vec<ForecastWarning>,
    ) -> HashMap<String, ScalerType> {
        match &self.transformer_series {
            TransformerSeries::None => HashMap::new(),
            TransformerSeries::Single(kind) => series_col_names
                .iter()
                .map(|name| (name.clone(), *kind))
                .collect(),
            TransformerSeries::PerSeries(map) => {
                let missing: Vec<String> = series_col_names
                    .iter()
                    .filter(|name| !map.contains_key(*name))
                    .cloned()
                    .collect();
                if !missing.is_empty() {
                    warnings.push(
                        ForecastWarning::IgnoredArgument(format!(
                            "{} not present in `transformer_series`. No transformation is \
                             applied to these series.",
                            format_names(&missing)
                        ))
                        .emit(),
                    );
                }
                map.iter()
                    .filter(|(name, _)| series_col_names.contains(name))
                    .map(|(name, kind)| (name.clone(), *kind))
                    .collect()
            }
        }
    }

    /// Train the regressor on all series
    pub fn fit(&mut self, series: &Frame, exog: Option<&Frame>) -> Result<&mut Self> {
        // A refit starts from scratch
        self.state = None;
        let (matrices, transformers, series) = self.build_train(series, exog)?;

        let x = matrices.x_array()?;
        let y = matrices.y_array();
        self.regressor.fit(&x, &y)?;

        let max_lag = self.lags.max_lag();
        let height = series.height();
        let last_window = series.slice_rows(height.saturating_sub(max_lag), height);
        let training_range = matrices
            .series_indexes
            .iter()
            .filter_map(|(name, idx)| Some((name.clone(), (idx.first()?, idx.last()?))))
            .collect();

        info!(
            regressor = self.regressor.name(),
            rows = matrices.n_rows(),
            n_series = matrices.series_col_names.len(),
            "Forecaster fitted"
        );

        self.warnings = matrices.warnings;
        self.state = Some(FittedState {
            series_col_names: matrices.series_col_names,
            exog_col_names: matrices.exog_col_names,
            exog_dtypes: matrices.exog_dtypes,
            x_train_col_names: matrices.x_train.column_names(),
            index_kind: series.index().kind(),
            index_freq: series.index().freq(),
            training_range,
            last_window,
            transformers,
        });
        Ok(self)
    }

    /// Forecast `steps` ahead for `levels` (all series when `None`).
    ///
    /// `last_window` defaults to the window stored at fit time. `exog` is
    /// required when the forecaster was trained with exogenous variables and
    /// must hold at least `steps` rows. The result is indexed by the labels
    /// that follow the window.
    pub fn predict(
        &self,
        steps: usize,
        levels: Option<&[&str]>,
        last_window: Option<&Frame>,
        exog: Option<&Frame>,
    ) -> Result<Frame> {
        let state = self.state.as_ref().ok_or_else(|| {
            ForecastError::NotFitted("Call `fit` with appropriate arguments before using predict.".to_string())
        })?;
        if steps < 1 {
            return Err(ForecastError::value_error(format!(
                "`steps` must be an integer greater than or equal to 1. Got {}.",
                steps
            )));
        }

        let levels: Vec<String> = match levels {
            Some(levels) => levels.iter().map(|l| l.to_string()).collect(),
            None => state.series_col_names.clone(),
        };
        if let Some(unknown) = levels.iter().find(|l| !state.series_col_names.contains(l)) {
            return Err(ForecastError::value_error(format!(
                "`levels` must be in the series used during fit ({}). Got '{}'.",
                format_names(&state.series_col_names),
                unknown
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

        let exog_features = self.exog_features(state, steps, exog)?;

        let mut columns = Vec::with_capacity(levels.len());
        for level in &levels {
            let values = window.values_f64(level)?;
            let mut history = values[values.len() - max_lag..].to_vec();
            if history.iter().any(|v| v.is_nan()) {
                return Err(ForecastError::value_error(format!(
                    "`last_window` has missing values for series '{}'. The last {} values \
                     of every predicted level must be valid.",
                    level, max_lag
                )));
            }
            let scaler = state.transformers.series.get(level);
            if let Some(scaler) = scaler {
                history = scaler.transform(&history)?;
            }

            let predictions = self.recursive_predict(state, level, steps, history, exog_features.as_ref())?;
            let predictions = match scaler {
                Some(scaler) => scaler.inverse_transform(&predictions)?,
                None => predictions,
            };
            columns.push(Column::float(level.clone(), predictions));
        }

        Frame::new(window.index().extend_future(steps)?, columns)
    }

    /// Transformed exogenous features for the forecast horizon
    fn exog_features(
        &self,
        state: &FittedState,
        steps: usize,
        exog: Option<&Frame>,
    ) -> Result<Option<Array2<f64>>> {
        match (&state.exog_col_names, exog) {
            (None, None) => Ok(None),
            (Some(_), None) => Err(ForecastError::value_error(
                "Forecaster trained with exogenous variable/s. Same variable/s must be \
                 provided when predicting.",
            )),
            (None, Some(_)) => Err(ForecastError::value_error(
                "Forecaster trained without exogenous variable/s. `exog` must be `None` \
                 when predicting.",
            )),
            (Some(names), Some(exog)) => {
                check_same_names("exog", &exog.column_names(), names)?;
                check_exog(exog)?;
                if exog.height() < steps {
                    return Err(ForecastError::value_error(format!(
                        "`exog` must have at least as many values as `steps` predicted. \
                         Got {} values for {} steps.",
                        exog.height(),
                        steps
                    )));
                }
                let exog = exog.slice_rows(0, steps).select(names)?;
                let exog = match &state.transformers.exog {
                    Some(transformer) => transformer.transform(&exog)?,
                    None => exog,
                };
                Ok(Some(exog.to_array()?))
            }
        }
    }

    fn recursive_predict(
        &self,
        state: &FittedState,
        level: &str,
        steps: usize,
        mut history: Vec<f64>,
        exog: Option<&Array2<f64>>,
    ) -> Result<Vec<f64>> {
        let n_exog = exog.map_or(0, |e| e.ncols());
        let n_series = state.series_col_names.len();
        let n_features = self.lags.len() + n_exog + n_series;
        let mut predictions = Vec::with_capacity(steps);

        for step in 0..steps {
            let mut row = Vec::with_capacity(n_features);
            row.extend(self.lags.as_slice().iter().map(|&k| history[history.len() - k]));
            if let Some(exog) = exog {
                row.extend(exog.row(step).iter().copied());
            }
            row.extend(
                state
                    .series_col_names
                    .iter()
                    .map(|s| if s == level { 1.0 } else { 0.0 }),
            );

            let x = Array2::from_shape_vec((1, n_features), row)?;
            let pred: Array1<f64> = self.regressor.predict(&x)?;
            let value = pred.get(0).copied().ok_or_else(|| {
                ForecastError::Regressor("Regressor returned no prediction.".to_string())
            })?;
            predictions.push(value);
            history.push(value);
        }

        Ok(predictions)
    }
}

/// `[first valid, last valid + 1)` of `values`
fn validity_window(values: &[f64]) -> Option<(usize, usize)> {
    let first = values.iter().position(|v| !v.is_nan())?;
    let last = values.iter().rposition(|v| !v.is_nan())?;
    Some((first, last + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regressor::LinearRegression;

    fn arange(n: usize) -> Vec<f64> {
        (0..n).map(|v| v as f64).collect()
    }

    #[test]
    fn test_validity_window() {
        assert_eq!(validity_window(&[f64::NAN, 1.0, f64::NAN, 2.0, f64::NAN]), Some((1, 4)));
        assert_eq!(validity_window(&[f64::NAN]), None);
    }

    #[test]
    fn test_create_train_x_y_default_standard_scaler() {
        let series = Frame::with_range_index(vec![
            Column::float("1", arange(7)),
            Column::float("2", arange(7)),
        ])
        .unwrap();
        let forecaster = ForecasterMultiSeries::new(LinearRegression::new(), 3i64).unwrap();
        let m = forecaster.create_train_x_y(&series, None).unwrap();

        assert_eq!(m.x_train.column_names(), vec!["lag_1", "lag_2", "lag_3", "1", "2"]);
        let x = m.x_array().unwrap();
        let expected_first = [-0.5, -1.0, -1.5, 1.0, 0.0];
        for (a, b) in x.row(0).iter().zip(expected_first.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
        assert_eq!(m.y_train, vec![0.0, 0.5, 1.0, 1.5, 0.0, 0.5, 1.0, 1.5]);
        assert_eq!(m.train_index, TimeIndex::Int(vec![3, 4, 5, 6, 3, 4, 5, 6]));
        assert!(m.exog_col_names.is_none());
    }

    #[test]
    fn test_fit_predict_linear_trend() {
        let series = Frame::with_range_index(vec![
            Column::float("a", arange(20)),
            Column::float("b", arange(20).iter().map(|v| 2.0 * v).collect()),
        ])
        .unwrap();
        let mut forecaster = ForecasterMultiSeries::new(LinearRegression::new(), 3i64).unwrap();
        forecaster.fit(&series, None).unwrap();

        let pred = forecaster.predict(3, None, None, None).unwrap();
        assert_eq!(pred.index(), &TimeIndex::range(20, 23));
        let a = pred.values_f64("a").unwrap();
        let b = pred.values_f64("b").unwrap();
        for (i, v) in a.iter().enumerate() {
            assert!((v - (20 + i) as f64).abs() < 1e-4);
        }
        for (i, v) in b.iter().enumerate() {
            assert!((v - 2.0 * (20 + i) as f64).abs() < 1e-4);
        }
    }

    #[test]
    fn test_predict_unknown_level() {
        let series = Frame::with_range_index(vec![Column::float("a", arange(10))]).unwrap();
        let mut forecaster = ForecasterMultiSeries::new(LinearRegression::new(), 2i64).unwrap();
        forecaster.fit(&series, None).unwrap();
        assert!(forecaster.predict(1, Some(&["zz"]), None, None).is_err());
    }

    #[test]
    fn test_predict_before_fit() {
        let forecaster = ForecasterMultiSeries::new(LinearRegression::new(), 2i64).unwrap();
        assert!(matches!(
            forecaster.predict(1, None, None, None),
            Err(ForecastError::NotFitted(_))
        ));
    }

    #[test]
    fn test_predict_rejects_window_with_trailing_nan() {
        let mut b = arange(10);
        b.extend([f64::NAN, f64::NAN]);
        let series = Frame::with_range_index(vec![
            Column::float("a", arange(12)),
            Column::float("b", b),
        ])
        .unwrap();
        let mut forecaster = ForecasterMultiSeries::new(LinearRegression::new(), 2i64).unwrap();
        forecaster.fit(&series, None).unwrap();

        let err = forecaster.predict(2, None, None, None).unwrap_err();
        assert!(matches!(err, ForecastError::ValueError(_)));
        assert!(err.to_string().contains("series 'b'"));

        let pred = forecaster.predict(2, Some(&["a"]), None, None).unwrap();
        assert!(pred.values_f64("a").unwrap().iter().all(|v| v.is_finite()));
    }
}
