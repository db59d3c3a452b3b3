//! Backtesting of multi-series forecasters

use super::metrics::Metric;
use super::splitter::{log_folds, time_series_splitter};
use crate::config::BacktestConfig;
use crate::data::{Frame, TimeIndex};
use crate::error::{ForecastError, Result};
use crate::forecaster::ForecasterMultiSeries;
use crate::regressor::Regressor;
use crate::utils::{
    check_exog_alignment, check_series, date_to_index_position, format_names, DateInput,
    PositionOptions,
};
use tracing::{debug, info};

/// Outcome of a backtest
#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub metric: Metric,
    /// Metric value per evaluated series, in level order
    pub metrics: Vec<(String, f64)>,
    /// Predictions of every fold, indexed like the backtested rows of `series`
    pub predictions: Frame,
}

impl BacktestResult {
    pub fn metric_for(&self, level: &str) -> Option<f64> {
        self.metrics
            .iter()
            .find(|(name, _)| name == level)
            .map(|(_, value)| *value)
    }
}

/// Resolve `initial_train_size` to a number of observations. A date is the
/// last training observation, so it is counted in.
fn resolve_initial_train_size(series: &Frame, input: &DateInput) -> Result<usize> {
    let position = date_to_index_position(
        series.index(),
        input,
        &PositionOptions::validation("initial_train_size"),
    )?;
    Ok(match input {
        DateInput::Position(_) => position,
        DateInput::Date(_) | DateInput::Timestamp(_) => position + 1,
    })
}

/// Backtest a [`ForecasterMultiSeries`] over `series`.
///
/// The forecaster is trained with the first `initial_train_size`
/// observations and then predicts consecutive folds of `steps`
/// observations, using the actual observations preceding each fold as the
/// last window. With `refit` the forecaster is re-trained before each fold
/// on all the data before it (or, with `fixed_train_size`, on the most
/// recent `initial_train_size` observations).
///
/// The forecaster passed in is left untouched; a clone is trained.
pub fn backtesting_forecaster_multiseries<R: Regressor>(
    forecaster: &ForecasterMultiSeries<R>,
    series: &Frame,
    config: &BacktestConfig,
    exog: Option<&Frame>,
) -> Result<BacktestResult> {
    check_series(series)?;
    if let Some(exog) = exog {
        check_exog_alignment(series, exog)?;
    }

    let series_names = series.column_names();
    let levels: Vec<String> = match &config.levels {
        Some(levels) => levels.clone(),
        None => series_names.clone(),
    };
    if let Some(unknown) = levels.iter().find(|l| !series_names.contains(l)) {
        return Err(ForecastError::value_error(format!(
            "`levels` must be in the series columns ({}). Got '{}'.",
            format_names(&series_names),
            unknown
        )));
    }

    let n = series.height();
    let max_lag = forecaster.max_lag();
    let initial_train_size = resolve_initial_train_size(series, &config.initial_train_size)?;
    if initial_train_size <= max_lag || initial_train_size >= n {
        return Err(ForecastError::value_error(format!(
            "`initial_train_size` must be greater than forecaster's window size ({}) \
             and smaller than the length of `series` ({}).",
            max_lag, n
        )));
    }

    let folds = time_series_splitter(n, initial_train_size, config.steps, config.allow_incomplete_fold)?;
    if config.verbose {
        log_folds(&folds, n, initial_train_size, config.steps);
        info!(refit = config.refit, fixed_train_size = config.fixed_train_size, "Backtesting forecaster");
    }

    // Irregular indexes are positional for the forecaster, as in `fit`
    let (series_model, exog_model) = if series.index().is_regular() {
        (series.clone(), exog.cloned())
    } else {
        let range = TimeIndex::range(0, n as i64);
        let exog = exog.map(|e| e.clone().set_index(range.clone())).transpose()?;
        (series.clone().set_index(range)?, exog)
    };

    let level_refs: Vec<&str> = levels.iter().map(String::as_str).collect();
    let mut model = forecaster.clone();
    let mut fold_predictions = Vec::with_capacity(folds.len());
    for (i, fold) in folds.iter().enumerate() {
        if i == 0 || config.refit {
            let train_start = if config.fixed_train_size {
                fold.test.start - initial_train_size
            } else {
                0
            };
            debug!(fold = i, train_start, train_end = fold.test.start, "training forecaster");
            let train_series = series_model.slice_rows(train_start, fold.test.start);
            let train_exog = exog_model.as_ref().map(|e| e.slice_rows(train_start, fold.test.start));
            model.fit(&train_series, train_exog.as_ref())?;
        }

        let last_window = series_model.slice_rows(fold.test.start - max_lag, fold.test.start);
        let fold_exog = exog_model.as_ref().map(|e| e.slice_rows(fold.test.start, fold.test.end));
        let predictions = model.predict(
            fold.test_size(),
            Some(level_refs.as_slice()),
            Some(&last_window),
            fold_exog.as_ref(),
        )?;
        fold_predictions.push(predictions);
    }

    let predictions = Frame::concat_rows(&fold_predictions)?;
    let n_pred = predictions.height();
    let predictions = predictions.set_index(
        series
            .index()
            .slice(initial_train_size, initial_train_size + n_pred),
    )?;

    let mut metrics = Vec::with_capacity(levels.len());
    for level in &levels {
        let y_true = series.values_f64(level)?;
        let y_pred = predictions.values_f64(level)?;
        let value = config
            .metric
            .compute(&y_true[initial_train_size..initial_train_size + n_pred], &y_pred)?;
        metrics.push((level.clone(), value));
    }

    Ok(BacktestResult {
        metric: config.metric,
        metrics,
        predictions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Column;
    use crate::forecaster::TransformerSeries;
    use crate::regressor::LinearRegression;

    fn trend_series(n: usize) -> Frame {
        Frame::with_range_index(vec![
            Column::float("a", (0..n).map(|v| v as f64).collect()),
            Column::float("b", (0..n).map(|v| 2.0 * v as f64 + 1.0).collect()),
        ])
        .unwrap()
    }

    fn forecaster() -> ForecasterMultiSeries<LinearRegression> {
        ForecasterMultiSeries::new(LinearRegression::new(), 2i64)
            .unwrap()
            .with_transformer_series(TransformerSeries::None)
    }

    #[test]
    fn test_backtesting_shapes() {
        let series = trend_series(20);
        let config = BacktestConfig::new(12usize, 3).with_metric(Metric::MeanAbsoluteError);
        let result = backtesting_forecaster_multiseries(&forecaster(), &series, &config, None).unwrap();

        assert_eq!(result.predictions.height(), 8);
        assert_eq!(result.predictions.column_names(), vec!["a", "b"]);
        assert_eq!(result.predictions.index().label(0), series.index().label(12));
        assert_eq!(result.metrics.len(), 2);
    }

    #[test]
    fn test_backtesting_levels_and_refit() {
        let series = trend_series(20);
        let config = BacktestConfig::new(10usize, 4)
            .with_refit(true)
            .with_fixed_train_size(true)
            .with_levels(&["b"]);
        let result = backtesting_forecaster_multiseries(&forecaster(), &series, &config, None).unwrap();
        assert_eq!(result.predictions.column_names(), vec!["b"]);
        assert!(result.metric_for("a").is_none());
        assert!(result.metric_for("b").is_some());
    }

    #[test]
    fn test_backtesting_datetime_index_without_frequency() {
        let start = crate::utils::parse_date("2021-01-04", None).unwrap();
        // business days: weekends are missing, so no frequency is inferred
        let dates: Vec<_> = (0..42)
            .map(|d| start + chrono::Duration::days(d))
            .filter(|d| chrono::Datelike::weekday(d).number_from_monday() <= 5)
            .take(30)
            .collect();
        let index = TimeIndex::datetime(dates);
        assert!(index.freq().is_none());

        let series = trend_series(30).set_index(index.clone()).unwrap();
        let exog = Frame::new(
            index.clone(),
            vec![Column::float("x", (0..30).map(|v| (v % 3) as f64).collect())],
        )
        .unwrap();
        let config = BacktestConfig::new(20usize, 5);
        let result =
            backtesting_forecaster_multiseries(&forecaster(), &series, &config, Some(&exog)).unwrap();

        assert_eq!(result.predictions.height(), 10);
        assert_eq!(result.predictions.index().label(0), index.label(20));
        assert_eq!(result.predictions.index().last(), index.last());
        assert!(result.metric_for("a").unwrap() < 1e-4);
    }

    #[test]
    fn test_initial_train_size_too_small() {
        let series = trend_series(20);
        let config = BacktestConfig::new(2usize, 3);
        let err = backtesting_forecaster_multiseries(&forecaster(), &series, &config, None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "`initial_train_size` must be greater than forecaster's window size (2) and \
             smaller than the length of `series` (20)."
        );
    }

    #[test]
    fn test_unknown_level() {
        let series = trend_series(20);
        let config = BacktestConfig::new(10usize, 3).with_levels(&["z"]);
        assert!(matches!(
            backtesting_forecaster_multiseries(&forecaster(), &series, &config, None),
            Err(ForecastError::ValueError(_))
        ));
    }
}
