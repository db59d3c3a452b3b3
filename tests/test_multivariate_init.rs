use lagcast::data::{Column, Frame, TimeIndex};
use lagcast::forecaster::{ForecasterMultiVariate, WeightFunc};
use lagcast::regressor::{KNeighborsRegressor, LinearRegression};
use lagcast::ForecastWarning;
use std::sync::Arc;

fn uniform_weights() -> WeightFunc {
    Arc::new(|index: &TimeIndex| vec![1.0; index.len()])
}

#[test]
fn test_init_error_when_steps_is_less_than_1() {
    let err = ForecasterMultiVariate::new(LinearRegression::new(), "l1", 2i64, 0).unwrap_err();
    assert_eq!(
        err.to_string(),
        "`steps` argument must be greater than or equal to 1. Got 0."
    );
}

#[test]
fn test_init_when_weight_func_and_regressor_without_sample_weight() {
    let forecaster = ForecasterMultiVariate::new(KNeighborsRegressor::default(), "l1", 3i64, 2)
        .unwrap()
        .with_weight_func(uniform_weights());

    assert!(!forecaster.has_weight_func());
    assert_eq!(
        forecaster.warnings(),
        &[ForecastWarning::IgnoredArgument(
            "Argument `weight_func` is ignored since regressor KNeighborsRegressor does not \
             accept `sample_weight` in its `fit` method."
                .to_string()
        )]
    );
}

#[test]
fn test_init_when_weight_func_and_regressor_with_sample_weight() {
    let forecaster = ForecasterMultiVariate::new(LinearRegression::new(), "l1", 3i64, 2)
        .unwrap()
        .with_weight_func(uniform_weights());
    assert!(forecaster.has_weight_func());
    assert!(forecaster.warnings().is_empty());
    assert_eq!(forecaster.level(), "l1");
    assert_eq!(forecaster.steps(), 2);
    assert!(!forecaster.is_fitted());
}

#[test]
fn test_fit_with_weight_func_and_predict() {
    let series = Frame::with_range_index(vec![
        Column::float("l1", (0..30).map(|v| 2.0 * v as f64).collect()),
        Column::float("l2", (0..30).map(|v| v as f64 + 5.0).collect()),
    ])
    .unwrap();

    let mut forecaster = ForecasterMultiVariate::new(LinearRegression::new(), "l1", 2i64, 3)
        .unwrap()
        .with_weight_func(uniform_weights());
    forecaster.fit(&series, None).unwrap();
    assert!(forecaster.is_fitted());

    let predictions = forecaster.predict(None, None, None).unwrap();
    assert_eq!(predictions.height(), 3);
    let values = predictions.values_f64("l1").unwrap();
    for (step, value) in values.iter().enumerate() {
        let expected = 2.0 * (30 + step) as f64;
        assert!((value - expected).abs() < 1e-3, "step {}: {} vs {}", step + 1, value, expected);
    }
}
