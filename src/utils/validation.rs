//! Input checks shared by the forecasters

use crate::data::{Categories, DType, Frame};
use crate::error::{ForecastError, Result};
use std::collections::HashSet;

/// Every series column must be float or int
pub fn check_series(series: &Frame) -> Result<()> {
    if series.width() == 0 {
        return Err(ForecastError::value_error(
            "`series` must contain at least one column.",
        ));
    }
    for column in series.columns() {
        let dtype = column.dtype();
        if !dtype.is_numeric() {
            return Err(ForecastError::type_error(format!(
                "All series must be numeric. Column '{}' has dtype {}.",
                column.name(),
                dtype
            )));
        }
    }
    Ok(())
}

/// Categorical exogenous columns must have integer categories
pub fn check_exog(exog: &Frame) -> Result<()> {
    let has_non_int_categories = exog
        .columns()
        .iter()
        .any(|c| matches!(c.dtype(), DType::Categorical(Categories::Str(_))));
    if has_non_int_categories {
        return Err(ForecastError::type_error(
            "Categorical columns in exog must contain only integer values. \
             See skforecast docs for more info about how to include categorical \
             features https://skforecast.org/latest/user_guides/categorical-features.html",
        ));
    }
    Ok(())
}

/// `exog` must have the same length and labels as `series`
pub fn check_exog_alignment(series: &Frame, exog: &Frame) -> Result<()> {
    if exog.height() != series.height() {
        return Err(ForecastError::value_error(format!(
            "`exog` must have same number of samples as `series`. \
             length `exog`: ({}), length `series`: ({})",
            exog.height(),
            series.height()
        )));
    }
    if !exog.index().labels_equal(series.index()) {
        return Err(ForecastError::value_error(
            "Different index for `series` and `exog`. They must be equal \
             to ensure the correct alignment of values.",
        ));
    }
    Ok(())
}

/// Names seen at fit time must be the names supplied now, compared as sets.
/// `argument` is the argument name used in the message.
pub fn check_same_names(argument: &str, got: &[String], expected: &[String]) -> Result<()> {
    let got_set: HashSet<&String> = got.iter().collect();
    let expected_set: HashSet<&String> = expected.iter().collect();
    if got_set != expected_set {
        return Err(ForecastError::value_error(format!(
            "Once the Forecaster has been trained, `{}` must have the same columns \
             as the series used during training:\n Got      : {}\n Expected : {}",
            argument,
            format_names(got),
            format_names(expected)
        )));
    }
    Ok(())
}

/// Python-style list literal: `['a', 'b']`
pub(crate) fn format_names(names: &[String]) -> String {
    let quoted: Vec<String> = names.iter().map(|n| format!("'{}'", n)).collect();
    format!("[{}]", quoted.join(", "))
}
