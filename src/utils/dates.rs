//! Conversion of dates and integer offsets into index positions

use crate::data::{IndexKind, TimeIndex};
use crate::error::{ForecastError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A date or an integer position supplied by the caller.
///
/// Deserializes from a JSON integer (`Position`) or string (`Date`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateInput {
    /// Integer offset (steps or row position)
    Position(i64),
    /// Date string, parsed with `date_format` or ISO 8601
    Date(String),
    Timestamp(NaiveDateTime),
}

impl From<i64> for DateInput {
    fn from(value: i64) -> Self {
        DateInput::Position(value)
    }
}

impl From<usize> for DateInput {
    fn from(value: usize) -> Self {
        DateInput::Position(value as i64)
    }
}

impl From<&str> for DateInput {
    fn from(value: &str) -> Self {
        DateInput::Date(value.to_string())
    }
}

impl From<NaiveDateTime> for DateInput {
    fn from(value: NaiveDateTime) -> Self {
        DateInput::Timestamp(value)
    }
}

/// How the resolved position relates to the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PositionMethod {
    /// Steps ahead of the last label (forecast horizons)
    #[default]
    Prediction,
    /// Position inside the index (training cut-offs)
    Validation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionOptions {
    pub method: PositionMethod,
    /// Argument name used in error messages
    pub date_literal: String,
    /// `chrono` format for `DateInput::Date`
    pub date_format: Option<String>,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            method: PositionMethod::Prediction,
            date_literal: "steps".to_string(),
            date_format: None,
        }
    }
}

impl PositionOptions {
    pub fn validation(date_literal: impl Into<String>) -> Self {
        Self {
            method: PositionMethod::Validation,
            date_literal: date_literal.into(),
            date_format: None,
        }
    }

    pub fn with_method(mut self, method: PositionMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_date_literal(mut self, date_literal: impl Into<String>) -> Self {
        self.date_literal = date_literal.into();
        self
    }

    pub fn with_date_format(mut self, date_format: impl Into<String>) -> Self {
        self.date_format = Some(date_format.into());
        self
    }
}

const DEFAULT_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parse a date string. With `format`, only that format is tried (as a
/// datetime, then as a date at midnight); otherwise ISO-like formats.
pub fn parse_date(value: &str, format: Option<&str>) -> Result<NaiveDateTime> {
    let value = value.trim();
    let invalid = || ForecastError::value_error(format!("Could not parse '{}' as a date.", value));
    match format {
        Some(fmt) => NaiveDateTime::parse_from_str(value, fmt)
            .or_else(|_| {
                NaiveDate::parse_from_str(value, fmt).map(|d| d.and_time(chrono::NaiveTime::MIN))
            })
            .map_err(|_| invalid()),
        None => DEFAULT_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .ok()
                    .map(|d| d.and_time(chrono::NaiveTime::MIN))
            })
            .ok_or_else(invalid),
    }
}

/// Resolve `input` to an integer position relative to `index`.
///
/// With [`PositionMethod::Prediction`] a date is converted into the number
/// of `freq` steps after the last label; with [`PositionMethod::Validation`]
/// into the position of the last label not later than the date. Integer
/// inputs are validated and returned as they are.
pub fn date_to_index_position(
    index: &TimeIndex,
    input: &DateInput,
    options: &PositionOptions,
) -> Result<usize> {
    let target = match input {
        DateInput::Position(value) => return check_position(index, *value, options),
        DateInput::Date(s) => parse_date(s, options.date_format.as_deref())?,
        DateInput::Timestamp(ts) => *ts,
    };

    let values = match (index.kind(), index.as_datetimes()) {
        (IndexKind::Datetime, Some(values)) if !values.is_empty() => values,
        (IndexKind::Datetime, _) => {
            return Err(ForecastError::value_error("The index is empty."));
        }
        _ => {
            return Err(ForecastError::type_error(format!(
                "Index must be a pandas DatetimeIndex when `{}` is not an integer. \
                 Check input series or last window.",
                options.date_literal
            )))
        }
    };
    let (first, last) = (values[0], values[values.len() - 1]);

    match options.method {
        PositionMethod::Prediction => {
            if target <= last {
                return Err(ForecastError::value_error(
                    "The provided date must be later than the last date in the index.",
                ));
            }
            let freq = index.freq().ok_or_else(|| {
                ForecastError::value_error(
                    "The index has no frequency. Steps cannot be computed from a date.",
                )
            })?;
            Ok(freq.steps_between(last, target))
        }
        PositionMethod::Validation => {
            if target < first || target > last {
                return Err(ForecastError::value_error(
                    "The provided date must be later than the first date in the index \
                     and earlier than the last date.",
                ));
            }
            // forward fill: last label <= target
            Ok(values.partition_point(|v| *v <= target) - 1)
        }
    }
}

fn check_position(index: &TimeIndex, value: i64, options: &PositionOptions) -> Result<usize> {
    match options.method {
        PositionMethod::Prediction => usize::try_from(value).map_err(|_| {
            ForecastError::value_error(format!(
                "`{}` must be a non-negative integer. Got {}.",
                options.date_literal, value
            ))
        }),
        PositionMethod::Validation => {
            let len = index.len() as i64;
            if value < 0 || value >= len {
                return Err(ForecastError::value_error(format!(
                    "The provided integer must be between 0 and {}.",
                    len - 1
                )));
            }
            Ok(value as usize)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Frequency;

    fn daily(periods: usize) -> TimeIndex {
        let start = parse_date("1990-01-01", None).unwrap();
        TimeIndex::date_range(start, periods, Frequency::days(1)).unwrap()
    }

    #[test]
    fn test_parse_date_formats() {
        let a = parse_date("1990-01-07", None).unwrap();
        let b = parse_date("1990-07-01", Some("%Y-%d-%m")).unwrap();
        assert_eq!(a, b);
        assert!(parse_date("not a date", None).is_err());
    }

    #[test]
    fn test_prediction_weekly_partial_step() {
        let start = parse_date("2020-01-01", None).unwrap();
        let index = TimeIndex::date_range(start, 3, Frequency::days(7)).unwrap();
        // last = 2020-01-15; 2020-01-30 is two whole weeks and one day later
        let pos = date_to_index_position(
            &index,
            &DateInput::from("2020-01-30"),
            &PositionOptions::default(),
        )
        .unwrap();
        assert_eq!(pos, 2);
    }

    #[test]
    fn test_validation_forward_fill() {
        let start = parse_date("2020-01-01", None).unwrap();
        let index = TimeIndex::date_range(start, 4, Frequency::days(2)).unwrap();
        let pos = date_to_index_position(
            &index,
            &DateInput::from("2020-01-04"),
            &PositionOptions::validation("initial_train_size"),
        )
        .unwrap();
        assert_eq!(pos, 1);
    }

    #[test]
    fn test_prediction_negative_integer() {
        let err = date_to_index_position(&daily(3), &DateInput::Position(-1), &PositionOptions::default())
            .unwrap_err();
        assert!(matches!(err, ForecastError::ValueError(_)));
    }
}
