//! Lag specification and lagged-feature construction

use crate::error::{ForecastError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// User-facing lag argument.
///
/// Deserializes from `3` (lags 1..=3), `[1, 5, 7]` or
/// `{"start": 1, "end": 4}` (lags 1, 2, 3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LagsSpec {
    Count(i64),
    List(Vec<i64>),
    Range { start: i64, end: i64 },
}

impl From<i64> for LagsSpec {
    fn from(n: i64) -> Self {
        LagsSpec::Count(n)
    }
}

impl From<usize> for LagsSpec {
    fn from(n: usize) -> Self {
        LagsSpec::Count(n as i64)
    }
}

impl From<Vec<i64>> for LagsSpec {
    fn from(lags: Vec<i64>) -> Self {
        LagsSpec::List(lags)
    }
}

impl From<&[i64]> for LagsSpec {
    fn from(lags: &[i64]) -> Self {
        LagsSpec::List(lags.to_vec())
    }
}

impl From<std::ops::Range<i64>> for LagsSpec {
    fn from(range: std::ops::Range<i64>) -> Self {
        LagsSpec::Range {
            start: range.start,
            end: range.end,
        }
    }
}

/// Validated, sorted set of positive lags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lags {
    lags: Vec<usize>,
    max_lag: usize,
}

impl Lags {
    pub fn new(spec: impl Into<LagsSpec>) -> Result<Self> {
        let values = match spec.into() {
            LagsSpec::Count(n) => {
                if n < 1 {
                    return Err(ForecastError::value_error(
                        "Minimum value of lags allowed is 1.",
                    ));
                }
                return Self::contiguous(1, n);
            }
            LagsSpec::Range { start, end } if start < end => {
                if start < 1 {
                    return Err(ForecastError::value_error(
                        "Minimum value of lags allowed is 1.",
                    ));
                }
                return Self::contiguous(start, end - 1);
            }
            LagsSpec::Range { .. } => Vec::new(),
            LagsSpec::List(values) => values,
        };

        if values.is_empty() {
            return Err(ForecastError::value_error(
                "Argument `lags` must contain at least one value.",
            ));
        }
        if values.iter().any(|&v| v < 1) {
            return Err(ForecastError::value_error(
                "Minimum value of lags allowed is 1.",
            ));
        }

        let mut lags: Vec<usize> = values.into_iter().map(|v| v as usize).collect();
        lags.sort_unstable();
        lags.dedup();
        let max_lag = lags[lags.len() - 1];
        Ok(Self { lags, max_lag })
    }

    /// Lags `first..=last`, with `1 <= first <= last`
    fn contiguous(first: i64, last: i64) -> Result<Self> {
        let too_many = || {
            ForecastError::value_error(format!(
                "Too many lags requested. Got a maximum lag of {}.",
                last
            ))
        };
        let first = usize::try_from(first).map_err(|_| too_many())?;
        let max_lag = usize::try_from(last).map_err(|_| too_many())?;
        let mut lags = Vec::new();
        lags.try_reserve_exact(max_lag - first + 1)
            .map_err(|_| too_many())?;
        lags.extend(first..=max_lag);
        Ok(Self { lags, max_lag })
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.lags
    }

    pub fn len(&self) -> usize {
        self.lags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lags.is_empty()
    }

    pub fn max_lag(&self) -> usize {
        self.max_lag
    }

    /// Column names `{prefix}lag_{k}`
    pub fn column_names(&self, prefix: &str) -> Vec<String> {
        self.lags.iter().map(|k| format!("{}lag_{}", prefix, k)).collect()
    }
}

/// Build the lag matrix and target of one series.
///
/// Row `i` corresponds to position `t = max_lag + i`; column `j` holds
/// `values[t - lags[j]]` and the target is `values[t]`.
pub fn create_lag_matrix(
    name: &str,
    values: &[f64],
    lags: &Lags,
) -> Result<(Array2<f64>, Array1<f64>)> {
    let max_lag = lags.max_lag();
    if values.len() <= max_lag {
        return Err(ForecastError::value_error(format!(
            "The maximum lag (`max_lag`) ({}) must be less than the length of the series '{}', ({}).",
            max_lag,
            name,
            values.len()
        )));
    }

    let n_rows = values.len() - max_lag;
    let x = Array2::from_shape_fn((n_rows, lags.len()), |(i, j)| {
        values[max_lag + i - lags.as_slice()[j]]
    });
    let y = Array1::from_iter(values[max_lag..].iter().copied());
    Ok((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lags_from_int() {
        let lags = Lags::new(5i64).unwrap();
        assert_eq!(lags.as_slice(), &[1, 2, 3, 4, 5]);
        assert_eq!(lags.max_lag(), 5);
    }

    #[test]
    fn test_lags_sorted_and_deduplicated() {
        let lags = Lags::new(vec![7, 1, 7, 3]).unwrap();
        assert_eq!(lags.as_slice(), &[1, 3, 7]);
        assert_eq!(lags.max_lag(), 7);
    }

    #[test]
    fn test_lags_invalid() {
        assert_eq!(
            Lags::new(0i64).unwrap_err().to_string(),
            "Minimum value of lags allowed is 1."
        );
        assert_eq!(
            Lags::new(Vec::<i64>::new()).unwrap_err().to_string(),
            "Argument `lags` must contain at least one value."
        );
        assert!(Lags::new(0..4).is_err());
    }

    #[test]
    fn test_lags_huge_count_is_rejected() {
        let err = Lags::new(i64::MAX).unwrap_err();
        assert!(err.to_string().starts_with("Too many lags requested."));

        let spec: LagsSpec = serde_json::from_str("{\"start\": 2, \"end\": 5}").unwrap();
        let lags = Lags::new(spec).unwrap();
        assert_eq!(lags.as_slice(), &[2, 3, 4]);
        assert_eq!(lags.max_lag(), 4);
    }

    #[test]
    fn test_lags_deserialize_forms() {
        let a: LagsSpec = serde_json::from_str("3").unwrap();
        let b: LagsSpec = serde_json::from_str("[1, 2, 3]").unwrap();
        let c: LagsSpec = serde_json::from_str(r#"{"start": 1, "end": 4}"#).unwrap();
        let expected = Lags::new(3i64).unwrap();
        assert_eq!(Lags::new(a).unwrap(), expected);
        assert_eq!(Lags::new(b).unwrap(), expected);
        assert_eq!(Lags::new(c).unwrap(), expected);
    }

    #[test]
    fn test_create_lag_matrix() {
        let values: Vec<f64> = (0..10).map(|v| v as f64).collect();
        let (x, y) = create_lag_matrix("y", &values, &Lags::new(5i64).unwrap()).unwrap();

        assert_eq!(x.shape(), &[5, 5]);
        assert_eq!(x.row(0).to_vec(), vec![4.0, 3.0, 2.0, 1.0, 0.0]);
        assert_eq!(x.row(4).to_vec(), vec![8.0, 7.0, 6.0, 5.0, 4.0]);
        assert_eq!(y.to_vec(), vec![5.0, 6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_create_lag_matrix_series_too_short() {
        let err = create_lag_matrix("l1", &[1.0, 2.0, 3.0], &Lags::new(3i64).unwrap()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The maximum lag (`max_lag`) (3) must be less than the length of the series 'l1', (3)."
        );
    }
}
