//! Training matrices and the missing-value policy applied to them

use crate::data::{DType, Frame, TimeIndex};
use crate::error::{ForecastError, ForecastWarning, Result};
use ndarray::{Array1, Array2};
use std::collections::HashMap;

/// Output of `create_train_x_y`
#[derive(Debug, Clone)]
pub struct TrainingMatrices {
    /// Feature matrix with a fresh `RangeIndex`
    pub x_train: Frame,
    pub y_train: Vec<f64>,
    /// Original label of every row of `x_train`
    pub train_index: TimeIndex,
    /// Index of each series after trimming leading and trailing NaNs
    pub series_indexes: HashMap<String, TimeIndex>,
    pub series_col_names: Vec<String>,
    pub exog_col_names: Option<Vec<String>>,
    pub exog_dtypes: Option<Vec<(String, DType)>>,
    pub warnings: Vec<ForecastWarning>,
}

impl TrainingMatrices {
    pub fn n_rows(&self) -> usize {
        self.y_train.len()
    }

    pub fn x_array(&self) -> Result<Array2<f64>> {
        self.x_train.to_array()
    }

    pub fn y_array(&self) -> Array1<f64> {
        Array1::from_vec(self.y_train.clone())
    }
}

/// Remove rows with a NaN target, then handle NaNs in the features.
///
/// Returns the surviving rows of `x`, `y` and `train_index`. Any warning
/// raised is pushed to `warnings`.
pub(crate) fn apply_nan_policy(
    x: Frame,
    y: Vec<f64>,
    train_index: TimeIndex,
    drop_nan: bool,
    warnings: &mut Vec<ForecastWarning>,
) -> Result<(Frame, Vec<f64>, TimeIndex)> {
    let (mut x, mut y, mut train_index) = (x, y, train_index);

    if y.iter().any(|v| v.is_nan()) {
        let keep: Vec<usize> = (0..y.len()).filter(|&i| !y[i].is_nan()).collect();
        warnings.push(
            ForecastWarning::MissingValues(
                "NaNs detected in `y_train`. They have been dropped because the target \
                 variable cannot have NaN values. Same rows have been dropped from \
                 `X_train` to maintain alignment. This is caused by series with \
                 interspersed NaNs."
                    .to_string(),
            )
            .emit(),
        );
        (x, y, train_index) = keep_rows(&x, &y, &train_index, &keep)?;
    }

    let missing = x.rows_with_missing();
    if !missing.is_empty() {
        if drop_nan {
            let keep: Vec<usize> = (0..y.len())
                .filter(|i| missing.binary_search(i).is_err())
                .collect();
            if keep.is_empty() {
                return Err(ForecastError::value_error(
                    "All rows of `X_train` contain NaNs. No training samples remain \
                     after dropping them.",
                ));
            }
            warnings.push(
                ForecastWarning::MissingValues(
                    "NaNs detected in `X_train`. They have been dropped. If you want to \
                     keep them, set `drop_nan = False`."
                        .to_string(),
                )
                .emit(),
            );
            (x, y, train_index) = keep_rows(&x, &y, &train_index, &keep)?;
        } else {
            warnings.push(
                ForecastWarning::MissingValues(
                    "NaNs detected in `X_train`. Some regressor do not allow NaN values \
                     during training. If you want to drop them, set `drop_nan = True`."
                        .to_string(),
                )
                .emit(),
            );
        }
    }

    Ok((x, y, train_index))
}

fn keep_rows(
    x: &Frame,
    y: &[f64],
    train_index: &TimeIndex,
    keep: &[usize],
) -> Result<(Frame, Vec<f64>, TimeIndex)> {
    let x = x
        .take_rows(keep)?
        .set_index(TimeIndex::range(0, keep.len() as i64))?;
    let y = keep.iter().map(|&i| y[i]).collect();
    Ok((x, y, train_index.take(keep)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Column;

    fn frame(values: Vec<f64>) -> Frame {
        Frame::with_range_index(vec![Column::float("lag_1", values)]).unwrap()
    }

    #[test]
    fn test_nan_target_rows_always_dropped() {
        let mut warnings = Vec::new();
        let (x, y, index) = apply_nan_policy(
            frame(vec![1.0, 2.0, 3.0]),
            vec![1.0, f64::NAN, 3.0],
            TimeIndex::range(5, 8),
            false,
            &mut warnings,
        )
        .unwrap();

        assert_eq!(y, vec![1.0, 3.0]);
        assert_eq!(x.values_f64("lag_1").unwrap(), vec![1.0, 3.0]);
        assert_eq!(x.index(), &TimeIndex::range(0, 2));
        assert_eq!(index, TimeIndex::Int(vec![5, 7]));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_nan_features_warn_or_drop() {
        let mut warnings = Vec::new();
        let (x, _, _) = apply_nan_policy(
            frame(vec![f64::NAN, 2.0]),
            vec![1.0, 2.0],
            TimeIndex::range(0, 2),
            false,
            &mut warnings,
        )
        .unwrap();
        assert_eq!(x.height(), 2);
        assert!(warnings[0].message().contains("set `drop_nan = True`"));

        let mut warnings = Vec::new();
        let (x, y, _) = apply_nan_policy(
            frame(vec![f64::NAN, 2.0]),
            vec![1.0, 2.0],
            TimeIndex::range(0, 2),
            true,
            &mut warnings,
        )
        .unwrap();
        assert_eq!(x.height(), 1);
        assert_eq!(y, vec![2.0]);
    }

    #[test]
    fn test_all_rows_dropped_is_an_error() {
        let mut warnings = Vec::new();
        let result = apply_nan_policy(
            frame(vec![f64::NAN]),
            vec![1.0],
            TimeIndex::range(0, 1),
            true,
            &mut warnings,
        );
        assert!(result.is_err());
    }
}
