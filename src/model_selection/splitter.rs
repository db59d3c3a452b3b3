//! Expanding-window folds for backtesting

use crate::error::{ForecastError, Result};
use std::ops::Range;
use tracing::info;

/// One train/test partition of a series, as row positions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Range<usize>,
    pub test: Range<usize>,
}

impl Fold {
    pub fn train_size(&self) -> usize {
        self.train.len()
    }

    pub fn test_size(&self) -> usize {
        self.test.len()
    }
}

/// Split `n` observations into expanding training windows followed by test
/// windows of `steps` observations.
///
/// The first training window holds `initial_train_size` observations and
/// every following one grows by `steps`. When `n - initial_train_size` is
/// not a multiple of `steps`, the last fold is shorter; it is kept only if
/// `allow_incomplete_fold` is set.
pub fn time_series_splitter(
    n: usize,
    initial_train_size: usize,
    steps: usize,
    allow_incomplete_fold: bool,
) -> Result<Vec<Fold>> {
    if steps < 1 {
        return Err(ForecastError::value_error(format!(
            "`steps` must be an integer greater than or equal to 1. Got {}.",
            steps
        )));
    }
    if initial_train_size < 1 || initial_train_size >= n {
        return Err(ForecastError::value_error(format!(
            "`initial_train_size` must be greater than 0 and smaller than the length \
             of the series ({}). Got {}.",
            n, initial_train_size
        )));
    }

    let n_test = n - initial_train_size;
    let n_folds = n_test / steps;
    let remainder = n_test % steps;

    let mut folds = Vec::with_capacity(n_folds + 1);
    for fold in 0..n_folds {
        let train_end = initial_train_size + fold * steps;
        folds.push(Fold {
            train: 0..train_end,
            test: train_end..train_end + steps,
        });
    }
    if remainder != 0 && allow_incomplete_fold {
        let train_end = initial_train_size + n_folds * steps;
        folds.push(Fold {
            train: 0..train_end,
            test: train_end..n,
        });
    }

    Ok(folds)
}

/// Log a summary of the folds, one event per fold.
pub(crate) fn log_folds(folds: &[Fold], n: usize, initial_train_size: usize, steps: usize) {
    let remainder = (n - initial_train_size) % steps;
    info!(
        n_observations = n,
        n_folds = folds.len(),
        initial_train_size,
        steps,
        "Number of observations used for initial training or as initial window: {}. \
         Number of observations used for backtesting: {}. Number of folds: {}.",
        initial_train_size,
        n - initial_train_size,
        folds.len()
    );
    if remainder != 0 {
        info!("Last fold only includes {} observations.", remainder);
    }
    for (i, fold) in folds.iter().enumerate() {
        info!(
            fold = i,
            train_start = fold.train.start,
            train_end = fold.train.end,
            test_start = fold.test.start,
            test_end = fold.test.end,
            "Data partition in fold {}: training {}..{}, validation {}..{}",
            i,
            fold.train.start,
            fold.train.end,
            fold.test.start,
            fold.test.end
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_folds() {
        let folds = time_series_splitter(10, 4, 3, true).unwrap();
        assert_eq!(folds.len(), 2);
        assert_eq!(folds[0], Fold { train: 0..4, test: 4..7 });
        assert_eq!(folds[1], Fold { train: 0..7, test: 7..10 });
    }

    #[test]
    fn test_incomplete_last_fold() {
        let folds = time_series_splitter(10, 5, 3, true).unwrap();
        assert_eq!(folds.len(), 2);
        assert_eq!(folds[1].test, 8..10);
        assert_eq!(folds[1].test_size(), 2);

        let folds = time_series_splitter(10, 5, 3, false).unwrap();
        assert_eq!(folds.len(), 1);
        assert_eq!(folds[0].train_size(), 5);
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(time_series_splitter(10, 10, 3, true).is_err());
        assert!(time_series_splitter(10, 0, 3, true).is_err());
        assert!(time_series_splitter(10, 5, 0, true).is_err());
    }
}
