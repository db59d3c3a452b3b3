//! Ordinary least squares

use super::{check_fit_input, Regressor};
use crate::error::{ForecastError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Solve the symmetric positive-definite system `a x = b` by Cholesky
/// decomposition. Returns `None` when `a` is not (numerically) positive
/// definite.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    // A = L * L^T
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if !diag.is_finite() || diag <= 1e-10 * a[[i, i]].abs() {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L * y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // L^T * x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Solve the normal equations, adding a tiny ridge when `xtx` is singular
/// (e.g. collinear one-hot columns).
fn solve_normal_equations(xtx: &Array2<f64>, xty: &Array1<f64>) -> Result<Array1<f64>> {
    if let Some(coef) = cholesky_solve(xtx, xty) {
        return Ok(coef);
    }

    let n = xtx.nrows();
    let trace = xtx.diag().iter().map(|v| v.abs()).sum::<f64>();
    let ridge = (1e-8 * trace / n.max(1) as f64).max(1e-12);
    let mut regularized = xtx.clone();
    for k in 0..n {
        regularized[[k, k]] += ridge;
    }
    cholesky_solve(&regularized, xty).ok_or_else(|| {
        ForecastError::Regressor("Matrix is singular, cannot solve least squares".to_string())
    })
}

/// Linear regression with intercept, fitted by (optionally weighted) least
/// squares.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    /// Fitted coefficients
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept
    pub intercept: Option<f64>,
    /// Whether to fit intercept
    pub fit_intercept: bool,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegression {
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            fit_intercept: true,
        }
    }

    /// Enable/disable fitting intercept
    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }

    fn fit_inner(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        weights: Option<&Array1<f64>>,
    ) -> Result<()> {
        check_fit_input(x, y)?;
        let w = match weights {
            Some(w) => {
                if w.len() != y.len() {
                    return Err(ForecastError::Shape {
                        expected: format!("sample_weight length = {}", y.len()),
                        actual: format!("sample_weight length = {}", w.len()),
                    });
                }
                if w.iter().any(|v| *v < 0.0 || !v.is_finite()) || w.sum() <= 0.0 {
                    return Err(ForecastError::value_error(
                        "`sample_weight` must be finite, non-negative and not all zero.",
                    ));
                }
                w.clone()
            }
            None => Array1::ones(y.len()),
        };
        let w_sum = w.sum();

        // Center on the weighted means when fitting an intercept
        let (x_mean, y_mean) = if self.fit_intercept {
            let wx = x * &w.view().insert_axis(Axis(1));
            (wx.sum_axis(Axis(0)) / w_sum, w.dot(y) / w_sum)
        } else {
            (Array1::zeros(x.ncols()), 0.0)
        };
        let x_centered = x - &x_mean.view().insert_axis(Axis(0));
        let y_centered = y - y_mean;

        // (X^T W X) b = X^T W y
        let xw = &x_centered * &w.view().insert_axis(Axis(1));
        let xtx = xw.t().dot(&x_centered);
        let xty = xw.t().dot(&y_centered);
        let coefficients = solve_normal_equations(&xtx, &xty)?;

        self.intercept = Some(if self.fit_intercept {
            y_mean - coefficients.dot(&x_mean)
        } else {
            0.0
        });
        self.coefficients = Some(coefficients);
        Ok(())
    }
}

impl Regressor for LinearRegression {
    fn name(&self) -> &str {
        "LinearRegression"
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.fit_inner(x, y, None)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or_else(|| {
            ForecastError::NotFitted("Call `fit` on LinearRegression first.".to_string())
        })?;
        if x.ncols() != coefficients.len() {
            return Err(ForecastError::Shape {
                expected: format!("{} features", coefficients.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x.dot(coefficients) + self.intercept.unwrap_or(0.0))
    }

    fn accepts_sample_weight(&self) -> bool {
        true
    }

    fn fit_weighted(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        sample_weight: &Array1<f64>,
    ) -> Result<()> {
        self.fit_inner(x, y, Some(sample_weight))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_linear_regression_exact_fit() {
        // y = 2*x1 + 3*x2 + 1
        let x = array![[1.0, 2.0], [2.0, 1.0], [3.0, 4.0], [4.0, 3.0], [5.0, 5.0]];
        let y = array![9.0, 8.0, 19.0, 18.0, 26.0];

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let coef = model.coefficients.as_ref().unwrap();
        assert!((coef[0] - 2.0).abs() < 1e-8);
        assert!((coef[1] - 3.0).abs() < 1e-8);
        assert!((model.intercept.unwrap() - 1.0).abs() < 1e-8);

        let pred = model.predict(&array![[6.0, 6.0]]).unwrap();
        assert!((pred[0] - 31.0).abs() < 1e-8);
    }

    #[test]
    fn test_weighted_fit_ignores_zero_weight_rows() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        // Last point is an outlier with zero weight
        let y = array![1.0, 3.0, 5.0, 100.0];
        let w = array![1.0, 1.0, 1.0, 0.0];

        let mut model = LinearRegression::new();
        model.fit_weighted(&x, &y, &w).unwrap();
        let coef = model.coefficients.as_ref().unwrap();
        assert!((coef[0] - 2.0).abs() < 1e-8);
        assert!((model.intercept.unwrap() - 1.0).abs() < 1e-8);
    }

    #[test]
    fn test_collinear_columns_still_solve() {
        // Two complementary indicator columns plus a feature
        let x = array![[1.0, 1.0, 0.0], [2.0, 1.0, 0.0], [1.0, 0.0, 1.0], [2.0, 0.0, 1.0]];
        let y = array![1.0, 2.0, 1.0, 2.0];
        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&x).unwrap();
        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-4);
        }
    }

    #[test]
    fn test_predict_before_fit() {
        let model = LinearRegression::new();
        assert!(matches!(
            model.predict(&array![[1.0]]),
            Err(ForecastError::NotFitted(_))
        ));
    }
}
