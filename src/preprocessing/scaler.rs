//! Series scaling implementations

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Type of scaler to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalerType {
    /// Standard scaling (z-score normalization): (x - mean) / std
    Standard,
    /// Min-Max scaling: (x - min) / (max - min)
    MinMax,
    /// Robust scaling using median and IQR
    Robust,
    /// Max absolute scaling: x / max(|x|)
    MaxAbs,
    /// No scaling
    None,
}

/// Parameters for a fitted scaler
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct ScalerParams {
    center: f64, // mean, min, or median
    scale: f64,  // std, range, or IQR
}

/// Scaler for a single sequence of values.
///
/// Missing values (NaN) are ignored while fitting and left as NaN by
/// `transform`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    scaler_type: ScalerType,
    params: Option<ScalerParams>,
}

impl Scaler {
    /// Create a new, unfitted scaler
    pub fn new(scaler_type: ScalerType) -> Self {
        Self {
            scaler_type,
            params: None,
        }
    }

    pub fn standard() -> Self {
        Self::new(ScalerType::Standard)
    }

    pub fn min_max() -> Self {
        Self::new(ScalerType::MinMax)
    }

    pub fn scaler_type(&self) -> ScalerType {
        self.scaler_type
    }

    pub fn is_fitted(&self) -> bool {
        self.params.is_some()
    }

    /// Copy of this scaler without its fitted parameters
    pub fn unfitted(&self) -> Self {
        Self::new(self.scaler_type)
    }

    /// Fit the scaler to the values
    pub fn fit(&mut self, values: &[f64]) -> Result<&mut Self> {
        self.params = Some(self.compute_params(values)?);
        Ok(self)
    }

    /// Transform the values
    pub fn transform(&self, values: &[f64]) -> Result<Vec<f64>> {
        let params = self.params.ok_or_else(|| {
            ForecastError::NotFitted("Call `fit` on the scaler before `transform`.".to_string())
        })?;
        Ok(values
            .iter()
            .map(|v| (v - params.center) / params.scale)
            .collect())
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, values: &[f64]) -> Result<Vec<f64>> {
        self.fit(values)?;
        self.transform(values)
    }

    /// Inverse transform the values
    pub fn inverse_transform(&self, values: &[f64]) -> Result<Vec<f64>> {
        let params = self.params.ok_or_else(|| {
            ForecastError::NotFitted(
                "Call `fit` on the scaler before `inverse_transform`.".to_string(),
            )
        })?;
        Ok(values
            .iter()
            .map(|v| v * params.scale + params.center)
            .collect())
    }

    fn compute_params(&self, values: &[f64]) -> Result<ScalerParams> {
        let valid: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        if valid.is_empty() && self.scaler_type != ScalerType::None {
            return Err(ForecastError::value_error(
                "Cannot fit a scaler on values that are all missing.",
            ));
        }
        let n = valid.len() as f64;

        let params = match self.scaler_type {
            ScalerType::Standard => {
                let mean = valid.iter().sum::<f64>() / n;
                // population std (ddof = 0)
                let var = valid.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                let std = var.sqrt();
                ScalerParams {
                    center: mean,
                    scale: if std == 0.0 { 1.0 } else { std },
                }
            }
            ScalerType::MinMax => {
                let min = valid.iter().copied().fold(f64::INFINITY, f64::min);
                let max = valid.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let range = max - min;
                ScalerParams {
                    center: min,
                    scale: if range == 0.0 { 1.0 } else { range },
                }
            }
            ScalerType::Robust => {
                let mut sorted = valid.clone();
                sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                let median = quantile(&sorted, 0.5);
                let iqr = quantile(&sorted, 0.75) - quantile(&sorted, 0.25);
                ScalerParams {
                    center: median,
                    scale: if iqr == 0.0 { 1.0 } else { iqr },
                }
            }
            ScalerType::MaxAbs => {
                let max_abs = valid.iter().fold(0.0f64, |a, b| a.max(b.abs()));
                ScalerParams {
                    center: 0.0,
                    scale: if max_abs == 0.0 { 1.0 } else { max_abs },
                }
            }
            ScalerType::None => ScalerParams {
                center: 0.0,
                scale: 1.0,
            },
        };
        Ok(params)
    }
}

/// Linear-interpolated quantile of sorted values
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_scaler() {
        let mut scaler = Scaler::standard();
        let result = scaler.fit_transform(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();

        // mean 3, population std 2
        let expected = [-1.5, -1.0, -0.5, 0.0, 0.5, 1.0, 1.5];
        for (r, e) in result.iter().zip(expected.iter()) {
            assert!((r - e).abs() < 1e-12);
        }
    }

    #[test]
    fn test_standard_scaler_ignores_nan() {
        let mut scaler = Scaler::standard();
        let result = scaler.fit_transform(&[f64::NAN, 1.0, 3.0]).unwrap();
        assert!(result[0].is_nan());
        assert!((result[1] + 1.0).abs() < 1e-12);
        assert!((result[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_minmax_scaler() {
        let mut scaler = Scaler::min_max();
        let result = scaler.fit_transform(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!((result[0] - 0.0).abs() < 1e-10);
        assert!((result[4] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_inverse_transform() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        for kind in [ScalerType::Standard, ScalerType::MinMax, ScalerType::Robust, ScalerType::MaxAbs] {
            let mut scaler = Scaler::new(kind);
            let scaled = scaler.fit_transform(&values).unwrap();
            let restored = scaler.inverse_transform(&scaled).unwrap();
            for (o, r) in values.iter().zip(restored.iter()) {
                assert!((o - r).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn test_transform_before_fit() {
        let scaler = Scaler::standard();
        assert!(matches!(
            scaler.transform(&[1.0]),
            Err(ForecastError::NotFitted(_))
        ));
    }
}
