//! K-Nearest Neighbors regressor

use super::{check_fit_input, Regressor};
use crate::error::{ForecastError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Distance metric for KNN
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Euclidean distance (L2)
    #[default]
    Euclidean,
    /// Manhattan distance (L1)
    Manhattan,
}

/// Weighting scheme for neighbors
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum WeightScheme {
    /// All neighbors have equal weight
    #[default]
    Uniform,
    /// Closer neighbors have more weight (inverse distance)
    Distance,
}

/// K-Nearest Neighbors regressor. Does not support sample weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNeighborsRegressor {
    n_neighbors: usize,
    metric: DistanceMetric,
    weights: WeightScheme,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<f64>>,
}

impl Default for KNeighborsRegressor {
    fn default() -> Self {
        Self::new(5)
    }
}

impl KNeighborsRegressor {
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors,
            metric: DistanceMetric::Euclidean,
            weights: WeightScheme::Uniform,
            x_train: None,
            y_train: None,
        }
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_weights(mut self, weights: WeightScheme) -> Self {
        self.weights = weights;
        self
    }
}

impl Regressor for KNeighborsRegressor {
    fn name(&self) -> &str {
        "KNeighborsRegressor"
    }

    /// Stores the training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        if self.n_neighbors == 0 || self.n_neighbors > x.nrows() {
            return Err(ForecastError::value_error(format!(
                "Expected 0 < n_neighbors <= n_samples, but n_samples = {}, n_neighbors = {}",
                x.nrows(),
                self.n_neighbors
            )));
        }
        self.x_train = Some(x.clone());
        self.y_train = Some(y.clone());
        Ok(())
    }

    /// Predict target values (parallelized over rows)
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (x_train, y_train) = match (&self.x_train, &self.y_train) {
            (Some(x_train), Some(y_train)) => (x_train, y_train),
            _ => {
                return Err(ForecastError::NotFitted(
                    "Call `fit` on KNeighborsRegressor first.".to_string(),
                ))
            }
        };
        if x.ncols() != x_train.ncols() {
            return Err(ForecastError::Shape {
                expected: format!("{} features", x_train.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let predictions: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let neighbors = find_k_nearest(x.row(i), x_train, y_train, self.n_neighbors, self.metric);
                weighted_mean(&neighbors, self.weights)
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }
}

/// Max-heap entry keeping the k smallest distances
#[derive(PartialEq)]
struct DistTarget(f64, f64);

impl Eq for DistTarget {}
impl PartialOrd for DistTarget {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DistTarget {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
    }
}

fn find_k_nearest(
    point: ArrayView1<f64>,
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    k: usize,
    metric: DistanceMetric,
) -> Vec<(f64, f64)> {
    let mut heap = BinaryHeap::with_capacity(k + 1);
    for (row, &target) in x_train.rows().into_iter().zip(y_train.iter()) {
        let dist = distance(point, row, metric);
        if heap.len() < k {
            heap.push(DistTarget(dist, target));
        } else if let Some(top) = heap.peek() {
            if dist < top.0 {
                heap.pop();
                heap.push(DistTarget(dist, target));
            }
        }
    }
    heap.into_iter().map(|d| (d.0, d.1)).collect()
}

fn distance(a: ArrayView1<f64>, b: ArrayView1<f64>, metric: DistanceMetric) -> f64 {
    match metric {
        DistanceMetric::Euclidean => a
            .iter()
            .zip(b.iter())
            .map(|(ai, bi)| (ai - bi) * (ai - bi))
            .sum::<f64>()
            .sqrt(),
        DistanceMetric::Manhattan => a.iter().zip(b.iter()).map(|(ai, bi)| (ai - bi).abs()).sum(),
    }
}

fn weighted_mean(neighbors: &[(f64, f64)], weights: WeightScheme) -> f64 {
    let mut total = 0.0;
    let mut weight_sum = 0.0;
    for &(dist, target) in neighbors {
        let w = match weights {
            WeightScheme::Uniform => 1.0,
            WeightScheme::Distance => 1.0 / (dist + 1e-10),
        };
        total += w * target;
        weight_sum += w;
    }
    if weight_sum > 0.0 {
        total / weight_sum
    } else {
        f64::NAN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_knn_regressor() {
        let x = array![[0.0], [1.0], [2.0], [10.0], [11.0]];
        let y = array![1.0, 1.0, 1.0, 5.0, 5.0];
        let mut knn = KNeighborsRegressor::new(2);
        knn.fit(&x, &y).unwrap();

        let pred = knn.predict(&array![[0.5], [10.5]]).unwrap();
        assert!((pred[0] - 1.0).abs() < 1e-12);
        assert!((pred[1] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_knn_rejects_sample_weight() {
        let mut knn = KNeighborsRegressor::default();
        assert!(!knn.accepts_sample_weight());
        let x = array![[0.0]];
        let y = array![1.0];
        assert!(knn.fit_weighted(&x, &y, &array![1.0]).is_err());
    }

    #[test]
    fn test_knn_too_many_neighbors() {
        let mut knn = KNeighborsRegressor::new(3);
        assert!(knn.fit(&array![[0.0], [1.0]], &array![0.0, 1.0]).is_err());
    }
}
