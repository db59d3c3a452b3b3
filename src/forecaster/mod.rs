//! Forecasters built on lagged features
//!
//! - [`ForecasterMultiSeries`] - one recursive model shared by many series
//! - [`ForecasterMultiVariate`] - direct models for one series using the lags of many
//! - [`ForecasterDirect`] - direct models for a single series

mod direct;
mod lags;
mod matrix;
mod multiseries;

pub use direct::{DirectTrainingMatrices, ForecasterDirect, ForecasterMultiVariate, WeightFunc};
pub use lags::{create_lag_matrix, Lags, LagsSpec};
pub use matrix::TrainingMatrices;
pub use multiseries::{ForecasterMultiSeries, TransformerSeries};
