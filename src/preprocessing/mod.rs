//! Data preprocessing module
//!
//! Transformers applied before lag construction:
//! - Series scaling (StandardScaler, MinMaxScaler, RobustScaler, MaxAbsScaler)
//! - One-hot encoding of categorical exogenous columns
//! - Column-wise transformation of exogenous frames

mod column_transformer;
mod encoder;
mod scaler;

pub use column_transformer::{ColumnSelector, ColumnTransform, ColumnTransformer, TransformerStep};
pub use encoder::{OneHotEncoder, UnknownCategory};
pub use scaler::{Scaler, ScalerType};
