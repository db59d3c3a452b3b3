//! Tabular data model
//!
//! Provides the in-memory structures the forecasters consume:
//! - Time indexes (range, integer, datetime with frequency)
//! - Typed columns (float, int, bool, string, categorical)
//! - Frames with dtype-preserving row selection and concatenation

mod column;
mod frame;
mod index;

pub use column::{Categories, Column, ColumnData, DType};
pub use frame::Frame;
pub use index::{Frequency, IndexKind, IndexLabel, TimeIndex};
