//! Error and warning types for lagcast

use std::fmt;
use thiserror::Error;

/// Result type alias for lagcast operations
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Main error type
///
/// `TypeError` and `ValueError` keep the distinction between "wrong kind of
/// input" and "right kind, unacceptable value" that callers match on.
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("{0}")]
    TypeError(String),

    #[error("{0}")]
    ValueError(String),

    #[error("This forecaster is not fitted yet. {0}")]
    NotFitted(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("Data error: {0}")]
    Data(String),

    #[error("Regressor error: {0}")]
    Regressor(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ForecastError {
    pub(crate) fn type_error(msg: impl Into<String>) -> Self {
        ForecastError::TypeError(msg.into())
    }

    pub(crate) fn value_error(msg: impl Into<String>) -> Self {
        ForecastError::ValueError(msg.into())
    }
}

impl From<polars::error::PolarsError> for ForecastError {
    fn from(err: polars::error::PolarsError) -> Self {
        ForecastError::Data(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ForecastError {
    fn from(err: ndarray::ShapeError) -> Self {
        ForecastError::Shape {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

/// Non-fatal conditions raised while building matrices or configuring a
/// forecaster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForecastWarning {
    /// NaNs found (and possibly dropped) in the training data
    MissingValues(String),
    /// An argument was supplied but has no effect
    IgnoredArgument(String),
    /// The input index was replaced by a `RangeIndex`
    IndexOverwritten(String),
}

impl ForecastWarning {
    pub fn message(&self) -> &str {
        match self {
            ForecastWarning::MissingValues(m)
            | ForecastWarning::IgnoredArgument(m)
            | ForecastWarning::IndexOverwritten(m) => m,
        }
    }

    /// Log the warning and hand it back so it can be collected.
    pub(crate) fn emit(self) -> Self {
        tracing::warn!(kind = self.kind(), "{}", self.message());
        self
    }

    fn kind(&self) -> &'static str {
        match self {
            ForecastWarning::MissingValues(_) => "MissingValuesWarning",
            ForecastWarning::IgnoredArgument(_) => "IgnoredArgumentWarning",
            ForecastWarning::IndexOverwritten(_) => "IndexWarning",
        }
    }
}

impl fmt::Display for ForecastWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ForecastError::ValueError("bad value".to_string());
        assert_eq!(err.to_string(), "bad value");

        let err = ForecastError::Data("broken".to_string());
        assert_eq!(err.to_string(), "Data error: broken");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ForecastError = io_err.into();
        assert!(matches!(err, ForecastError::Io(_)));
    }

    #[test]
    fn test_warning_display() {
        let w = ForecastWarning::MissingValues("NaNs detected".to_string());
        assert_eq!(w.message(), "NaNs detected");
        assert_eq!(w.to_string(), "MissingValuesWarning: NaNs detected");
    }
}
