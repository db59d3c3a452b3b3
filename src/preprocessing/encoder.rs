//! One-hot encoding of a single column

use crate::data::{Column, ColumnData};
use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// What to do with a category not seen during `fit`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnknownCategory {
    #[default]
    Error,
    /// Encode as an all-zero row
    Ignore,
}

/// One-hot encoder. Output columns are named `{column}_{category}` and the
/// categories are sorted (numerically when every category is a number).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    handle_unknown: UnknownCategory,
    categories: Option<Vec<String>>,
}

impl Default for OneHotEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self {
            handle_unknown: UnknownCategory::Error,
            categories: None,
        }
    }

    pub fn with_handle_unknown(mut self, handle_unknown: UnknownCategory) -> Self {
        self.handle_unknown = handle_unknown;
        self
    }

    pub fn categories(&self) -> Option<&[String]> {
        self.categories.as_deref()
    }

    /// Learn the categories of `column`
    pub fn fit(&mut self, column: &Column) -> Result<&mut Self> {
        let mut categories: Vec<String> = column.to_labels().into_iter().flatten().collect();
        categories.sort();
        categories.dedup();

        let numeric: Option<Vec<f64>> = categories.iter().map(|c| c.parse::<f64>().ok()).collect();
        if let Some(keys) = numeric {
            let mut keyed: Vec<(f64, String)> = keys.into_iter().zip(categories).collect();
            keyed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
            categories = keyed.into_iter().map(|(_, c)| c).collect();
        }

        self.categories = Some(categories);
        Ok(self)
    }

    /// Encode `column` into one float column per category
    pub fn transform(&self, column: &Column) -> Result<Vec<Column>> {
        let categories = self.categories.as_ref().ok_or_else(|| {
            ForecastError::NotFitted("Call `fit` on the encoder before `transform`.".to_string())
        })?;
        let labels = column.to_labels();

        if self.handle_unknown == UnknownCategory::Error {
            if let Some(unknown) = labels
                .iter()
                .flatten()
                .find(|l| !categories.contains(l))
            {
                return Err(ForecastError::value_error(format!(
                    "Found unknown category '{}' in column '{}' during transform.",
                    unknown,
                    column.name()
                )));
            }
        }

        Ok(categories
            .iter()
            .map(|cat| {
                let values = labels
                    .iter()
                    .map(|l| if l.as_deref() == Some(cat.as_str()) { 1.0 } else { 0.0 })
                    .collect();
                Column::new(format!("{}_{}", column.name(), cat), ColumnData::Float(values))
            })
            .collect())
    }

    pub fn fit_transform(&mut self, column: &Column) -> Result<Vec<Column>> {
        self.fit(column)?;
        self.transform(column)
    }

    /// Names of the columns `transform` produces for `column_name`
    pub fn feature_names_out(&self, column_name: &str) -> Vec<String> {
        self.categories
            .iter()
            .flatten()
            .map(|c| format!("{}_{}", column_name, c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_onehot_sorted_categories() {
        let col = Column::str("exog_2", vec!["b", "a", "b", "a"]);
        let mut encoder = OneHotEncoder::new();
        let out = encoder.fit_transform(&col).unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].name(), "exog_2_a");
        assert_eq!(out[1].name(), "exog_2_b");
        assert_eq!(out[0].to_f64().unwrap(), vec![0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_onehot_numeric_order() {
        let col = Column::int("x", vec![10, 9, 100]);
        let mut encoder = OneHotEncoder::new();
        encoder.fit(&col).unwrap();
        assert_eq!(encoder.feature_names_out("x"), vec!["x_9", "x_10", "x_100"]);
    }

    #[test]
    fn test_onehot_unknown_category() {
        let mut encoder = OneHotEncoder::new();
        encoder.fit(&Column::str("x", vec!["a"])).unwrap();
        assert!(encoder.transform(&Column::str("x", vec!["z"])).is_err());

        let encoder = encoder.with_handle_unknown(UnknownCategory::Ignore);
        let out = encoder.transform(&Column::str("x", vec!["z"])).unwrap();
        assert_eq!(out[0].to_f64().unwrap(), vec![0.0]);
    }
}
