//! Column-wise transformation of exogenous frames

use super::encoder::OneHotEncoder;
use super::scaler::{Scaler, ScalerType};
use crate::data::{Column, Frame};
use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Transformation applied to the selected columns of a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnTransform {
    Scale(ScalerType),
    OneHot,
}

/// Which columns a step applies to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnSelector {
    Names(Vec<String>),
    /// Every float or int column
    AllNumeric,
}

/// One named transformation step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformerStep {
    pub name: String,
    pub transform: ColumnTransform,
    pub columns: ColumnSelector,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum FittedColumn {
    Scaler(Scaler),
    OneHot(OneHotEncoder),
}

/// Applies scalers and encoders to selected columns and passes the rest
/// through unchanged.
///
/// Output order: the outputs of each step in declaration order, then the
/// untouched columns in their input order. Output names are not prefixed by
/// the step name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformer {
    steps: Vec<TransformerStep>,
    #[serde(skip)]
    fitted: Option<Vec<Vec<(String, FittedColumn)>>>,
}

impl ColumnTransformer {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            fitted: None,
        }
    }

    /// Scale every numeric column with the given scaler
    pub fn scale_all(scaler_type: ScalerType) -> Self {
        Self::new().with_step(TransformerStep {
            name: "scale".to_string(),
            transform: ColumnTransform::Scale(scaler_type),
            columns: ColumnSelector::AllNumeric,
        })
    }

    pub fn with_step(mut self, step: TransformerStep) -> Self {
        self.steps.push(step);
        self.fitted = None;
        self
    }

    /// Add a scaling step over the named columns
    pub fn with_scaler(self, name: &str, scaler_type: ScalerType, columns: &[&str]) -> Self {
        self.with_step(TransformerStep {
            name: name.to_string(),
            transform: ColumnTransform::Scale(scaler_type),
            columns: ColumnSelector::Names(columns.iter().map(|c| c.to_string()).collect()),
        })
    }

    /// Add a one-hot step over the named columns
    pub fn with_onehot(self, name: &str, columns: &[&str]) -> Self {
        self.with_step(TransformerStep {
            name: name.to_string(),
            transform: ColumnTransform::OneHot,
            columns: ColumnSelector::Names(columns.iter().map(|c| c.to_string()).collect()),
        })
    }

    pub fn steps(&self) -> &[TransformerStep] {
        &self.steps
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Copy of the configuration without fitted state
    pub fn unfitted(&self) -> Self {
        Self {
            steps: self.steps.clone(),
            fitted: None,
        }
    }

    fn resolve_columns(&self, step: &TransformerStep, frame: &Frame) -> Result<Vec<String>> {
        match &step.columns {
            ColumnSelector::Names(names) => {
                for name in names {
                    frame.column(name).map_err(|_| {
                        ForecastError::value_error(format!(
                            "Column '{}' required by transformer step '{}' is not in the data.",
                            name, step.name
                        ))
                    })?;
                }
                Ok(names.clone())
            }
            ColumnSelector::AllNumeric => Ok(frame
                .columns()
                .iter()
                .filter(|c| c.dtype().is_numeric())
                .map(|c| c.name().to_string())
                .collect()),
        }
    }

    /// Fit every step on `frame`
    pub fn fit(&mut self, frame: &Frame) -> Result<&mut Self> {
        let mut fitted = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let mut step_fitted = Vec::new();
            for name in self.resolve_columns(step, frame)? {
                let column = frame.column(&name)?;
                let state = match &step.transform {
                    ColumnTransform::Scale(kind) => {
                        let mut scaler = Scaler::new(*kind);
                        scaler.fit(&column.to_f64()?)?;
                        FittedColumn::Scaler(scaler)
                    }
                    ColumnTransform::OneHot => {
                        let mut encoder = OneHotEncoder::new();
                        encoder.fit(column)?;
                        FittedColumn::OneHot(encoder)
                    }
                };
                step_fitted.push((name, state));
            }
            fitted.push(step_fitted);
        }
        self.fitted = Some(fitted);
        Ok(self)
    }

    /// Transform `frame` with the fitted steps
    pub fn transform(&self, frame: &Frame) -> Result<Frame> {
        let fitted = self.fitted.as_ref().ok_or_else(|| {
            ForecastError::NotFitted(
                "Call `fit` on the column transformer before `transform`.".to_string(),
            )
        })?;

        let mut consumed: HashMap<&str, ()> = HashMap::new();
        let mut out: Vec<Column> = Vec::new();
        for step_fitted in fitted {
            for (name, state) in step_fitted {
                let column = frame.column(name)?;
                consumed.insert(name.as_str(), ());
                match state {
                    FittedColumn::Scaler(scaler) => {
                        let values = scaler.transform(&column.to_f64()?)?;
                        out.push(Column::float(name.clone(), values));
                    }
                    FittedColumn::OneHot(encoder) => out.extend(encoder.transform(column)?),
                }
            }
        }
        out.extend(
            frame
                .columns()
                .iter()
                .filter(|c| !consumed.contains_key(c.name()))
                .cloned(),
        );

        Frame::new(frame.index().clone(), out)
    }

    pub fn fit_transform(&mut self, frame: &Frame) -> Result<Frame> {
        self.fit(frame)?;
        self.transform(frame)
    }
}

impl Default for ColumnTransformer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exog() -> Frame {
        Frame::with_range_index(vec![
            Column::float("exog_1", vec![1.0, 2.0, 3.0, 4.0]),
            Column::str("exog_2", vec!["a", "a", "b", "b"]),
            Column::bool("exog_3", vec![true, false, true, false]),
        ])
        .unwrap()
    }

    #[test]
    fn test_scale_and_onehot_with_passthrough() {
        let mut transformer = ColumnTransformer::new()
            .with_scaler("scale", ScalerType::Standard, &["exog_1"])
            .with_onehot("onehot", &["exog_2"]);
        let out = transformer.fit_transform(&exog()).unwrap();

        assert_eq!(
            out.column_names(),
            vec!["exog_1", "exog_2_a", "exog_2_b", "exog_3"]
        );
        let scaled = out.values_f64("exog_1").unwrap();
        assert!(scaled.iter().sum::<f64>().abs() < 1e-12);
        assert_eq!(out.values_f64("exog_2_b").unwrap(), vec![0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_scale_all_skips_non_numeric() {
        let mut transformer = ColumnTransformer::scale_all(ScalerType::MinMax);
        let out = transformer.fit_transform(&exog()).unwrap();
        assert_eq!(out.values_f64("exog_1").unwrap(), vec![0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0]);
        assert_eq!(out.column("exog_2").unwrap(), exog().column("exog_2").unwrap());
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let mut transformer = ColumnTransformer::new().with_onehot("onehot", &["nope"]);
        assert!(transformer.fit(&exog()).is_err());
    }

    #[test]
    fn test_transform_before_fit() {
        let transformer = ColumnTransformer::scale_all(ScalerType::Standard);
        assert!(matches!(
            transformer.transform(&exog()),
            Err(ForecastError::NotFitted(_))
        ));
    }
}
