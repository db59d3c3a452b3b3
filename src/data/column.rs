//! Typed columns

use crate::error::{ForecastError, Result};
use std::fmt;

/// Category values of a categorical column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Categories {
    Int(Vec<i64>),
    Str(Vec<String>),
}

impl Categories {
    pub fn len(&self) -> usize {
        match self {
            Categories::Int(v) => v.len(),
            Categories::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Categories::Int(_))
    }

    fn label(&self, code: u32) -> Option<String> {
        match self {
            Categories::Int(v) => v.get(code as usize).map(|c| c.to_string()),
            Categories::Str(v) => v.get(code as usize).cloned(),
        }
    }
}

/// Column dtype. A categorical dtype includes its categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DType {
    Float,
    Int,
    Bool,
    Str,
    Categorical(Categories),
}

impl DType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, DType::Float | DType::Int)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::Float => f.write_str("float64"),
            DType::Int => f.write_str("int64"),
            DType::Bool => f.write_str("bool"),
            DType::Str => f.write_str("object"),
            DType::Categorical(_) => f.write_str("category"),
        }
    }
}

/// Column storage
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// NaN marks a missing value
    Float(Vec<f64>),
    Int(Vec<i64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
    /// `None` marks a missing value
    Categorical {
        codes: Vec<Option<u32>>,
        categories: Categories,
    },
}

/// A named column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn float(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::new(name, ColumnData::Float(values))
    }

    pub fn int(name: impl Into<String>, values: Vec<i64>) -> Self {
        Self::new(name, ColumnData::Int(values))
    }

    pub fn bool(name: impl Into<String>, values: Vec<bool>) -> Self {
        Self::new(name, ColumnData::Bool(values))
    }

    pub fn str<S: Into<String>>(name: impl Into<String>, values: Vec<S>) -> Self {
        Self::new(
            name,
            ColumnData::Str(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Categorical column whose categories are the sorted distinct values
    pub fn categorical_int(name: impl Into<String>, values: &[i64]) -> Self {
        let mut categories = values.to_vec();
        categories.sort_unstable();
        categories.dedup();
        Self::categorical_int_with_categories(name, values, categories)
    }

    /// Categorical column with explicit integer categories. Values outside
    /// `categories` become missing.
    pub fn categorical_int_with_categories(
        name: impl Into<String>,
        values: &[i64],
        categories: Vec<i64>,
    ) -> Self {
        let codes = values
            .iter()
            .map(|v| categories.iter().position(|c| c == v).map(|p| p as u32))
            .collect();
        Self::new(
            name,
            ColumnData::Categorical {
                codes,
                categories: Categories::Int(categories),
            },
        )
    }

    /// Categorical column of string values
    pub fn categorical_str<S: AsRef<str>>(name: impl Into<String>, values: &[S]) -> Self {
        let mut categories: Vec<String> = values.iter().map(|v| v.as_ref().to_string()).collect();
        categories.sort();
        categories.dedup();
        let codes = values
            .iter()
            .map(|v| {
                categories
                    .iter()
                    .position(|c| c == v.as_ref())
                    .map(|p| p as u32)
            })
            .collect();
        Self::new(
            name,
            ColumnData::Categorical {
                codes,
                categories: Categories::Str(categories),
            },
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn into_data(self) -> ColumnData {
        self.data
    }

    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Float(v) => v.len(),
            ColumnData::Int(v) => v.len(),
            ColumnData::Bool(v) => v.len(),
            ColumnData::Str(v) => v.len(),
            ColumnData::Categorical { codes, .. } => codes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> DType {
        match &self.data {
            ColumnData::Float(_) => DType::Float,
            ColumnData::Int(_) => DType::Int,
            ColumnData::Bool(_) => DType::Bool,
            ColumnData::Str(_) => DType::Str,
            ColumnData::Categorical { categories, .. } => DType::Categorical(categories.clone()),
        }
    }

    /// Whether the value at `row` is missing
    pub fn is_missing(&self, row: usize) -> bool {
        match &self.data {
            ColumnData::Float(v) => v.get(row).map_or(false, |x| x.is_nan()),
            ColumnData::Categorical { codes, .. } => codes.get(row).map_or(false, Option::is_none),
            _ => false,
        }
    }

    pub fn has_missing(&self) -> bool {
        (0..self.len()).any(|i| self.is_missing(i))
    }

    /// Rows at `positions`, keeping the dtype (and categories)
    pub fn take(&self, positions: &[usize]) -> Column {
        fn pick<T: Clone>(v: &[T], positions: &[usize]) -> Vec<T> {
            positions.iter().map(|&p| v[p].clone()).collect()
        }
        let data = match &self.data {
            ColumnData::Float(v) => ColumnData::Float(pick(v, positions)),
            ColumnData::Int(v) => ColumnData::Int(pick(v, positions)),
            ColumnData::Bool(v) => ColumnData::Bool(pick(v, positions)),
            ColumnData::Str(v) => ColumnData::Str(pick(v, positions)),
            ColumnData::Categorical { codes, categories } => ColumnData::Categorical {
                codes: pick(codes, positions),
                categories: categories.clone(),
            },
        };
        Column::new(self.name.clone(), data)
    }

    /// Append rows of a column with the same dtype
    pub fn append(&mut self, other: &Column) -> Result<()> {
        let appended = match (&mut self.data, &other.data) {
            (ColumnData::Float(a), ColumnData::Float(b)) => {
                a.extend_from_slice(b);
                true
            }
            (ColumnData::Int(a), ColumnData::Int(b)) => {
                a.extend_from_slice(b);
                true
            }
            (ColumnData::Bool(a), ColumnData::Bool(b)) => {
                a.extend_from_slice(b);
                true
            }
            (ColumnData::Str(a), ColumnData::Str(b)) => {
                a.extend(b.iter().cloned());
                true
            }
            (
                ColumnData::Categorical { codes: a, categories: ca },
                ColumnData::Categorical { codes: b, categories: cb },
            ) if *ca == *cb => {
                a.extend_from_slice(b);
                true
            }
            _ => false,
        };
        if !appended {
            return Err(ForecastError::type_error(format!(
                "Cannot concatenate column '{}' of dtype {} with dtype {}.",
                self.name,
                self.dtype(),
                other.dtype()
            )));
        }
        Ok(())
    }

    /// Numeric view of the column: bool as 0/1, categorical as its integer
    /// category value. String data has no numeric view.
    pub fn to_f64(&self) -> Result<Vec<f64>> {
        match &self.data {
            ColumnData::Float(v) => Ok(v.clone()),
            ColumnData::Int(v) => Ok(v.iter().map(|&x| x as f64).collect()),
            ColumnData::Bool(v) => Ok(v.iter().map(|&x| if x { 1.0 } else { 0.0 }).collect()),
            ColumnData::Categorical {
                codes,
                categories: Categories::Int(cats),
            } => Ok(codes
                .iter()
                .map(|c| c.map_or(f64::NAN, |c| cats[c as usize] as f64))
                .collect()),
            ColumnData::Categorical { .. } | ColumnData::Str(_) => Err(ForecastError::type_error(
                format!(
                    "Column '{}' of dtype {} cannot be used as a numeric feature. \
                     Encode it with `transformer_exog`.",
                    self.name,
                    self.dtype()
                ),
            )),
        }
    }

    /// String view of each value, used by encoders. Missing values are `None`.
    pub fn to_labels(&self) -> Vec<Option<String>> {
        match &self.data {
            ColumnData::Float(v) => v
                .iter()
                .map(|x| (!x.is_nan()).then(|| x.to_string()))
                .collect(),
            ColumnData::Int(v) => v.iter().map(|x| Some(x.to_string())).collect(),
            ColumnData::Bool(v) => v
                .iter()
                .map(|x| Some(if *x { "True" } else { "False" }.to_string()))
                .collect(),
            ColumnData::Str(v) => v.iter().cloned().map(Some).collect(),
            ColumnData::Categorical { codes, categories } => codes
                .iter()
                .map(|c| c.and_then(|c| categories.label(c)))
                .collect(),
        }
    }
}
