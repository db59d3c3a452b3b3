//! Column-oriented table with a time index

use super::column::{Column, DType};
use super::index::{IndexKind, IndexLabel, TimeIndex};
use crate::error::{ForecastError, Result};
use ndarray::Array2;
use std::collections::BTreeSet;

/// Ordered set of equally long columns sharing one [`TimeIndex`]
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    index: TimeIndex,
    columns: Vec<Column>,
}

impl Frame {
    /// Build a frame, checking column lengths and name uniqueness
    pub fn new(index: TimeIndex, columns: Vec<Column>) -> Result<Self> {
        let n = index.len();
        for col in &columns {
            if col.len() != n {
                return Err(ForecastError::Shape {
                    expected: format!("{} rows in column '{}'", n, col.name()),
                    actual: col.len().to_string(),
                });
            }
        }
        let mut seen = BTreeSet::new();
        for col in &columns {
            if !seen.insert(col.name()) {
                return Err(ForecastError::value_error(format!(
                    "Duplicated column name '{}'.",
                    col.name()
                )));
            }
        }
        Ok(Self { index, columns })
    }

    /// Frame with a `RangeIndex` starting at 0
    pub fn with_range_index(columns: Vec<Column>) -> Result<Self> {
        let n = columns.first().map_or(0, Column::len);
        Self::new(TimeIndex::range(0, n as i64), columns)
    }

    /// Outer-align independently indexed float series into one frame.
    ///
    /// Every series must use the same index family; datetime series must also
    /// share the same frequency. Gaps are filled with NaN.
    pub fn from_series(series: Vec<(String, TimeIndex, Vec<f64>)>) -> Result<Self> {
        let Some((_, first_index, _)) = series.first() else {
            return Self::new(TimeIndex::range(0, 0), Vec::new());
        };
        let is_datetime = first_index.kind() == IndexKind::Datetime;
        let freq = first_index.freq();

        for (name, index, values) in &series {
            if index.len() != values.len() {
                return Err(ForecastError::Shape {
                    expected: format!("{} values for series '{}'", index.len(), name),
                    actual: values.len().to_string(),
                });
            }
            if (index.kind() == IndexKind::Datetime) != is_datetime {
                return Err(ForecastError::type_error(format!(
                    "All series must have the same index type. Series '{}' has a {} \
                     while the first series has a {}.",
                    name,
                    index.kind(),
                    first_index.kind()
                )));
            }
            if is_datetime && index.freq() != freq {
                return Err(ForecastError::value_error(format!(
                    "All series must have the same frequency. Series '{}' has {:?}, \
                     expected {:?}.",
                    name,
                    index.freq(),
                    freq
                )));
            }
        }

        let labels: BTreeSet<IndexLabel> = series
            .iter()
            .flat_map(|(_, index, _)| index.labels())
            .collect();
        let labels: Vec<IndexLabel> = labels.into_iter().collect();

        let index = if is_datetime {
            let values: Vec<_> = labels
                .iter()
                .filter_map(|l| match l {
                    IndexLabel::Datetime(dt) => Some(*dt),
                    IndexLabel::Int(_) => None,
                })
                .collect();
            match (freq, values.first()) {
                (Some(f), Some(&start)) => {
                    let end = *values.last().unwrap_or(&start);
                    TimeIndex::date_range(start, f.steps_between(start, end) + 1, f)?
                }
                _ => TimeIndex::Datetime { values, freq: None },
            }
        } else {
            let values: Vec<i64> = labels
                .iter()
                .filter_map(|l| match l {
                    IndexLabel::Int(v) => Some(*v),
                    IndexLabel::Datetime(_) => None,
                })
                .collect();
            let contiguous = values.windows(2).all(|w| w[1] - w[0] == 1);
            match values.first() {
                Some(&start) if contiguous => TimeIndex::range(start, start + values.len() as i64),
                _ => TimeIndex::Int(values),
            }
        };

        let columns = series
            .into_iter()
            .map(|(name, series_index, values)| {
                let mut aligned = vec![f64::NAN; index.len()];
                for (i, v) in values.into_iter().enumerate() {
                    if let Some(pos) = series_index.label(i).and_then(|l| index.position_of(l)) {
                        aligned[pos] = v;
                    }
                }
                Column::float(name, aligned)
            })
            .collect();

        Self::new(index, columns)
    }

    pub fn index(&self) -> &TimeIndex {
        &self.index
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn height(&self) -> usize {
        self.index.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name().to_string()).collect()
    }

    pub fn dtypes(&self) -> Vec<(String, DType)> {
        self.columns
            .iter()
            .map(|c| (c.name().to_string(), c.dtype()))
            .collect()
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| ForecastError::value_error(format!("Column '{}' not found.", name)))
    }

    /// Values of a numeric column as f64
    pub fn values_f64(&self, name: &str) -> Result<Vec<f64>> {
        self.column(name)?.to_f64()
    }

    pub fn set_index(mut self, index: TimeIndex) -> Result<Self> {
        if index.len() != self.height() {
            return Err(ForecastError::Shape {
                expected: format!("index of length {}", self.height()),
                actual: index.len().to_string(),
            });
        }
        self.index = index;
        Ok(self)
    }

    /// Keep only `names`, in that order
    pub fn select(&self, names: &[String]) -> Result<Frame> {
        let columns = names
            .iter()
            .map(|n| self.column(n).cloned())
            .collect::<Result<Vec<_>>>()?;
        Frame::new(self.index.clone(), columns)
    }

    /// Contiguous rows `[start, end)`
    pub fn slice_rows(&self, start: usize, end: usize) -> Frame {
        let end = end.min(self.height());
        let start = start.min(end);
        let positions: Vec<usize> = (start..end).collect();
        Frame {
            index: self.index.slice(start, end),
            columns: self.columns.iter().map(|c| c.take(&positions)).collect(),
        }
    }

    /// Rows at arbitrary positions; dtypes and categories are kept
    pub fn take_rows(&self, positions: &[usize]) -> Result<Frame> {
        if let Some(&bad) = positions.iter().find(|&&p| p >= self.height()) {
            return Err(ForecastError::Shape {
                expected: format!("row position < {}", self.height()),
                actual: bad.to_string(),
            });
        }
        Ok(Frame {
            index: self.index.take(positions)?,
            columns: self.columns.iter().map(|c| c.take(positions)).collect(),
        })
    }

    /// Stack frames with identical schemas on top of each other
    pub fn concat_rows(frames: &[Frame]) -> Result<Frame> {
        let Some(first) = frames.first() else {
            return Frame::new(TimeIndex::range(0, 0), Vec::new());
        };
        let names = first.column_names();
        let mut columns = first.columns.clone();
        for frame in &frames[1..] {
            if frame.column_names() != names {
                return Err(ForecastError::value_error(format!(
                    "Cannot concatenate frames with different columns: {:?} and {:?}.",
                    names,
                    frame.column_names()
                )));
            }
            for (dst, src) in columns.iter_mut().zip(&frame.columns) {
                dst.append(src)?;
            }
        }
        let indexes: Vec<&TimeIndex> = frames.iter().map(|f| &f.index).collect();
        Frame::new(TimeIndex::concat(&indexes)?, columns)
    }

    /// Place the columns of `other` to the right of this frame's columns
    pub fn hconcat(mut self, other: Frame) -> Result<Frame> {
        if other.height() != self.height() {
            return Err(ForecastError::Shape {
                expected: format!("{} rows", self.height()),
                actual: other.height().to_string(),
            });
        }
        self.columns.extend(other.columns);
        Frame::new(self.index, self.columns)
    }

    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if column.len() != self.height() {
            return Err(ForecastError::Shape {
                expected: format!("{} rows in column '{}'", self.height(), column.name()),
                actual: column.len().to_string(),
            });
        }
        if self.columns.iter().any(|c| c.name() == column.name()) {
            return Err(ForecastError::value_error(format!(
                "Duplicated column name '{}'.",
                column.name()
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Whether any float or categorical value is missing
    pub fn has_missing(&self) -> bool {
        self.columns.iter().any(Column::has_missing)
    }

    /// Positions of rows holding at least one missing value
    pub fn rows_with_missing(&self) -> Vec<usize> {
        (0..self.height())
            .filter(|&i| self.columns.iter().any(|c| c.is_missing(i)))
            .collect()
    }

    /// Dense `f64` feature matrix (rows x columns)
    pub fn to_array(&self) -> Result<Array2<f64>> {
        let (n, m) = (self.height(), self.width());
        let mut out = Array2::zeros((n, m));
        for (j, col) in self.columns.iter().enumerate() {
            let values = col.to_f64()?;
            for (i, v) in values.into_iter().enumerate() {
                out[[i, j]] = v;
            }
        }
        Ok(out)
    }

    /// The only column of a single-column frame, as f64 values
    pub fn single_column_values(&self) -> Result<(String, Vec<f64>)> {
        match self.columns.as_slice() {
            [col] => Ok((col.name().to_string(), col.to_f64()?)),
            _ => Err(ForecastError::value_error(format!(
                "Expected a single column, got {}.",
                self.width()
            ))),
        }
    }

    pub(crate) fn into_columns(self) -> Vec<Column> {
        self.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(1990, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_new_rejects_length_mismatch() {
        let result = Frame::new(
            TimeIndex::range(0, 3),
            vec![Column::float("a", vec![1.0, 2.0])],
        );
        assert!(matches!(result, Err(ForecastError::Shape { .. })));
    }

    #[test]
    fn test_to_array_mixed_dtypes() {
        let frame = Frame::with_range_index(vec![
            Column::float("a", vec![1.5, 2.5]),
            Column::int("b", vec![3, 4]),
            Column::bool("c", vec![true, false]),
            Column::categorical_int("d", &[10, 20]),
        ])
        .unwrap();
        let arr = frame.to_array().unwrap();
        assert_eq!(arr.shape(), &[2, 4]);
        assert_eq!(arr[[0, 2]], 1.0);
        assert_eq!(arr[[1, 3]], 20.0);
    }

    #[test]
    fn test_from_series_outer_aligns() {
        let frame = Frame::from_series(vec![
            ("a".to_string(), TimeIndex::range(0, 4), vec![0.0, 1.0, 2.0, 3.0]),
            ("b".to_string(), TimeIndex::range(2, 6), vec![2.0, 3.0, 4.0, 5.0]),
        ])
        .unwrap();
        assert_eq!(frame.index(), &TimeIndex::range(0, 6));
        let b = frame.values_f64("b").unwrap();
        assert!(b[0].is_nan() && b[1].is_nan());
        assert_eq!(b[5], 5.0);
        let a = frame.values_f64("a").unwrap();
        assert!(a[4].is_nan());
    }

    #[test]
    fn test_from_series_rejects_mixed_index_types() {
        let result = Frame::from_series(vec![
            ("a".to_string(), TimeIndex::range(0, 2), vec![0.0, 1.0]),
            (
                "b".to_string(),
                TimeIndex::datetime(vec![day(1), day(2)]),
                vec![0.0, 1.0],
            ),
        ]);
        assert!(matches!(result, Err(ForecastError::TypeError(_))));
    }

    #[test]
    fn test_concat_rows_keeps_categories() {
        let a = Frame::with_range_index(vec![Column::categorical_int_with_categories(
            "c",
            &[1, 2],
            vec![1, 2, 3],
        )])
        .unwrap();
        let stacked = Frame::concat_rows(&[a.clone(), a.clone()]).unwrap();
        assert_eq!(stacked.height(), 4);
        assert_eq!(stacked.column("c").unwrap().dtype(), a.column("c").unwrap().dtype());
    }
}
