//! Loading frames from polars DataFrames and CSV files

use crate::data::{Categories, Column, ColumnData, Frame, TimeIndex};
use crate::error::{ForecastError, Result};
use crate::utils::parse_date;
use chrono::{DateTime, NaiveDateTime};
use polars::prelude::{
    CsvParseOptions, CsvReadOptions, DataFrame, DataType, SerReader, Series, TimeUnit,
};
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Convert a polars DataFrame into a [`Frame`].
///
/// With `index_column`, that column becomes the index: datetime and date
/// columns (or strings that parse as dates) give a datetime index with an
/// inferred frequency, integer columns an integer index. Without it the
/// frame gets a `RangeIndex`.
pub fn frame_from_polars(df: &DataFrame, index_column: Option<&str>) -> Result<Frame> {
    let index = match index_column {
        Some(name) => {
            let column = df.column(name)?;
            index_from_series(column.as_materialized_series())?
        }
        None => TimeIndex::range(0, df.height() as i64),
    };

    let mut columns = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        let name = column.name().as_str();
        if Some(name) == index_column {
            continue;
        }
        columns.push(column_from_series(name, column.as_materialized_series())?);
    }

    debug!(rows = df.height(), columns = columns.len(), "converted polars DataFrame");
    Frame::new(index, columns)
}

/// Read a CSV file with a header row into a [`Frame`]
pub fn load_csv(path: impl AsRef<Path>, index_column: Option<&str>) -> Result<Frame> {
    let file = File::open(path.as_ref())?;
    let parse_options = CsvParseOptions::default().with_try_parse_dates(true);
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .with_parse_options(parse_options)
        .into_reader_with_file_handle(file)
        .finish()?;
    frame_from_polars(&df, index_column)
}

fn column_from_series(name: &str, series: &Series) -> Result<Column> {
    let dtype = series.dtype();
    let data = if dtype.is_float() {
        ColumnData::Float(float_values(series)?)
    } else if dtype.is_integer() {
        if series.null_count() > 0 {
            ColumnData::Float(float_values(series)?)
        } else {
            let ints = series.cast(&DataType::Int64)?;
            ColumnData::Int(ints.i64()?.into_no_null_iter().collect())
        }
    } else {
        match dtype {
            DataType::Boolean => {
                check_no_nulls(name, series)?;
                ColumnData::Bool(series.bool()?.into_no_null_iter().collect())
            }
            DataType::String => {
                check_no_nulls(name, series)?;
                ColumnData::Str(
                    series
                        .str()?
                        .into_no_null_iter()
                        .map(str::to_string)
                        .collect(),
                )
            }
            DataType::Categorical(_, _) | DataType::Enum(_, _) => categorical_data(series)?,
            other => {
                return Err(ForecastError::type_error(format!(
                    "Column '{}' has unsupported dtype {}.",
                    name, other
                )))
            }
        }
    };
    Ok(Column::new(name, data))
}

fn float_values(series: &Series) -> Result<Vec<f64>> {
    let floats = series.cast(&DataType::Float64)?;
    Ok(floats
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

fn check_no_nulls(name: &str, series: &Series) -> Result<()> {
    if series.null_count() > 0 {
        return Err(ForecastError::value_error(format!(
            "Column '{}' of dtype {} contains missing values.",
            name,
            series.dtype()
        )));
    }
    Ok(())
}

/// Categories are the sorted distinct labels; integer categories when every
/// label parses as an integer.
fn categorical_data(series: &Series) -> Result<ColumnData> {
    let labels = series.cast(&DataType::String)?;
    let labels: Vec<Option<String>> = labels
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();

    let mut distinct: Vec<String> = labels.iter().flatten().cloned().collect();
    distinct.sort();
    distinct.dedup();

    let parsed: Option<Vec<i64>> = distinct.iter().map(|s| s.parse::<i64>().ok()).collect();
    let (categories, keys): (Categories, Vec<String>) = match parsed {
        Some(mut ints) => {
            ints.sort_unstable();
            let keys = ints.iter().map(|v| v.to_string()).collect();
            (Categories::Int(ints), keys)
        }
        None => (Categories::Str(distinct.clone()), distinct),
    };
    let codes = labels
        .iter()
        .map(|label| {
            label
                .as_ref()
                .and_then(|l| keys.iter().position(|k| k == l).map(|p| p as u32))
        })
        .collect();
    Ok(ColumnData::Categorical { codes, categories })
}

fn index_from_series(series: &Series) -> Result<TimeIndex> {
    if series.null_count() > 0 {
        return Err(ForecastError::value_error(format!(
            "Index column '{}' contains missing values.",
            series.name()
        )));
    }
    match series.dtype() {
        DataType::Datetime(_, _) | DataType::Date => {
            let millis = series.cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
            let values = millis
                .cast(&DataType::Int64)?
                .i64()?
                .into_no_null_iter()
                .map(|ms| {
                    DateTime::from_timestamp_millis(ms)
                        .map(|dt| dt.naive_utc())
                        .ok_or_else(|| ForecastError::value_error("Timestamp out of range."))
                })
                .collect::<Result<Vec<NaiveDateTime>>>()?;
            Ok(TimeIndex::datetime(values))
        }
        DataType::String => {
            let values = series
                .str()?
                .into_no_null_iter()
                .map(|s| parse_date(s, None))
                .collect::<Result<Vec<_>>>()?;
            Ok(TimeIndex::datetime(values))
        }
        dtype if dtype.is_integer() => {
            let values: Vec<i64> = series
                .cast(&DataType::Int64)?
                .i64()?
                .into_no_null_iter()
                .collect();
            let consecutive = values.windows(2).all(|w| w[1] == w[0] + 1);
            Ok(match values.first() {
                Some(&start) if consecutive => TimeIndex::range(start, start + values.len() as i64),
                _ => TimeIndex::Int(values),
            })
        }
        other => Err(ForecastError::type_error(format!(
            "Index column '{}' must hold dates or integers. Got dtype {}.",
            series.name(),
            other
        ))),
    }
}
