//! Contains [`ObservationTable`], the validated table every analysis in this crate runs on.
//!
//! A table is built once from a polars [`DataFrame`] and normalised so later operations can
//! rely on three column kinds:
//!
//! * timestamp columns are `Datetime(Milliseconds)` (nulls mark missing timestamps),
//! * numeric columns are `Float64` (nulls and `NaN` both mark missing values, `NaN` is
//!   rewritten to null during validation),
//! * label columns are `String`.
//!
//! Column access goes through [`ObservationTable::numeric`], [`ObservationTable::labels`] and
//! [`ObservationTable::timestamps`], which report [`SolarError::ColumnNotFound`] or
//! [`SolarError::ColumnType`] at that boundary instead of deep inside a computation.

use crate::error::SolarError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use log::debug;
use polars::prelude::*;
use std::collections::HashSet;
use std::fmt;

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A validated, immutable table of observations.
///
/// All transforming methods return a new table; the receiver is never modified.
#[derive(Debug, Clone)]
pub struct ObservationTable {
    frame: DataFrame,
}

impl ObservationTable {
    /// Validates `frame` and wraps it.
    ///
    /// Every column named in `date_columns` must exist and hold date-time values, either
    /// already typed (`Date`/`Datetime`) or as text that parses as a date-time. Integer and
    /// float columns are normalised to `Float64`, and so is a text column without a single
    /// value (the CSV reader's guess for a column that is empty in this file).
    ///
    /// # Errors
    ///
    /// * [`SolarError::ColumnNotFound`] if a date column is absent.
    /// * [`SolarError::Parse`] if a non-empty cell of a date column cannot be parsed.
    /// * [`SolarError::ColumnType`] if a date column holds neither text nor temporal values.
    pub fn from_frame<S: AsRef<str>>(
        mut frame: DataFrame,
        date_columns: &[S],
    ) -> Result<Self, SolarError> {
        for name in date_columns {
            let name = name.as_ref();
            let column = frame
                .column(name)
                .map_err(|_| SolarError::ColumnNotFound(name.to_string()))?;
            let parsed = to_datetime_series(name, column)?;
            frame.with_column(parsed)?;
        }

        let numeric: Vec<PlSmallStr> = frame
            .get_columns()
            .iter()
            .filter(|c| is_numeric_dtype(c.dtype()) || is_empty_text(c))
            .map(|c| c.name().clone())
            .collect();
        for name in numeric {
            let casted = frame.column(&name)?.cast(&DataType::Float64)?;
            let cleaned: Float64Chunked = casted
                .f64()?
                .into_iter()
                .map(|v| v.filter(|x| !x.is_nan()))
                .collect();
            frame.with_column(cleaned.with_name(name).into_series())?;
        }

        debug!(
            "Validated table with {} rows and {} columns",
            frame.height(),
            frame.width()
        );
        Ok(Self { frame })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn width(&self) -> usize {
        self.frame.width()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame
            .get_column_names()
            .iter()
            .any(|c| c.as_str() == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    /// Names of the numeric (`Float64`) columns, in table order.
    pub fn numeric_columns(&self) -> Vec<String> {
        self.frame
            .get_columns()
            .iter()
            .filter(|c| c.dtype() == &DataType::Float64)
            .map(|c| c.name().to_string())
            .collect()
    }

    fn column(&self, name: &str) -> Result<&Column, SolarError> {
        self.frame
            .column(name)
            .map_err(|_| SolarError::ColumnNotFound(name.to_string()))
    }

    /// Checks that `name` exists and is numeric without materialising it.
    pub(crate) fn require_numeric(&self, name: &str) -> Result<(), SolarError> {
        let column = self.column(name)?;
        if column.dtype() != &DataType::Float64 {
            return Err(SolarError::ColumnType {
                column: name.to_string(),
                expected: "numeric",
                found: column.dtype().clone(),
            });
        }
        Ok(())
    }

    pub(crate) fn require_label(&self, name: &str) -> Result<(), SolarError> {
        let column = self.column(name)?;
        if column.dtype() != &DataType::String {
            return Err(SolarError::ColumnType {
                column: name.to_string(),
                expected: "text label",
                found: column.dtype().clone(),
            });
        }
        Ok(())
    }

    /// Values of a numeric column; `None` marks a missing value.
    pub fn numeric(&self, name: &str) -> Result<Vec<Option<f64>>, SolarError> {
        self.require_numeric(name)?;
        Ok(self.column(name)?.f64()?.into_iter().collect())
    }

    /// Values of a label column; `None` marks a missing label.
    pub fn labels(&self, name: &str) -> Result<Vec<Option<String>>, SolarError> {
        self.require_label(name)?;
        Ok(self
            .column(name)?
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect())
    }

    /// Values of a timestamp column.
    ///
    /// A column that was not declared as a date column at load time (and is therefore still
    /// text) is parsed here, on a copy.
    pub fn timestamps(&self, name: &str) -> Result<Vec<Option<NaiveDateTime>>, SolarError> {
        let column = self.column(name)?;
        let series = match column.dtype() {
            DataType::Datetime(TimeUnit::Milliseconds, None) => column.clone(),
            _ => to_datetime_series(name, column)?.into_column(),
        };
        let millis = series.cast(&DataType::Int64)?;
        Ok(millis
            .i64()?
            .into_iter()
            .map(|v| v.and_then(|ms| DateTime::from_timestamp_millis(ms).map(|d| d.naive_utc())))
            .collect())
    }

    /// Returns a copy with a constant label column added (or replaced).
    pub fn with_label(&self, column: &str, value: &str) -> Result<Self, SolarError> {
        let mut frame = self.frame.clone();
        let labels = vec![value; frame.height()];
        frame.with_column(Series::new(column.into(), labels))?;
        Ok(Self { frame })
    }

    /// Stacks tables vertically.
    ///
    /// Every table must carry the same set of columns as the first one; order may differ.
    ///
    /// # Errors
    ///
    /// * [`SolarError::InsufficientData`] when `tables` is empty.
    /// * [`SolarError::SchemaMismatch`] naming the first column missing from a table.
    pub fn concat(tables: &[ObservationTable]) -> Result<Self, SolarError> {
        let (first, rest) = tables
            .split_first()
            .ok_or(SolarError::InsufficientData {
                required: 1,
                found: 0,
            })?;
        let names = first.column_names();
        let mut combined = first.frame.clone();

        for (offset, table) in rest.iter().enumerate() {
            let table_index = offset + 1;
            if let Some(missing) = names.iter().find(|n| !table.has_column(n)) {
                return Err(SolarError::SchemaMismatch {
                    column: missing.clone(),
                    table_index,
                });
            }
            if let Some(extra) = table.column_names().into_iter().find(|n| !first.has_column(n)) {
                return Err(SolarError::SchemaMismatch {
                    column: extra,
                    table_index: 0,
                });
            }
            let aligned = table.frame.select(names.iter().map(String::as_str))?;
            combined.vstack_mut(&aligned)?;
        }

        Ok(Self { frame: combined })
    }

    /// Keeps the rows whose label in `column` is one of `selected`. Rows with a missing label
    /// are dropped.
    pub fn filter_labels<S: AsRef<str>>(
        &self,
        column: &str,
        selected: &[S],
    ) -> Result<Self, SolarError> {
        self.require_label(column)?;
        let wanted: HashSet<&str> = selected.iter().map(AsRef::as_ref).collect();
        let mask: BooleanChunked = self
            .column(column)?
            .str()?
            .into_iter()
            .map(|label| label.is_some_and(|l| wanted.contains(l)))
            .collect();
        Ok(Self {
            frame: self.frame.filter(&mask)?,
        })
    }

    /// Distinct non-missing labels in first-seen order.
    pub fn distinct_labels(&self, column: &str) -> Result<Vec<String>, SolarError> {
        let mut seen = HashSet::new();
        Ok(self
            .labels(column)?
            .into_iter()
            .flatten()
            .filter(|l| seen.insert(l.clone()))
            .collect())
    }
}

impl fmt::Display for ObservationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.frame)
    }
}

fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int32
            | DataType::Int64
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn is_empty_text(column: &Column) -> bool {
    column.dtype() == &DataType::String
        && column.len() > 0
        && column.null_count() == column.len()
}

/// Parses one cell. Accepts ISO 8601 date-times with or without seconds, RFC 3339 with an
/// offset (converted to UTC) and bare dates (midnight).
pub(crate) fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|d| d.naive_utc()))
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

fn to_datetime_series(name: &str, column: &Column) -> Result<Series, SolarError> {
    let target = DataType::Datetime(TimeUnit::Milliseconds, None);
    match column.dtype() {
        DataType::Datetime(_, _) | DataType::Date => Ok(column
            .cast(&target)?
            .as_materialized_series()
            .clone()),
        DataType::String => {
            let mut millis = Vec::with_capacity(column.len());
            for (row, cell) in column.str()?.into_iter().enumerate() {
                let value = match cell.map(str::trim) {
                    None | Some("") => None,
                    Some(text) => {
                        let parsed = parse_timestamp(text).ok_or_else(|| SolarError::Parse {
                            column: name.to_string(),
                            row,
                            value: text.to_string(),
                        })?;
                        Some(parsed.and_utc().timestamp_millis())
                    }
                };
                millis.push(value);
            }
            Ok(Series::new(name.into(), millis).cast(&target)?)
        }
        other => Err(SolarError::ColumnType {
            column: name.to_string(),
            expected: "date-time",
            found: other.clone(),
        }),
    }
}
