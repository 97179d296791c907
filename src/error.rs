use polars::error::PolarsError;
use polars::prelude::DataType;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolarError {
    #[error("Input file '{0}' does not exist")]
    FileNotFound(PathBuf),

    #[error("Failed to read CSV file '{path}'")]
    CsvRead {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("Could not parse '{value}' in column '{column}' (row {row}) as a date-time")]
    Parse {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Required column '{0}' not found in table")]
    ColumnNotFound(String),

    // Raised by the resampler when the timestamp column is absent.
    #[error("'{0}' column is required in the table")]
    MissingColumn(String),

    #[error("Column '{column}' has type {found}, expected {expected}")]
    ColumnType {
        column: String,
        expected: &'static str,
        found: DataType,
    },

    #[error("Cannot combine tables: column '{column}' is missing from table {table_index}")]
    SchemaMismatch { column: String, table_index: usize },

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Need at least {required} observations, found {found}")]
    InsufficientData { required: usize, found: usize },

    #[error("Column '{0}' has zero variance; correlation is undefined")]
    ZeroVariance(String),

    #[error("Failed to build reference distribution: {0}")]
    Distribution(String),

    #[error("Failed processing DataFrame: {0}")]
    Polars(#[from] PolarsError),

    #[error("Failed to serialise view")]
    Json(#[from] serde_json::Error),
}
