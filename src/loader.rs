//! Reads measurement CSV files into validated [`ObservationTable`]s.

use crate::error::SolarError;
use crate::table::ObservationTable;
use bon::Builder;
use log::{debug, info};
use polars::prelude::*;
use std::path::Path;

/// Default timestamp column of the cleaned measurement files.
pub const TIMESTAMP_COLUMN: &str = "Timestamp";

/// Options controlling how a CSV file is read.
///
/// Options are part of the [`crate::TableCache`] key, so two loads of the same file with
/// different options are cached separately.
///
/// # Examples
///
/// ```
/// use solar_eda::LoadOptions;
///
/// let options = LoadOptions::builder()
///     .date_columns(vec!["Timestamp".to_string(), "Cleaning".to_string()])
///     .separator(b';')
///     .build();
/// assert_eq!(options.separator, b';');
/// assert_eq!(LoadOptions::default().date_columns, vec!["Timestamp".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Builder)]
pub struct LoadOptions {
    /// Columns parsed as date-times.
    #[builder(default = vec![TIMESTAMP_COLUMN.to_string()])]
    pub date_columns: Vec<String>,
    #[builder(default = b',')]
    pub separator: u8,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Loads `path`, parsing every column in `options.date_columns` as a date-time.
///
/// # Errors
///
/// * [`SolarError::FileNotFound`] if `path` does not exist.
/// * [`SolarError::CsvRead`] if polars cannot read the file.
/// * [`SolarError::ColumnNotFound`] / [`SolarError::Parse`] if a date column is absent or
///   holds a value that is not a date-time.
pub fn load(path: &Path, options: &LoadOptions) -> Result<ObservationTable, SolarError> {
    if !path.exists() {
        return Err(SolarError::FileNotFound(path.to_path_buf()));
    }
    debug!("Reading {:?} with options {:?}", path, options);

    let separator = options.separator;
    let frame = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .map_parse_options(|parse| parse.with_separator(separator))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| SolarError::CsvRead {
            path: path.to_path_buf(),
            source: e,
        })?
        .finish()
        .map_err(|e| SolarError::CsvRead {
            path: path.to_path_buf(),
            source: e,
        })?;

    let table = ObservationTable::from_frame(frame, &options.date_columns)?;
    info!(
        "Loaded {} rows x {} columns from {:?}",
        table.height(),
        table.width(),
        path
    );
    Ok(table)
}

/// Loads a cleaned measurement file with the default `Timestamp` date column.
pub fn load_dataset(path: &Path) -> Result<ObservationTable, SolarError> {
    load(path, &LoadOptions::default())
}

/// Loads `path` and tags every row with `label` in `label_column`, the way the dashboard
/// marks which country a file belongs to.
pub fn load_labeled(
    path: &Path,
    options: &LoadOptions,
    label_column: &str,
    label: &str,
) -> Result<ObservationTable, SolarError> {
    load(path, options)?.with_label(label_column, label)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;
    use polars::prelude::{DataType, TimeUnit};
    use std::io::Write;
    use tempfile::NamedTempFile;

    pub(crate) fn write_csv(contents: &str) -> std::io::Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        file.write_all(contents.as_bytes())?;
        file.flush()?;
        Ok(file)
    }

    #[test]
    fn test_load_parses_timestamp() -> Result<(), Box<dyn std::error::Error>> {
        let file = write_csv(
            "Timestamp,GHI,DNI,DHI\n\
             2021-08-09 00:01,-1.2,0,0\n\
             2021-08-09 00:02,,0.1,0\n",
        )?;
        let table = load_dataset(file.path())?;

        assert_eq!(table.height(), 2);
        assert_eq!(
            table.frame().column("Timestamp")?.dtype(),
            &DataType::Datetime(TimeUnit::Milliseconds, None)
        );
        assert_eq!(table.numeric("GHI")?, vec![Some(-1.2), None]);
        // integer-looking columns are numeric too
        assert_eq!(table.numeric("DHI")?, vec![Some(0.0), Some(0.0)]);

        let first = NaiveDate::from_ymd_opt(2021, 8, 9).and_then(|d| d.and_hms_opt(0, 1, 0));
        assert_eq!(table.timestamps("Timestamp")?[0], first);
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        let result = load_dataset(Path::new("data/does_not_exist.csv"));
        assert!(matches!(result, Err(SolarError::FileNotFound(_))));
    }

    #[test]
    fn test_bad_timestamp() -> Result<(), Box<dyn std::error::Error>> {
        let file = write_csv("Timestamp,GHI\n2021-08-09 00:01,1\nnot a date,2\n")?;
        let result = load_dataset(file.path());
        assert!(matches!(result, Err(SolarError::Parse { row: 1, .. })));
        Ok(())
    }

    #[test]
    fn test_custom_separator_and_label() -> Result<(), Box<dyn std::error::Error>> {
        let file = write_csv("Timestamp;GHI\n2024-01-01T00:00;5.5\n")?;
        let options = LoadOptions::builder().separator(b';').build();
        let table = load_labeled(file.path(), &options, "Country", "Togo")?;

        assert_eq!(table.numeric("GHI")?, vec![Some(5.5)]);
        assert_eq!(table.labels("Country")?, vec![Some("Togo".to_string())]);
        Ok(())
    }

    #[test]
    fn test_no_date_columns() -> Result<(), Box<dyn std::error::Error>> {
        let file = write_csv("Country,GHI\nBenin,1\n")?;
        let options = LoadOptions::builder().date_columns(vec![]).build();
        let table = load(file.path(), &options)?;
        assert_eq!(table.column_names(), vec!["Country", "GHI"]);
        Ok(())
    }
}
