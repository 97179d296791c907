//! Calendar resampling of measurement time series.
//!
//! [`resample`] buckets rows into calendar periods (top of the hour, midnight, first of the
//! month, first of the year) and averages the observed values of each requested column per
//! period. The result feeds the daily/monthly trend charts.

use crate::error::SolarError;
use crate::table::ObservationTable;
use chrono::{DateTime, Datelike, Days, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use log::debug;
use polars::prelude::{col, IntoLazy, NamedFrom, Series};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

const PERIOD_KEY: &str = "__period_start";

/// Calendar resampling frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Frequency {
    Hourly,
    Daily,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Short code, as accepted by [`Frequency::from_str`].
    pub fn code(&self) -> &'static str {
        match self {
            Frequency::Hourly => "h",
            Frequency::Daily => "D",
            Frequency::Monthly => "M",
            Frequency::Yearly => "Y",
        }
    }

    /// Start of the calendar period containing `ts`.
    pub fn period_start(&self, ts: NaiveDateTime) -> NaiveDateTime {
        let date = ts.date();
        match self {
            Frequency::Hourly => {
                NaiveDateTime::new(date, NaiveTime::MIN) + TimeDelta::hours(i64::from(ts.hour()))
            }
            Frequency::Daily => NaiveDateTime::new(date, NaiveTime::MIN),
            Frequency::Monthly => NaiveDateTime::new(
                date - Days::new(u64::from(date.day0())),
                NaiveTime::MIN,
            ),
            Frequency::Yearly => NaiveDateTime::new(
                date - Days::new(u64::from(date.ordinal0())),
                NaiveTime::MIN,
            ),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Parses frequency codes: `h`/`H`, `D`, `M`/`MS`/`ME` and `Y`/`YS`/`YE`/`A`.
///
/// # Examples
///
/// ```
/// use solar_eda::Frequency;
///
/// assert_eq!("D".parse::<Frequency>().unwrap(), Frequency::Daily);
/// assert_eq!("ME".parse::<Frequency>().unwrap(), Frequency::Monthly);
/// assert!("W".parse::<Frequency>().is_err());
/// ```
impl FromStr for Frequency {
    type Err = SolarError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code.trim() {
            "h" | "H" => Ok(Frequency::Hourly),
            "D" => Ok(Frequency::Daily),
            "M" | "MS" | "ME" => Ok(Frequency::Monthly),
            "Y" | "YS" | "YE" | "A" => Ok(Frequency::Yearly),
            other => Err(SolarError::Configuration(format!(
                "unsupported resampling frequency '{}'",
                other
            ))),
        }
    }
}

/// Human-readable label per frequency, used in chart titles.
///
/// Every frequency passed to [`resample`] must have a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyLabels {
    labels: BTreeMap<Frequency, String>,
}

impl FrequencyLabels {
    /// An empty label set.
    pub fn new() -> Self {
        Self {
            labels: BTreeMap::new(),
        }
    }

    pub fn with(mut self, frequency: Frequency, label: impl Into<String>) -> Self {
        self.labels.insert(frequency, label.into());
        self
    }

    pub fn get(&self, frequency: Frequency) -> Option<&str> {
        self.labels.get(&frequency).map(String::as_str)
    }
}

/// `Daily` and `Monthly`.
impl Default for FrequencyLabels {
    fn default() -> Self {
        Self::new()
            .with(Frequency::Daily, "Daily")
            .with(Frequency::Monthly, "Monthly")
    }
}

impl<S: Into<String>> FromIterator<(Frequency, S)> for FrequencyLabels {
    fn from_iter<I: IntoIterator<Item = (Frequency, S)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |labels, (frequency, label)| labels.with(frequency, label))
    }
}

/// Period means of one column, ascending by period start. Periods without an observed value
/// are absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    pub column: String,
    pub points: Vec<(NaiveDateTime, f64)>,
}

/// All requested columns resampled at one frequency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resampled {
    pub frequency: Frequency,
    pub label: String,
    pub series: Vec<TimeSeries>,
}

impl Resampled {
    /// Chart title, e.g. `Daily Trend of GHI | DNI`.
    pub fn title(&self) -> String {
        let columns: Vec<&str> = self.series.iter().map(|s| s.column.as_str()).collect();
        format!("{} Trend of {}", self.label, columns.join(" | "))
    }

    pub fn series(&self, column: &str) -> Option<&TimeSeries> {
        self.series.iter().find(|s| s.column == column)
    }
}

/// Resamples `columns` of `table` at every frequency in `frequencies`.
///
/// Rows with a missing timestamp are dropped. Within each period the mean is taken over the
/// observed values only; a period in which a column has no observed value contributes no
/// point to that column's series. Duplicate frequencies and columns are resampled once.
///
/// Validation happens before anything is computed, in this order:
///
/// 1. [`SolarError::MissingColumn`] if `timestamp_column` is absent,
/// 2. [`SolarError::Configuration`] if a frequency has no label in `labels`,
/// 3. [`SolarError::ColumnNotFound`] / [`SolarError::ColumnType`] for value columns.
///
/// A timestamp column that is still text is parsed on a copy ([`SolarError::Parse`] on
/// failure). The caller's table is not modified.
///
/// # Examples
///
/// ```
/// use polars::prelude::*;
/// use solar_eda::{resample, Frequency, FrequencyLabels, ObservationTable};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let frame = df!(
///     "Timestamp" => ["2024-01-01T00:00", "2024-01-01T12:00", "2024-02-01T00:00"],
///     "GHI" => [100.0, 200.0, 300.0]
/// )?;
/// let table = ObservationTable::from_frame(frame, &["Timestamp"])?;
///
/// let out = resample(
///     &table,
///     &["GHI"],
///     "Timestamp",
///     &[Frequency::Monthly],
///     &FrequencyLabels::default(),
/// )?;
/// let monthly = &out[&Frequency::Monthly];
/// assert_eq!(monthly.title(), "Monthly Trend of GHI");
/// let means: Vec<f64> = monthly.series[0].points.iter().map(|p| p.1).collect();
/// assert_eq!(means, vec![150.0, 300.0]);
/// # Ok(())
/// # }
/// ```
pub fn resample<S: AsRef<str>>(
    table: &ObservationTable,
    columns: &[S],
    timestamp_column: &str,
    frequencies: &[Frequency],
    labels: &FrequencyLabels,
) -> Result<BTreeMap<Frequency, Resampled>, SolarError> {
    if !table.has_column(timestamp_column) {
        return Err(SolarError::MissingColumn(timestamp_column.to_string()));
    }
    for frequency in frequencies {
        if labels.get(*frequency).is_none() {
            return Err(SolarError::Configuration(format!(
                "missing label for frequency '{}'",
                frequency
            )));
        }
    }
    let mut seen = HashSet::new();
    let columns: Vec<&str> = columns
        .iter()
        .map(AsRef::as_ref)
        .filter(|c| seen.insert(*c))
        .collect();
    for column in &columns {
        table.require_numeric(column)?;
    }

    let timestamps = table.timestamps(timestamp_column)?;
    let base = table.frame().select(columns.iter().copied())?;

    let mut resampled = BTreeMap::new();
    for &frequency in frequencies {
        if resampled.contains_key(&frequency) {
            continue;
        }
        let keys: Vec<Option<i64>> = timestamps
            .iter()
            .map(|ts| ts.map(|t| frequency.period_start(t).and_utc().timestamp_millis()))
            .collect();
        let mut frame = base.clone();
        frame.with_column(Series::new(PERIOD_KEY.into(), keys))?;

        let means = frame
            .lazy()
            .filter(col(PERIOD_KEY).is_not_null())
            .group_by([col(PERIOD_KEY)])
            .agg(columns.iter().map(|c| col(*c).mean()).collect::<Vec<_>>())
            .collect()?;

        let periods: Vec<Option<i64>> = means.column(PERIOD_KEY)?.i64()?.into_iter().collect();
        let mut series = Vec::with_capacity(columns.len());
        for column in &columns {
            let values = means.column(column)?.f64()?;
            let points: BTreeMap<i64, f64> = periods
                .iter()
                .zip(values.into_iter())
                .filter_map(|(period, mean)| Some(((*period)?, mean?)))
                .collect();
            series.push(TimeSeries {
                column: column.to_string(),
                points: points
                    .into_iter()
                    .filter_map(|(ms, mean)| {
                        DateTime::from_timestamp_millis(ms).map(|d| (d.naive_utc(), mean))
                    })
                    .collect(),
            });
        }

        let label = labels.get(frequency).unwrap_or_default().to_string();
        debug!(
            "Resampled {} columns at {} into {} periods",
            columns.len(),
            frequency,
            means.height()
        );
        resampled.insert(
            frequency,
            Resampled {
                frequency,
                label,
                series,
            },
        );
    }
    Ok(resampled)
}
