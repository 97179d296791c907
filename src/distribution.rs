//! Distribution summaries used by the exploratory plots: quantiles, equal-width histograms and
//! wind-rose frequency tables.

use crate::error::SolarError;
use crate::table::ObservationTable;
use bon::Builder;
use serde::Serialize;

/// Computes the `p`-th quantile of **sorted** data by linear interpolation between the two
/// nearest order statistics (R-7, the NumPy default).
///
/// Returns `None` for empty input or `p` outside `[0, 1]`.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&p) {
        return None;
    }
    let h = (sorted.len() - 1) as f64 * p;
    let lower = h.floor() as usize;
    let upper = h.ceil() as usize;
    let fraction = h - lower as f64;
    Some(sorted[lower] + fraction * (sorted[upper] - sorted[lower]))
}

/// Equal-width histogram of one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub column: String,
    /// `counts.len() + 1` bin edges; every bin is half-open except the last, which is closed.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Histogram of the observed values of `column` over `bins` equal-width bins spanning the
/// observed range. A constant column is binned over `[v - 0.5, v + 0.5]`.
///
/// # Errors
///
/// * [`SolarError::Configuration`] if `bins` is zero.
/// * [`SolarError::InsufficientData`] if the column has no observed values.
pub fn histogram(
    table: &ObservationTable,
    column: &str,
    bins: usize,
) -> Result<Histogram, SolarError> {
    if bins == 0 {
        return Err(SolarError::Configuration(
            "histogram needs at least one bin".to_string(),
        ));
    }
    let values: Vec<f64> = table.numeric(column)?.into_iter().flatten().collect();
    let (min, max) = values
        .iter()
        .fold(None, |range: Option<(f64, f64)>, &v| match range {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
        .ok_or(SolarError::InsufficientData {
            required: 1,
            found: 0,
        })?;
    let (low, high) = if min == max {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    };

    let width = (high - low) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| low + width * i as f64).collect();
    let mut counts = vec![0; bins];
    for v in values {
        let index = (((v - low) / width) as usize).min(bins - 1);
        counts[index] += 1;
    }

    Ok(Histogram {
        column: column.to_string(),
        edges,
        counts,
    })
}

/// One histogram per numeric column, in table order. Columns without observed values are
/// skipped; a table without numeric columns yields an empty list.
pub fn numeric_histograms(
    table: &ObservationTable,
    bins: usize,
) -> Result<Vec<Histogram>, SolarError> {
    let mut histograms = Vec::new();
    for column in table.numeric_columns() {
        match histogram(table, &column, bins) {
            Ok(h) => histograms.push(h),
            Err(SolarError::InsufficientData { .. }) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(histograms)
}

/// Settings for [`wind_rose`].
#[derive(Debug, Clone, Builder)]
pub struct WindRoseOptions {
    #[builder(default = "WD".to_string(), into)]
    pub direction_column: String,
    #[builder(default = "WS".to_string(), into)]
    pub speed_column: String,
    /// Number of direction sectors; the first is centred on north.
    #[builder(default = 16)]
    pub sectors: usize,
    /// Number of speed classes, with edges spaced linearly from the minimum to the maximum
    /// observed speed. The last class is open-ended.
    #[builder(default = 6)]
    pub speed_bins: usize,
}

impl Default for WindRoseOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Frequency table of wind direction against wind speed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindRose {
    /// Width of one direction sector in degrees.
    pub sector_width: f64,
    /// Lower edge of every speed class.
    pub speed_edges: Vec<f64>,
    /// `frequencies[sector][speed_class]` in percent of all paired observations.
    pub frequencies: Vec<Vec<f64>>,
    pub observations: usize,
}

impl WindRose {
    /// Share of observations per direction sector, in percent.
    pub fn sector_totals(&self) -> Vec<f64> {
        self.frequencies.iter().map(|row| row.iter().sum()).collect()
    }

    /// Centre of `sector` in degrees clockwise from north.
    pub fn sector_center(&self, sector: usize) -> f64 {
        sector as f64 * self.sector_width
    }
}

/// Bins paired direction/speed observations into a wind rose.
///
/// Only rows where both direction and speed are present are counted.
///
/// # Errors
///
/// * [`SolarError::ColumnNotFound`] if either column is absent.
/// * [`SolarError::Configuration`] if `sectors` or `speed_bins` is zero.
/// * [`SolarError::InsufficientData`] if there are no paired observations.
pub fn wind_rose(
    table: &ObservationTable,
    options: &WindRoseOptions,
) -> Result<WindRose, SolarError> {
    if options.sectors == 0 || options.speed_bins == 0 {
        return Err(SolarError::Configuration(
            "wind rose needs at least one sector and one speed class".to_string(),
        ));
    }
    let directions = table.numeric(&options.direction_column)?;
    let speeds = table.numeric(&options.speed_column)?;
    let pairs: Vec<(f64, f64)> = directions
        .into_iter()
        .zip(speeds)
        .filter_map(|(d, s)| Some((d?, s?)))
        .collect();
    if pairs.is_empty() {
        return Err(SolarError::InsufficientData {
            required: 1,
            found: 0,
        });
    }

    let min_speed = pairs.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let max_speed = pairs.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    let speed_edges: Vec<f64> = if options.speed_bins == 1 {
        vec![min_speed]
    } else {
        let step = (max_speed - min_speed) / (options.speed_bins - 1) as f64;
        (0..options.speed_bins)
            .map(|i| min_speed + step * i as f64)
            .collect()
    };

    let sector_width = 360.0 / options.sectors as f64;
    let mut counts = vec![vec![0usize; options.speed_bins]; options.sectors];
    for (direction, speed) in &pairs {
        let shifted = (direction.rem_euclid(360.0) + sector_width / 2.0).rem_euclid(360.0);
        let sector = ((shifted / sector_width) as usize).min(options.sectors - 1);
        let class = speed_edges
            .iter()
            .rposition(|edge| speed >= edge)
            .unwrap_or(0);
        counts[sector][class] += 1;
    }

    let total = pairs.len() as f64;
    let frequencies = counts
        .into_iter()
        .map(|row| row.into_iter().map(|c| c as f64 * 100.0 / total).collect())
        .collect();

    Ok(WindRose {
        sector_width,
        speed_edges,
        frequencies,
        observations: pairs.len(),
    })
}
