//! Exploratory statistics for solar irradiance measurements.
//!
//! Load cleaned measurement files with [`load`], then rank countries with
//! [`aggregate_mean`], build trend series with [`resample`], or relate measurements with
//! [`pearson`] and [`spearman`]. [`Dashboard`] ties these together for the country dashboard.

mod aggregate;
mod cache;
mod correlation;
mod dashboard;
mod distribution;
mod error;
mod loader;
mod resample;
mod table;

pub use error::SolarError;
pub use table::ObservationTable;

pub use loader::{load, load_dataset, load_labeled, LoadOptions, TIMESTAMP_COLUMN};
pub use cache::TableCache;

pub use aggregate::{aggregate_mean, group_summary, GroupMean, GroupSummary};
pub use resample::{resample, Frequency, FrequencyLabels, Resampled, TimeSeries};
pub use correlation::{
    correlate, correlation_matrix, pearson, spearman, Correlation, CorrelationMatrix,
    CorrelationMethod,
};
pub use distribution::{
    histogram, numeric_histograms, quantile_sorted, wind_rose, Histogram, WindRose,
    WindRoseOptions,
};

pub use dashboard::{CountrySource, Dashboard, DashboardConfig, DashboardView, Metric};
