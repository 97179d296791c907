//! The data side of the solar dashboard: which files make up the combined table, which
//! countries can be selected, and what the box plot, ranking table and bar chart show for a
//! given selection and metric.
//!
//! Rendering is left to the caller; a [`DashboardView`] carries everything needed and can be
//! serialised to JSON.

use crate::aggregate::{aggregate_mean, group_summary, GroupMean, GroupSummary};
use crate::cache::TableCache;
use crate::error::SolarError;
use crate::loader::LoadOptions;
use crate::table::ObservationTable;
use bon::Builder;
use log::info;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Irradiance metric selectable on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Metric {
    /// Global Horizontal Irradiance.
    Ghi,
    /// Direct Normal Irradiance.
    Dni,
    /// Diffuse Horizontal Irradiance.
    Dhi,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Ghi, Metric::Dni, Metric::Dhi];

    pub fn column(&self) -> &'static str {
        match self {
            Metric::Ghi => "GHI",
            Metric::Dni => "DNI",
            Metric::Dhi => "DHI",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column())
    }
}

impl FromStr for Metric {
    type Err = SolarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.column().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SolarError::Configuration(format!("unknown metric '{}'", s)))
    }
}

/// One country's measurement file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountrySource {
    pub label: String,
    /// File name, relative to [`DashboardConfig::data_dir`].
    pub file: String,
}

impl CountrySource {
    pub fn new(label: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            file: file.into(),
        }
    }
}

fn default_sources() -> Vec<CountrySource> {
    vec![
        CountrySource::new("Benin", "benin_clean.csv"),
        CountrySource::new("Sierra Leone", "sierraleone_clean.csv"),
        CountrySource::new("Togo", "togo_clean.csv"),
    ]
}

#[derive(Debug, Clone, Builder)]
pub struct DashboardConfig {
    #[builder(default = PathBuf::from("data"), into)]
    pub data_dir: PathBuf,
    #[builder(default = default_sources())]
    pub sources: Vec<CountrySource>,
    /// Column added to every file holding its country label.
    #[builder(default = "Country".to_string(), into)]
    pub label_column: String,
    #[builder(default)]
    pub load_options: LoadOptions,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Everything the dashboard renders for one selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub metric: Metric,
    /// Box-plot statistics per country, in the order countries first appear.
    pub boxplot: Vec<GroupSummary>,
    /// Mean of the metric per country, highest first. Also the bar chart's data.
    pub ranking: Vec<GroupMean>,
}

impl DashboardView {
    pub fn to_json(&self) -> Result<String, SolarError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Owns the configuration and the load cache of one dashboard session.
pub struct Dashboard {
    config: DashboardConfig,
    cache: TableCache,
    combined: Option<ObservationTable>,
}

impl Dashboard {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            cache: TableCache::new(),
            combined: None,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Every configured file, tagged with its country and stacked into one table. The stacked
    /// table is built once per session.
    pub fn combined(&mut self) -> Result<ObservationTable, SolarError> {
        if let Some(combined) = &self.combined {
            return Ok(combined.clone());
        }
        let mut tables = Vec::with_capacity(self.config.sources.len());
        for source in &self.config.sources {
            let path = self.config.data_dir.join(&source.file);
            let table = self
                .cache
                .get_or_load(&path, &self.config.load_options)?;
            tables.push(table.with_label(&self.config.label_column, &source.label)?);
        }
        let combined = ObservationTable::concat(&tables)?;
        info!(
            "Combined {} sources into {} rows",
            tables.len(),
            combined.height()
        );
        self.combined = Some(combined.clone());
        Ok(combined)
    }

    /// Countries available for selection, in configuration order.
    pub fn countries(&mut self) -> Result<Vec<String>, SolarError> {
        let label_column = self.config.label_column.clone();
        self.combined()?.distinct_labels(&label_column)
    }

    /// Box plot and ranking of `metric` over the selected countries (`None` selects all).
    pub fn view(
        &mut self,
        selection: Option<&[String]>,
        metric: Metric,
    ) -> Result<DashboardView, SolarError> {
        let label_column = self.config.label_column.clone();
        let combined = self.combined()?;
        let filtered = match selection {
            Some(countries) => combined.filter_labels(&label_column, countries)?,
            None => combined,
        };
        info!(
            "Building {} view over {} rows",
            metric,
            filtered.height()
        );

        Ok(DashboardView {
            metric,
            boxplot: group_summary(&filtered, &label_column, metric.column())?,
            ranking: aggregate_mean(&filtered, &label_column, metric.column())?,
        })
    }

    /// Forgets every loaded file so the next view re-reads them.
    pub fn reload(&mut self) {
        self.cache.clear();
        self.combined = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_data_dir() -> std::io::Result<TempDir> {
        let dir = tempfile::tempdir()?;
        fs::write(
            dir.path().join("benin_clean.csv"),
            "Timestamp,GHI,DNI,DHI\n\
             2021-08-09 00:01,500,10,1\n\
             2021-08-09 00:02,700,20,2\n",
        )?;
        fs::write(
            dir.path().join("sierraleone_clean.csv"),
            "Timestamp,GHI,DNI,DHI\n2021-10-30 00:01,,30,3\n2021-10-30 00:02,450,,5\n",
        )?;
        fs::write(
            dir.path().join("togo_clean.csv"),
            "Timestamp,DHI,GHI,DNI\n2021-10-25 00:01,4,300,40\n",
        )?;
        Ok(dir)
    }

    fn dashboard(dir: &TempDir) -> Dashboard {
        Dashboard::new(DashboardConfig::builder().data_dir(dir.path()).build())
    }

    #[test]
    fn test_combined_and_countries() -> Result<(), Box<dyn std::error::Error>> {
        let dir = write_data_dir()?;
        let mut dashboard = dashboard(&dir);

        let combined = dashboard.combined()?;
        assert_eq!(combined.height(), 5);
        assert_eq!(
            dashboard.countries()?,
            vec!["Benin", "Sierra Leone", "Togo"]
        );
        Ok(())
    }

    #[test]
    fn test_view_for_all_countries() -> Result<(), Box<dyn std::error::Error>> {
        let dir = write_data_dir()?;
        let mut dashboard = dashboard(&dir);

        let view = dashboard.view(None, Metric::Ghi)?;
        let ranking: Vec<(&str, f64)> = view
            .ranking
            .iter()
            .map(|g| (g.label.as_str(), g.mean))
            .collect();
        assert_eq!(
            ranking,
            vec![("Benin", 600.0), ("Sierra Leone", 450.0), ("Togo", 300.0)]
        );
        let boxplot_labels: Vec<&str> = view.boxplot.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(boxplot_labels, vec!["Benin", "Sierra Leone", "Togo"]);
        Ok(())
    }

    #[test]
    fn test_view_for_selection() -> Result<(), Box<dyn std::error::Error>> {
        let dir = write_data_dir()?;
        let mut dashboard = dashboard(&dir);

        let selection = vec!["Togo".to_string(), "Sierra Leone".to_string()];
        let view = dashboard.view(Some(selection.as_slice()), "dni".parse()?)?;
        assert_eq!(view.metric, Metric::Dni);
        let labels: Vec<&str> = view.ranking.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["Togo", "Sierra Leone"]);

        let json = view.to_json()?;
        assert!(json.contains("\"ranking\""));
        assert!(json.contains("\"Dni\""));

        let empty = dashboard.view(Some(&[] as &[String]), Metric::Dhi)?;
        assert!(empty.ranking.is_empty());
        assert!(empty.boxplot.is_empty());
        Ok(())
    }

    #[test]
    fn test_reload_rereads_files() -> Result<(), Box<dyn std::error::Error>> {
        let dir = write_data_dir()?;
        let mut dashboard = dashboard(&dir);
        assert_eq!(dashboard.combined()?.height(), 5);

        fs::write(
            dir.path().join("togo_clean.csv"),
            "Timestamp,DHI,GHI,DNI\n2021-10-25 00:01,4,300,40\n2021-10-25 00:02,4,100,40\n",
        )?;
        assert_eq!(dashboard.combined()?.height(), 5);
        dashboard.reload();
        assert_eq!(dashboard.combined()?.height(), 6);
        Ok(())
    }

    #[test]
    fn test_combined_table_built_once() -> Result<(), Box<dyn std::error::Error>> {
        let dir = write_data_dir()?;
        let mut dashboard = dashboard(&dir);
        assert_eq!(dashboard.countries()?.len(), 3);

        fs::remove_file(dir.path().join("togo_clean.csv"))?;
        assert_eq!(dashboard.countries()?.len(), 3);
        assert_eq!(dashboard.view(None, Metric::Ghi)?.ranking.len(), 3);

        dashboard.reload();
        assert!(matches!(
            dashboard.combined(),
            Err(SolarError::FileNotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn test_metric_empty_in_one_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = write_data_dir()?;
        fs::write(
            dir.path().join("sierraleone_clean.csv"),
            "Timestamp,GHI,DNI,DHI
2021-10-30 00:01,200,,3
2021-10-30 00:02,400,,5
",
        )?;
        let mut dashboard = dashboard(&dir);

        let ghi = dashboard.view(None, Metric::Ghi)?;
        let labels: Vec<&str> = ghi.ranking.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["Benin", "Sierra Leone", "Togo"]);

        // no DNI was recorded in Sierra Leone, so it drops out of that view only
        let dni = dashboard.view(None, Metric::Dni)?;
        let labels: Vec<&str> = dni.ranking.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["Togo", "Benin"]);
        let boxplot: Vec<&str> = dni.boxplot.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(boxplot, vec!["Benin", "Togo"]);
        Ok(())
    }

    #[test]
    fn test_missing_source_file() {
        let config = DashboardConfig::builder()
            .data_dir("no/such/dir")
            .sources(vec![CountrySource::new("Benin", "benin_clean.csv")])
            .build();
        let mut dashboard = Dashboard::new(config);
        assert!(matches!(
            dashboard.view(None, Metric::Ghi),
            Err(SolarError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_metric_parsing() {
        assert_eq!("GHI".parse::<Metric>().ok(), Some(Metric::Ghi));
        assert_eq!(" dhi ".parse::<Metric>().ok(), Some(Metric::Dhi));
        assert!("WS".parse::<Metric>().is_err());
    }
}
