//! Per-group statistics: the ranked means shown in the "top countries" table and the
//! five-number summaries behind the box plot.

use crate::distribution::quantile_sorted;
use crate::error::SolarError;
use crate::table::ObservationTable;
use log::debug;
use ordered_float::OrderedFloat;
use polars::prelude::{col, IntoLazy};
use serde::Serialize;
use std::collections::HashMap;

/// Mean of a metric within one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMean {
    pub label: String,
    pub mean: f64,
}

/// Box-plot statistics of one group.
///
/// Whiskers reach the most extreme observations within 1.5 × IQR of the quartiles;
/// `outliers` counts the observations beyond them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub label: String,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: usize,
}

/// Mean of `value_column` per distinct label of `group_column`, highest mean first.
///
/// Rows with a missing label or a missing value are ignored, so a group whose values are
/// all missing does not appear in the result. Groups with equal means are ordered by label.
///
/// # Errors
///
/// [`SolarError::ColumnNotFound`] if either column is absent, [`SolarError::ColumnType`] if
/// `group_column` is not a label column or `value_column` is not numeric.
///
/// # Examples
///
/// ```
/// use polars::prelude::*;
/// use solar_eda::{aggregate_mean, GroupMean, ObservationTable};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let frame = df!(
///     "Country" => ["Benin", "Benin", "Togo"],
///     "GHI" => [500.0, 700.0, 300.0]
/// )?;
/// let table = ObservationTable::from_frame(frame, &[] as &[&str])?;
///
/// let ranking = aggregate_mean(&table, "Country", "GHI")?;
/// assert_eq!(ranking[0], GroupMean { label: "Benin".into(), mean: 600.0 });
/// assert_eq!(ranking[1], GroupMean { label: "Togo".into(), mean: 300.0 });
/// # Ok(())
/// # }
/// ```
pub fn aggregate_mean(
    table: &ObservationTable,
    group_column: &str,
    value_column: &str,
) -> Result<Vec<GroupMean>, SolarError> {
    table.require_label(group_column)?;
    table.require_numeric(value_column)?;

    let means = table
        .frame()
        .clone()
        .lazy()
        .filter(
            col(group_column)
                .is_not_null()
                .and(col(value_column).is_not_null()),
        )
        .group_by([col(group_column)])
        .agg([col(value_column).mean()])
        .collect()?;

    let labels = means.column(group_column)?.str()?;
    let values = means.column(value_column)?.f64()?;
    let mut ranking: Vec<GroupMean> = labels
        .into_iter()
        .zip(values.into_iter())
        .filter_map(|(label, mean)| {
            Some(GroupMean {
                label: label?.to_string(),
                mean: mean?,
            })
        })
        .collect();

    ranking.sort_by(|a, b| {
        OrderedFloat(b.mean)
            .cmp(&OrderedFloat(a.mean))
            .then_with(|| a.label.cmp(&b.label))
    });
    debug!(
        "Aggregated mean {} over {} groups of {}",
        value_column,
        ranking.len(),
        group_column
    );
    Ok(ranking)
}

/// Box-plot statistics of `value_column` per label of `group_column`, in the order labels
/// first appear.
///
/// Quartiles use linear interpolation between order statistics. Groups without observed
/// values are omitted.
pub fn group_summary(
    table: &ObservationTable,
    group_column: &str,
    value_column: &str,
) -> Result<Vec<GroupSummary>, SolarError> {
    let labels = table.labels(group_column)?;
    let values = table.numeric(value_column)?;

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<f64>)> = Vec::new();
    for (label, value) in labels.into_iter().zip(values) {
        if let (Some(label), Some(value)) = (label, value) {
            let slot = *index.entry(label.clone()).or_insert_with(|| {
                groups.push((label, Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(value);
        }
    }

    Ok(groups
        .into_iter()
        .filter_map(|(label, mut observed)| {
            observed.sort_by(f64::total_cmp);
            summarize(label, &observed)
        })
        .collect())
}

fn summarize(label: String, sorted: &[f64]) -> Option<GroupSummary> {
    let min = *sorted.first()?;
    let max = *sorted.last()?;
    let q1 = quantile_sorted(sorted, 0.25)?;
    let median = quantile_sorted(sorted, 0.5)?;
    let q3 = quantile_sorted(sorted, 0.75)?;

    let reach = 1.5 * (q3 - q1);
    let (low_fence, high_fence) = (q1 - reach, q3 + reach);
    let inside = move || {
        sorted
            .iter()
            .copied()
            .filter(move |v| *v >= low_fence && *v <= high_fence)
    };
    let lower_whisker = inside().next().unwrap_or(q1);
    let upper_whisker = inside().last().unwrap_or(q3);
    let outliers = sorted.len() - inside().count();

    Some(GroupSummary {
        label,
        count: sorted.len(),
        min,
        q1,
        median,
        q3,
        max,
        lower_whisker,
        upper_whisker,
        outliers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn table(frame: DataFrame) -> Result<ObservationTable, SolarError> {
        ObservationTable::from_frame(frame, &[] as &[&str])
    }

    #[test]
    fn test_mean_per_country() -> Result<(), Box<dyn std::error::Error>> {
        let t = table(df!(
            "Country" => ["Benin", "Benin", "Togo"],
            "GHI" => [500.0, 700.0, 300.0]
        )?)?;

        let ranking = aggregate_mean(&t, "Country", "GHI")?;
        assert_eq!(
            ranking,
            vec![
                GroupMean { label: "Benin".into(), mean: 600.0 },
                GroupMean { label: "Togo".into(), mean: 300.0 },
            ]
        );
        Ok(())
    }

    #[test]
    fn test_missing_values_skipped_not_zeroed() -> Result<(), Box<dyn std::error::Error>> {
        let t = table(df!(
            "Country" => [Some("Benin"), Some("Benin"), Some("Togo"), None, Some("Sierra Leone")],
            "GHI" => [Some(400.0), None, Some(100.0), Some(9999.0), None]
        )?)?;

        let ranking = aggregate_mean(&t, "Country", "GHI")?;
        // Sierra Leone has no observed value and is omitted, the unlabeled row is ignored
        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking[0], GroupMean { label: "Benin".into(), mean: 400.0 });
        assert_eq!(ranking[1], GroupMean { label: "Togo".into(), mean: 100.0 });
        Ok(())
    }

    #[test]
    fn test_sorted_descending_ties_by_label() -> Result<(), Box<dyn std::error::Error>> {
        let t = table(df!(
            "Country" => ["Togo", "Benin", "Niger", "Mali", "Mali"],
            "GHI" => [250.0, 250.0, 900.0, 10.0, 20.0]
        )?)?;

        let ranking = aggregate_mean(&t, "Country", "GHI")?;
        let order: Vec<&str> = ranking.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(order, vec!["Niger", "Benin", "Togo", "Mali"]);
        for pair in ranking.windows(2) {
            assert!(pair[0].mean >= pair[1].mean);
        }
        Ok(())
    }

    #[test]
    fn test_unknown_columns() -> Result<(), Box<dyn std::error::Error>> {
        let t = table(df!("Country" => ["Benin"], "GHI" => [1.0])?)?;
        assert!(matches!(
            aggregate_mean(&t, "Region", "GHI"),
            Err(SolarError::ColumnNotFound(c)) if c == "Region"
        ));
        assert!(matches!(
            aggregate_mean(&t, "Country", "DNI"),
            Err(SolarError::ColumnNotFound(c)) if c == "DNI"
        ));
        assert!(matches!(
            aggregate_mean(&t, "GHI", "GHI"),
            Err(SolarError::ColumnType { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_group_summary_quartiles() -> Result<(), Box<dyn std::error::Error>> {
        let t = table(df!(
            "Country" => ["Benin", "Benin", "Benin", "Benin", "Benin", "Togo"],
            "GHI" => [5.0, 1.0, 3.0, 2.0, 4.0, 7.0]
        )?)?;

        let summary = group_summary(&t, "Country", "GHI")?;
        assert_eq!(summary.len(), 2);

        let benin = &summary[0];
        assert_eq!(benin.label, "Benin");
        assert_eq!(benin.count, 5);
        assert_eq!((benin.min, benin.q1, benin.median, benin.q3, benin.max), (1.0, 2.0, 3.0, 4.0, 5.0));
        assert_eq!((benin.lower_whisker, benin.upper_whisker), (1.0, 5.0));
        assert_eq!(benin.outliers, 0);

        let togo = &summary[1];
        assert_eq!((togo.q1, togo.median, togo.q3), (7.0, 7.0, 7.0));
        Ok(())
    }

    #[test]
    fn test_group_summary_keeps_first_seen_order() -> Result<(), Box<dyn std::error::Error>> {
        let t = table(df!(
            "Country" => [Some("Togo"), Some("Benin"), Some("Togo"), Some("Niger"), None],
            "GHI" => [Some(1.0), Some(2.0), Some(3.0), None, Some(4.0)]
        )?)?;

        let summary = group_summary(&t, "Country", "GHI")?;
        let order: Vec<(&str, usize)> = summary
            .iter()
            .map(|s| (s.label.as_str(), s.count))
            .collect();
        // Niger has no observed value and is left out
        assert_eq!(order, vec![("Togo", 2), ("Benin", 1)]);
        Ok(())
    }

    #[test]
    fn test_group_summary_outliers() -> Result<(), Box<dyn std::error::Error>> {
        let t = table(df!(
            "Country" => ["Benin"; 6],
            "GHI" => [10.0, 11.0, 12.0, 13.0, 14.0, 100.0]
        )?)?;

        let summary = group_summary(&t, "Country", "GHI")?;
        assert_eq!(summary[0].outliers, 1);
        assert_eq!(summary[0].upper_whisker, 14.0);
        assert_eq!(summary[0].max, 100.0);
        Ok(())
    }
}
