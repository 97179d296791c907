//! Pearson and Spearman correlation between numeric columns, with two-sided p-values.

use crate::error::SolarError;
use crate::table::ObservationTable;
use log::debug;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CorrelationMethod {
    /// Linear association.
    Pearson,
    /// Monotonic association: Pearson over average ranks.
    Spearman,
}

/// Correlation of two columns over their paired observations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Correlation {
    /// In `[-1, 1]`.
    pub coefficient: f64,
    /// Two-sided p-value under the null hypothesis of no association, in `[0, 1]`.
    pub p_value: f64,
    /// Number of paired observations used.
    pub n: usize,
}

/// Pearson correlation of `column_a` and `column_b`.
///
/// Only rows where both values are present are used. The p-value comes from a t-test with
/// `n - 2` degrees of freedom.
///
/// # Errors
///
/// * [`SolarError::ColumnNotFound`] / [`SolarError::ColumnType`] for absent or non-numeric
///   columns.
/// * [`SolarError::InsufficientData`] with fewer than two paired observations.
/// * [`SolarError::ZeroVariance`] if either column is constant over the paired rows.
///
/// # Examples
///
/// ```
/// use polars::prelude::*;
/// use solar_eda::{pearson, ObservationTable};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let frame = df!("GHI" => [1.0, 2.0, 3.0], "DNI" => [2.0, 4.0, 6.5])?;
/// let table = ObservationTable::from_frame(frame, &[] as &[&str])?;
///
/// let same = pearson(&table, "GHI", "GHI")?;
/// assert_eq!(same.coefficient, 1.0);
/// assert_eq!(same.p_value, 0.0);
/// assert!(pearson(&table, "GHI", "DNI")?.coefficient > 0.99);
/// # Ok(())
/// # }
/// ```
pub fn pearson(
    table: &ObservationTable,
    column_a: &str,
    column_b: &str,
) -> Result<Correlation, SolarError> {
    correlate(table, column_a, column_b, CorrelationMethod::Pearson)
}

/// Spearman rank correlation of `column_a` and `column_b`. Tied values share their average
/// rank. Errors as for [`pearson`].
pub fn spearman(
    table: &ObservationTable,
    column_a: &str,
    column_b: &str,
) -> Result<Correlation, SolarError> {
    correlate(table, column_a, column_b, CorrelationMethod::Spearman)
}

pub fn correlate(
    table: &ObservationTable,
    column_a: &str,
    column_b: &str,
    method: CorrelationMethod,
) -> Result<Correlation, SolarError> {
    let (x, y) = paired(table, column_a, column_b)?;
    let correlation = correlate_pairs(&x, &y, column_a, column_b, method)?;
    debug!(
        "{:?} correlation {} ~ {}: r = {:.4}, p = {:.4}, n = {}",
        method, column_a, column_b, correlation.coefficient, correlation.p_value, correlation.n
    );
    Ok(correlation)
}

/// Pairwise coefficients between several columns, as shown in a correlation heatmap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub method: CorrelationMethod,
    pub columns: Vec<String>,
    /// `values[i][j]` correlates `columns[i]` with `columns[j]`; `None` where the pair has
    /// too few observations or a constant column, including the diagonal of a constant
    /// column.
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, column_a: &str, column_b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == column_a)?;
        let j = self.columns.iter().position(|c| c == column_b)?;
        self.values[i][j]
    }
}

/// Correlation matrix over pairwise-complete observations: each pair of columns uses every
/// row where both are present.
///
/// # Errors
///
/// [`SolarError::ColumnNotFound`] / [`SolarError::ColumnType`] if a column is absent or not
/// numeric. Undefined pairs are reported as `None`, not as errors.
pub fn correlation_matrix<S: AsRef<str>>(
    table: &ObservationTable,
    columns: &[S],
    method: CorrelationMethod,
) -> Result<CorrelationMatrix, SolarError> {
    let names: Vec<String> = columns.iter().map(|c| c.as_ref().to_string()).collect();
    let data = names
        .iter()
        .map(|name| table.numeric(name))
        .collect::<Result<Vec<_>, _>>()?;

    let mut values = vec![vec![None; names.len()]; names.len()];
    for i in 0..names.len() {
        for j in i..names.len() {
            let (x, y): (Vec<f64>, Vec<f64>) = data[i]
                .iter()
                .zip(&data[j])
                .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
                .unzip();
            let coefficient = match correlate_pairs(&x, &y, &names[i], &names[j], method) {
                Ok(c) => Some(c.coefficient),
                Err(SolarError::InsufficientData { .. }) | Err(SolarError::ZeroVariance(_)) => {
                    None
                }
                Err(e) => return Err(e),
            };
            values[i][j] = coefficient;
            values[j][i] = coefficient;
        }
    }

    Ok(CorrelationMatrix {
        method,
        columns: names,
        values,
    })
}

/// Values of both columns on the rows where both are present.
fn paired(
    table: &ObservationTable,
    column_a: &str,
    column_b: &str,
) -> Result<(Vec<f64>, Vec<f64>), SolarError> {
    let a = table.numeric(column_a)?;
    let b = table.numeric(column_b)?;
    Ok(a.into_iter()
        .zip(b)
        .filter_map(|(x, y)| Some((x?, y?)))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .unzip())
}

fn correlate_pairs(
    x: &[f64],
    y: &[f64],
    column_a: &str,
    column_b: &str,
    method: CorrelationMethod,
) -> Result<Correlation, SolarError> {
    let n = x.len();
    if n < 2 {
        return Err(SolarError::InsufficientData {
            required: 2,
            found: n,
        });
    }
    let coefficient = match method {
        CorrelationMethod::Pearson => pearson_coefficient(x, y, column_a, column_b)?,
        CorrelationMethod::Spearman => {
            pearson_coefficient(&ranks(x), &ranks(y), column_a, column_b)?
        }
    };
    Ok(Correlation {
        coefficient,
        p_value: p_value(coefficient, n)?,
        n,
    })
}

fn pearson_coefficient(
    x: &[f64],
    y: &[f64],
    column_a: &str,
    column_b: &str,
) -> Result<f64, SolarError> {
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 {
        return Err(SolarError::ZeroVariance(column_a.to_string()));
    }
    if syy == 0.0 {
        return Err(SolarError::ZeroVariance(column_b.to_string()));
    }
    // sqrt of the product keeps self-correlation at exactly 1
    Ok((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Two-sided p-value of `r` over `n` pairs from Student's t with `n - 2` degrees of freedom.
fn p_value(r: f64, n: usize) -> Result<f64, SolarError> {
    if n <= 2 {
        return Ok(1.0);
    }
    let remaining = 1.0 - r * r;
    if remaining <= 0.0 {
        return Ok(0.0);
    }
    let degrees = (n - 2) as f64;
    let t = r * (degrees / remaining).sqrt();
    let distribution = StudentsT::new(0.0, 1.0, degrees)
        .map_err(|e| SolarError::Distribution(e.to_string()))?;
    Ok((2.0 * distribution.sf(t.abs())).clamp(0.0, 1.0))
}

/// 1-based ranks; tied values share the mean of the ranks they span.
pub(crate) fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end hold ranks start+1..=end
        let shared = (start + 1 + end) as f64 / 2.0;
        for &index in &order[start..end] {
            ranks[index] = shared;
        }
        start = end;
    }
    ranks
}
