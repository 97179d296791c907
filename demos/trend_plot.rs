//! demos/trend_plot.rs
//!
//! Loads one cleaned country file, resamples GHI and DNI to monthly means and plots both
//! trends with `plotlars`.
//!
//! To run this demo:
//! cargo run --example trend_plot --features demos -- data/benin_clean.csv

use std::collections::BTreeMap;
use std::error::Error;
use std::path::PathBuf;

use plotlars::{Axis, Legend, Line, Plot, Rgb, Shape, Text, TimeSeriesPlot};
use polars::prelude::*;
use solar_eda::{load_dataset, resample, Frequency, FrequencyLabels, Resampled, TIMESTAMP_COLUMN};

fn main() -> Result<(), Box<dyn Error>> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/benin_clean.csv"));

    println!("Loading {}...", path.display());
    let table = load_dataset(&path)?;

    let resampled = resample(
        &table,
        &["GHI", "DNI"],
        TIMESTAMP_COLUMN,
        &[Frequency::Monthly],
        &FrequencyLabels::default(),
    )?;
    let Some(monthly) = resampled.get(&Frequency::Monthly) else {
        return Err("no monthly series produced".into());
    };

    println!("Generating trend plot...");
    plot_trend(&trend_frame(monthly)?, &monthly.title());
    println!("Plot shown in browser.");

    Ok(())
}

/// Lines the GHI and DNI series up on their shared periods.
fn trend_frame(monthly: &Resampled) -> PolarsResult<DataFrame> {
    let mut rows: BTreeMap<String, (Option<f64>, Option<f64>)> = BTreeMap::new();
    for (index, column) in ["GHI", "DNI"].into_iter().enumerate() {
        let Some(series) = monthly.series(column) else {
            continue;
        };
        for (period, mean) in &series.points {
            let row = rows.entry(period.format("%Y-%m-%d").to_string()).or_default();
            if index == 0 {
                row.0 = Some(*mean);
            } else {
                row.1 = Some(*mean);
            }
        }
    }

    let periods: Vec<String> = rows.keys().cloned().collect();
    let ghi: Vec<Option<f64>> = rows.values().map(|r| r.0).collect();
    let dni: Vec<Option<f64>> = rows.values().map(|r| r.1).collect();
    df!("period" => periods, "GHI" => ghi, "DNI" => dni)
}

fn plot_trend(data: &DataFrame, title: &str) {
    TimeSeriesPlot::builder()
        .data(data)
        .x("period")
        .y("GHI")
        .additional_series(vec!["DNI"])
        .size(8)
        .colors(vec![Rgb(235, 117, 0), Rgb(69, 157, 230)])
        .lines(vec![Line::Solid, Line::Dash])
        .with_shape(true)
        .shapes(vec![Shape::Circle, Shape::Square])
        .plot_title(Text::from(title).font("Arial").size(18))
        .legend(&Legend::new().x(0.05).y(0.9))
        .x_title("period")
        .y_title(Text::from("W/m²").color(Rgb(0, 0, 0)))
        .y_axis(
            &Axis::new()
                .value_color(Rgb(0, 0, 0))
                .show_grid(false)
                .zero_line_color(Rgb(0, 0, 0)),
        )
        .build()
        .plot();
}
