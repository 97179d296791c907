use chrono::{NaiveDate, TimeDelta};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use polars::prelude::*;
use solar_eda::{
    aggregate_mean, pearson, resample, spearman, Frequency, FrequencyLabels, ObservationTable,
};

const ROWS: usize = 50_000;

fn synthetic_table() -> ObservationTable {
    let start = NaiveDate::from_ymd_opt(2021, 8, 9)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid start date");
    let countries = ["Benin", "Sierra Leone", "Togo"];

    let timestamps: Vec<String> = (0..ROWS)
        .map(|i| (start + TimeDelta::minutes(i as i64)).format("%Y-%m-%d %H:%M").to_string())
        .collect();
    let labels: Vec<&str> = (0..ROWS).map(|i| countries[i % 3]).collect();
    let ghi: Vec<f64> = (0..ROWS)
        .map(|i| ((i % 1440) as f64 / 1440.0 * std::f64::consts::PI).sin() * 900.0)
        .collect();
    let dni: Vec<f64> = ghi.iter().enumerate().map(|(i, g)| g * 0.8 + (i % 7) as f64).collect();

    let frame = df!(
        "Timestamp" => timestamps,
        "Country" => labels,
        "GHI" => ghi,
        "DNI" => dni
    )
    .expect("valid frame");
    ObservationTable::from_frame(frame, &["Timestamp"]).expect("valid table")
}

fn bench_statistics(c: &mut Criterion) {
    let table = synthetic_table();
    let labels = FrequencyLabels::default();

    c.bench_function("aggregate_mean", |b| {
        b.iter(|| aggregate_mean(black_box(&table), "Country", "GHI"))
    });
    c.bench_function("resample_daily_monthly", |b| {
        b.iter(|| {
            resample(
                black_box(&table),
                &["GHI", "DNI"],
                "Timestamp",
                &[Frequency::Daily, Frequency::Monthly],
                &labels,
            )
        })
    });
    c.bench_function("pearson", |b| b.iter(|| pearson(black_box(&table), "GHI", "DNI")));
    c.bench_function("spearman", |b| b.iter(|| spearman(black_box(&table), "GHI", "DNI")));
}

criterion_group!(benches, bench_statistics);
criterion_main!(benches);
