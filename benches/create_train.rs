use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lagcast::data::{Column, Frame};
use lagcast::forecaster::{ForecasterDirect, ForecasterMultiSeries};
use lagcast::regressor::LinearRegression;
use rand::prelude::*;

fn create_series(n_rows: usize, n_series: usize) -> Frame {
    let mut rng = rand::thread_rng();

    let columns: Vec<Column> = (0..n_series)
        .map(|i| {
            // Random walk
            let mut level = rng.gen::<f64>() * 100.0;
            let values: Vec<f64> = (0..n_rows)
                .map(|_| {
                    level += rng.gen::<f64>() - 0.5;
                    level
                })
                .collect();
            Column::float(format!("series_{}", i), values)
        })
        .collect();

    Frame::with_range_index(columns).unwrap()
}

fn bench_create_train_x_y(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_train_x_y");

    for n_series in [1, 10, 50].iter() {
        let series = create_series(1000, *n_series);
        let forecaster = ForecasterMultiSeries::new(LinearRegression::new(), 24i64).unwrap();

        group.bench_with_input(BenchmarkId::new("multiseries", n_series), &series, |b, series| {
            b.iter(|| forecaster.create_train_x_y(black_box(series), None).unwrap())
        });
    }

    group.finish();
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit");
    group.sample_size(10);

    let series = create_series(2000, 10);
    group.bench_function("multiseries", |b| {
        b.iter(|| {
            let mut forecaster = ForecasterMultiSeries::new(LinearRegression::new(), 24i64).unwrap();
            forecaster.fit(black_box(&series), None).unwrap();
        })
    });

    let y = create_series(2000, 1);
    group.bench_function("direct_12_steps", |b| {
        b.iter(|| {
            let mut forecaster = ForecasterDirect::new(LinearRegression::new(), 24i64, 12).unwrap();
            forecaster.fit(black_box(&y), None).unwrap();
        })
    });

    group.finish();
}

criterion_group!(benches, bench_create_train_x_y, bench_fit);
criterion_main!(benches);
