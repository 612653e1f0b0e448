use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rusty_potential::{
    features::FeatureWindower,
    models::{DecomposableModel, ForecastModel, RecurrentModel},
    ranking::RankingAggregator,
    types::{Bar, BarSeries, Forecast},
};

fn series(len: usize) -> BarSeries {
    let start = Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap();
    let bars = (0..len)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.15).sin() * 5.0 + i as f64 * 0.1;
            Bar::new(start + Duration::days(i as i64), close - 0.5, close + 1.0, close - 1.0, close, 1e6)
        })
        .collect();
    BarSeries::new("BENCH", bars)
}

fn benchmark_windowing(c: &mut Criterion) {
    let series = series(250);
    let windower = FeatureWindower::default();

    c.bench_function("prepare_training_250_bars", |b| {
        b.iter(|| windower.prepare_training(black_box(&series)));
    });
}

fn benchmark_recurrent(c: &mut Criterion) {
    let series = series(120);
    let windower = FeatureWindower::default();
    let model = RecurrentModel::default();
    let set = windower.prepare_training(&series).unwrap();

    c.bench_function("recurrent_train_120_bars", |b| {
        b.iter(|| model.train(black_box(&set.samples)));
    });
}

fn benchmark_decomposable(c: &mut Criterion) {
    let series = series(250);
    let model = DecomposableModel::default();

    c.bench_function("decomposable_fit_250_bars", |b| {
        b.iter(|| model.train(black_box(&series)));
    });
}

fn benchmark_ranking(c: &mut Criterion) {
    let forecasts: Vec<Forecast> = (0..500)
        .map(|i| {
            let p = ((i * 7919) % 1000) as f64 / 1000.0 - 0.5;
            Forecast::new(format!("T{i}"), p, 100.0, 100.0 * (1.0 + p))
        })
        .collect();
    let aggregator = RankingAggregator::default();

    c.bench_function("rank_500_forecasts", |b| {
        b.iter(|| aggregator.rank(black_box(&forecasts)));
    });
}

criterion_group!(
    benches,
    benchmark_windowing,
    benchmark_recurrent,
    benchmark_decomposable,
    benchmark_ranking
);
criterion_main!(benches);
