//! Benchmarks for the feature pipeline.

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tickers::{prelude::*, volume::normalize_volume};

/// Deterministic pseudo-random daily bars
fn generate_bars(n: usize) -> Vec<PriceBar> {
    let start = NaiveDate::from_ymd_opt(2000, 1, 3).unwrap();
    let mut bars = Vec::with_capacity(n);
    let mut price = 100.0;

    for i in 0..n {
        let change = ((i * 7 + 13) % 100) as f64 / 50.0 - 1.0;
        let volatility = 2.0 + ((i * 3) % 10) as f64 / 5.0;
        let volume = 1_000_000.0 * (1.0 + ((i * 31) % 17) as f64 / 4.0);

        let o = price;
        let c = price + change;
        let h = o.max(c) + volatility * 0.5;
        let l = o.min(c) - volatility * 0.5;

        bars.push(PriceBar::new(start + Duration::days(i as i64), o, h, l, c, volume));
        price = c;
    }

    bars
}

fn bench_compute(c: &mut Criterion) {
    let pipeline = PipelineBuilder::new().with_all_defaults().build().unwrap();

    let mut group = c.benchmark_group("compute");
    for size in [1000, 5000].iter() {
        let bars = generate_bars(*size);
        group.bench_with_input(BenchmarkId::new("all_features", size), size, |b, _| {
            b.iter(|| {
                let _ = black_box(pipeline.compute(black_box(&bars)));
            })
        });
    }
    group.finish();
}

fn bench_signals_only(c: &mut Criterion) {
    let bars = generate_bars(5000);
    let pipeline = PipelineBuilder::new().with_all_defaults().build().unwrap();

    c.bench_function("signals_5000_bars", |b| {
        b.iter(|| {
            let _ = black_box(pipeline.signals(black_box(&bars)));
        })
    });
}

fn bench_volume(c: &mut Criterion) {
    let bars = generate_bars(5000);
    let config = VolumeConfig::default();

    c.bench_function("normalize_volume_5000_bars", |b| {
        b.iter(|| {
            let _ = black_box(normalize_volume(black_box(&bars), &config));
        })
    });
}

fn bench_parallel(c: &mut Criterion) {
    let series: Vec<(String, Vec<PriceBar>)> = (0..8)
        .map(|i| (format!("SYM{i}"), generate_bars(1000)))
        .collect();
    let pipeline = PipelineBuilder::new().with_all_defaults().build().unwrap();

    c.bench_function("parallel_8_instruments", |b| {
        b.iter(|| {
            let instruments: Vec<(&str, &[PriceBar])> = series
                .iter()
                .map(|(s, bars)| (s.as_str(), bars.as_slice()))
                .collect();
            let _ = black_box(compute_parallel(black_box(&pipeline), instruments));
        })
    });
}

criterion_group!(
    benches,
    bench_compute,
    bench_signals_only,
    bench_volume,
    bench_parallel,
);

criterion_main!(benches);
