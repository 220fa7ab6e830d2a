use std::{hint::black_box, time::Instant};

use bidder_metrics::{BidderMetrics, MetricsConfig};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

const ADAPTERS: &[&str] = &["appnexus", "conversant", "facebook", "index", "pubmatic", "rubicon"];

fn metrics() -> BidderMetrics {
    BidderMetrics::new(ADAPTERS, &MetricsConfig::default()).expect("failed to build metrics")
}

fn account_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("accounts");

    group.bench_function("cached lookup", |b| {
        let metrics = metrics();
        let _ = metrics.account_metrics("pub1");

        b.iter(|| metrics.account_metrics(black_box("pub1")))
    });

    group.bench_function("uncached lookup", |b| {
        b.iter_batched_ref(
            metrics,
            |metrics| metrics.account_metrics(black_box("pub1")),
            BatchSize::SmallInput,
        )
    });

    group.bench_function("adapter lookup", |b| {
        let metrics = metrics();
        b.iter(|| metrics.adapter_metrics(black_box("rubicon")))
    });

    group.bench_function("unknown adapter lookup", |b| {
        let metrics = metrics();
        b.iter(|| metrics.adapter_metrics(black_box("unknown")))
    });

    group.finish();
}

fn update_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("updates");

    group.bench_function("counter increment", |b| {
        let metrics = metrics();
        b.iter(|| metrics.inc_request(black_box(1)))
    });

    group.bench_function("request timer", |b| {
        let metrics = metrics();
        let start = Instant::now();
        b.iter(|| metrics.update_request_timer_since(black_box(start)))
    });

    group.bench_function("account price histogram", |b| {
        let metrics = metrics();
        let account = metrics.account_metrics("pub1");
        let mut price = 0i64;
        b.iter(|| {
            price = (price + 37) % 20_000;
            account.update_price_histogram(black_box(price))
        })
    });

    group.finish();
}

criterion_group!(benches, account_benchmark, update_benchmark);
criterion_main!(benches);
