use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use covenant_core::config::CovenantConfig;
use covenant_core::models::{BucketType, MetricEvent};
use covenant_storage::StorageEngine;
use covenant_temporal::{TemporalEngine, TrendClassifier};

fn bench_classify(c: &mut Criterion) {
    let classifier = TrendClassifier::default();
    let values: Vec<f64> = (0..120).map(|i| 100.0 + (i as f64 * 0.7).sin() * 15.0).collect();

    c.bench_function("classify_120_points", |b| {
        b.iter(|| classifier.classify_values(black_box(&values)))
    });
}

fn bench_ingest(c: &mut Criterion) {
    let store = Arc::new(StorageEngine::open_in_memory().unwrap());
    let engine = TemporalEngine::new(store, &CovenantConfig::default());
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let now = start + Duration::days(400);
    let events: Vec<MetricEvent> = (0..500)
        .map(|i| MetricEvent::new(start + Duration::hours(i * 13), "contract_value", 10.0, BucketType::Month))
        .collect();

    c.bench_function("ingest_batch_500", |b| {
        b.iter(|| engine.bucketer.ingest_batch("bench", black_box(&events), now).unwrap())
    });
}

criterion_group!(benches, bench_classify, bench_ingest);
criterion_main!(benches);
