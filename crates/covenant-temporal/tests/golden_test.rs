//! Golden fixture tests: frozen inputs and expected outputs from
//! `test-fixtures/golden/{trend,buckets,anomaly,renewal}/`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use covenant_core::config::{CovenantConfig, RenewalConfig};
use covenant_core::models::*;
use covenant_storage::StorageEngine;
use covenant_temporal::{TemporalEngine, TimeWindow, TrendClassifier};
use serde_json::Value;
use test_fixtures::load_fixture_value;

// ═══════════════════════════════════════════════════════════════════════════
// Test Infrastructure
// ═══════════════════════════════════════════════════════════════════════════

fn engine() -> TemporalEngine {
    let store = Arc::new(StorageEngine::open_in_memory().unwrap());
    TemporalEngine::new(store, &CovenantConfig::default())
}

fn ts(v: &Value) -> DateTime<Utc> {
    serde_json::from_value(v.clone()).unwrap()
}

fn f(v: &Value) -> f64 {
    v.as_f64().unwrap()
}

fn window(v: &Value) -> TimeWindow {
    TimeWindow::new(ts(&v["start"]), ts(&v["end"])).unwrap()
}

fn close(actual: f64, expected: f64, what: &str) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "{what}: expected {expected}, got {actual}"
    );
}

fn ingest_all(engine: &TemporalEngine, fixture: &Value) {
    let ent = fixture["enterprise_id"].as_str().unwrap();
    let category = fixture["metric_category"].as_str().unwrap();
    let bucket_type: BucketType = serde_json::from_value(fixture["bucket_type"].clone()).unwrap();
    let now = ts(&fixture["now"]);
    let events = fixture
        .get("events")
        .or_else(|| fixture.get("series"))
        .and_then(Value::as_array)
        .unwrap();
    for e in events {
        let event = MetricEvent::new(ts(&e["occurred_at"]), category, f(&e["value"]), bucket_type);
        engine.bucketer.ingest(ent, &event, now).unwrap();
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Trend
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn golden_trend_classification_cases() {
    let fixture = load_fixture_value("golden/trend/classification_cases.json");
    let classifier = TrendClassifier::default();

    for case in fixture["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let values: Vec<f64> = serde_json::from_value(case["values"].clone()).unwrap();
        let expected = &case["expected"];
        let result = classifier.classify_values(&values);

        let direction: TrendDirection =
            serde_json::from_value(expected["direction"].clone()).unwrap();
        assert_eq!(result.direction, direction, "{name}: direction");
        close(result.forecast.confidence, f(&expected["confidence"]), name);

        if let Some(change) = expected.get("change_percentage") {
            close(result.change_percentage, f(change), name);
        }
        if let Some(predicted) = expected.get("predicted_value") {
            close(result.forecast.predicted_value, f(predicted), name);
        }
        if let Some(lower) = expected.get("lower_bound") {
            close(result.forecast.lower_bound, f(lower), name);
            close(result.forecast.upper_bound, f(&expected["upper_bound"]), name);
        }
        if let Some(analysis) = expected.get("analysis_direction") {
            let direction: TrendDirection = serde_json::from_value(analysis.clone()).unwrap();
            assert_eq!(classifier.analyze_trend(&values).direction, direction, "{name}: analysis");
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Bucketing end to end
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn golden_quarterly_rollup() {
    let fixture = load_fixture_value("golden/buckets/quarterly_rollup.json");
    let engine = engine();
    ingest_all(&engine, &fixture);

    let series = engine
        .bucketer
        .get_series(
            fixture["enterprise_id"].as_str().unwrap(),
            fixture["metric_category"].as_str().unwrap(),
            BucketType::Quarter,
            window(&fixture["window"]),
        )
        .unwrap();

    let expected = fixture["expected_buckets"].as_array().unwrap();
    assert_eq!(series.len(), expected.len());
    for (bucket, exp) in series.iter().zip(expected) {
        assert_eq!(bucket.bucket_start, ts(&exp["bucket_start"]));
        assert_eq!(bucket.bucket_end, ts(&exp["bucket_end"]));
        assert_eq!(bucket.bucket_type.label(bucket.bucket_start), exp["label"].as_str().unwrap());
        close(bucket.aggregations.sum.unwrap(), f(&exp["sum"]), "sum");
        close(bucket.aggregations.average.unwrap(), f(&exp["average"]), "average");
        assert_eq!(bucket.aggregations.count, exp["count"].as_u64());
    }

    let points: Vec<TimeSeriesPoint> = series.iter().map(|m| m.to_point(Measure::Sum)).collect();
    let trend = engine.classifier.classify(&points);
    let exp = &fixture["expected_trend"];
    assert_eq!(trend.direction.as_str(), exp["direction"].as_str().unwrap());
    close(trend.change_percentage, f(&exp["change_percentage"]), "change");
    close(trend.forecast.predicted_value, f(&exp["predicted_value"]), "forecast");
}

// ═══════════════════════════════════════════════════════════════════════════
// Anomaly
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn golden_spike_detection() {
    let fixture = load_fixture_value("golden/anomaly/spike_detection.json");
    let engine = engine();
    ingest_all(&engine, &fixture);
    let ent = fixture["enterprise_id"].as_str().unwrap();

    let found = engine
        .anomalies
        .detect(
            ent,
            fixture["metric_category"].as_str().unwrap(),
            BucketType::Month,
            window(&fixture["window"]),
            ts(&fixture["now"]),
        )
        .unwrap();
    assert!(found.is_clean());

    let expected = fixture["expected_anomalies"].as_array().unwrap();
    assert_eq!(found.items.len(), expected.len());
    for (anomaly, exp) in found.items.iter().zip(expected) {
        assert_eq!(anomaly.bucket_start, ts(&exp["bucket_start"]));
        assert_eq!(anomaly.severity.as_str(), exp["severity"].as_str().unwrap());
        close(anomaly.baseline_value, f(&exp["baseline_value"]), "baseline");
        close(anomaly.observed_value, f(&exp["observed_value"]), "observed");
        close(anomaly.deviation, f(&exp["deviation"]), "deviation");
    }

    let alerts = engine.alerts.list_active(ent, 10).unwrap();
    let exp = &fixture["expected_alert"];
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, exp["alert_type"].as_str().unwrap());
    assert_eq!(alerts[0].severity.as_str(), exp["severity"].as_str().unwrap());
    assert_eq!(alerts[0].status.as_str(), exp["status"].as_str().unwrap());
    assert_eq!(alerts[0].alert_data["anomaly_id"], found.items[0].id.as_str());
}

// ═══════════════════════════════════════════════════════════════════════════
// Renewal
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn golden_quarterly_renewal_forecast() {
    let fixture = load_fixture_value("golden/renewal/quarterly_forecast.json");
    let engine = engine();
    let ent = fixture["enterprise_id"].as_str().unwrap();
    let now: DateTime<Utc> = "2024-01-01T00:00:00Z".parse().unwrap();

    for p in fixture["predictions"].as_array().unwrap() {
        let input: RenewalPredictionInput = serde_json::from_value(p.clone()).unwrap();
        engine.renewals.record_prediction(ent, input, now).unwrap();
    }

    let periods = fixture["periods"].as_u64().unwrap() as usize;
    let forecast = engine.renewals.forecast(ent, periods).unwrap();
    let expected: Vec<RenewalForecast> =
        serde_json::from_value(fixture["expected"].clone()).unwrap();
    assert_eq!(forecast, expected);

    assert_eq!(engine.renewals.forecast(ent, 10).unwrap().len(), 3);
}

#[test]
fn golden_tier_boundaries() {
    let fixture = load_fixture_value("golden/renewal/quarterly_forecast.json");
    let config = RenewalConfig::default();
    for case in fixture["tier_cases"].as_array().unwrap() {
        let p = f(&case["probability"]);
        let tier: PredictionTier = serde_json::from_value(case["tier"].clone()).unwrap();
        assert_eq!(config.tier_for(p), tier, "probability {p}");
    }
}
