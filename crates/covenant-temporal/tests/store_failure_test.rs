//! Behaviour when the alert store fails or loses races: work already
//! committed is reported, and the next run finishes what was left owed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use covenant_core::config::CovenantConfig;
use covenant_core::errors::{CovenantError, CovenantResult, EntityKind, StorageError};
use covenant_core::models::*;
use covenant_core::traits::{IAlertStorage, IAnomalyStorage};
use covenant_storage::StorageEngine;
use covenant_temporal::{
    AlertLifecycle, AnomalyDetector, MetricBucketer, RenewalForecaster, TimeWindow,
};

const ENT: &str = "ent-1";

// ═══════════════════════════════════════════════════════════════════════════
// Test Infrastructure
// ═══════════════════════════════════════════════════════════════════════════

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

/// Alert store that fails the next `failing_inserts` inserts and, when
/// `lose_races` is set, reports every conditional update as lost.
struct UnreliableAlerts {
    inner: Arc<StorageEngine>,
    failing_inserts: AtomicUsize,
    lose_races: bool,
    update_attempts: AtomicUsize,
}

impl UnreliableAlerts {
    fn new(inner: Arc<StorageEngine>, failing_inserts: usize, lose_races: bool) -> Arc<Self> {
        Arc::new(Self {
            inner,
            failing_inserts: AtomicUsize::new(failing_inserts),
            lose_races,
            update_attempts: AtomicUsize::new(0),
        })
    }
}

impl IAlertStorage for UnreliableAlerts {
    fn insert_alert(&self, alert: &TemporalAlert) -> CovenantResult<bool> {
        let remaining = self.failing_inserts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_inserts.store(remaining - 1, Ordering::SeqCst);
            return Err(StorageError::Busy {
                message: "alert table locked".to_string(),
            }
            .into());
        }
        self.inner.insert_alert(alert)
    }

    fn get_alert(&self, enterprise_id: &str, id: &str) -> CovenantResult<Option<TemporalAlert>> {
        self.inner.get_alert(enterprise_id, id)
    }

    fn update_alert_if_status(
        &self,
        alert: &TemporalAlert,
        expected: AlertStatus,
    ) -> CovenantResult<bool> {
        self.update_attempts.fetch_add(1, Ordering::SeqCst);
        if self.lose_races {
            return Ok(false);
        }
        self.inner.update_alert_if_status(alert, expected)
    }

    fn list_active_alerts(
        &self,
        enterprise_id: &str,
        limit: usize,
    ) -> CovenantResult<Vec<TemporalAlert>> {
        self.inner.list_active_alerts(enterprise_id, limit)
    }
}

fn detector(store: &Arc<StorageEngine>, alerts: Arc<UnreliableAlerts>) -> AnomalyDetector {
    AnomalyDetector::new(
        store.clone(),
        store.clone(),
        AlertLifecycle::new(alerts),
        CovenantConfig::default().anomaly,
    )
}

fn seed_spike(store: &Arc<StorageEngine>) {
    let bucketer = MetricBucketer::new(store.clone(), CovenantConfig::default().temporal);
    for (i, v) in [100.0, 102.0, 98.0, 101.0, 99.0, 100.0, 300.0].iter().enumerate() {
        let event = MetricEvent::new(
            Utc.with_ymd_and_hms(2024, i as u32 + 1, 15, 0, 0, 0).unwrap(),
            "contract_value",
            *v,
            BucketType::Month,
        );
        bucketer.ingest(ENT, &event, at(2025, 1, 1)).unwrap();
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Anomaly alerts
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn failed_anomaly_alert_is_raised_on_the_next_run() {
    let store = Arc::new(StorageEngine::open_in_memory().unwrap());
    seed_spike(&store);
    let alerts = UnreliableAlerts::new(store.clone(), 1, false);
    let detector = detector(&store, alerts);
    let window = TimeWindow::new(at(2024, 1, 1), at(2024, 9, 1)).unwrap();
    let now = at(2024, 9, 1);

    let first = detector
        .detect(ENT, "contract_value", BucketType::Month, window, now)
        .unwrap();
    assert_eq!(first.items.len(), 1);
    assert!(first.items[0].alert_pending);
    assert_eq!(first.failures.len(), 1);
    assert_eq!(first.failures[0].item, first.items[0].id);
    assert!(store.list_active_alerts(ENT, 10).unwrap().is_empty());

    let second = detector
        .detect(ENT, "contract_value", BucketType::Month, window, now)
        .unwrap();
    assert!(second.items.is_empty());
    assert!(second.is_clean());

    let active = store.list_active_alerts(ENT, 10).unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].alert_data["anomaly_id"], first.items[0].id.as_str());
    assert!(!detector.get(ENT, &first.items[0].id).unwrap().alert_pending);

    // Nothing owed any more: a third run raises nothing new.
    detector
        .detect(ENT, "contract_value", BucketType::Month, window, now)
        .unwrap();
    assert_eq!(store.list_active_alerts(ENT, 10).unwrap().len(), 1);
}

#[test]
fn sweep_reports_alert_failure_without_dropping_anomalies() {
    let store = Arc::new(StorageEngine::open_in_memory().unwrap());
    seed_spike(&store);
    let detector = detector(&store, UnreliableAlerts::new(store.clone(), 1, false));
    let window = TimeWindow::new(at(2024, 1, 1), at(2024, 9, 1)).unwrap();

    let report = detector.sweep(ENT, BucketType::Month, window, at(2024, 9, 1)).unwrap();
    assert_eq!(report.items.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(store.list_unresolved_anomalies(ENT, 10).unwrap().len(), 1);
}

#[test]
fn resolved_anomaly_is_no_longer_owed_an_alert() {
    let store = Arc::new(StorageEngine::open_in_memory().unwrap());
    seed_spike(&store);
    let detector = detector(&store, UnreliableAlerts::new(store.clone(), 1, false));
    let window = TimeWindow::new(at(2024, 1, 1), at(2024, 9, 1)).unwrap();

    let first = detector
        .detect(ENT, "contract_value", BucketType::Month, window, at(2024, 9, 1))
        .unwrap();
    detector
        .resolve(ENT, &first.items[0].id, Some("known spike"), at(2024, 9, 2))
        .unwrap();

    let second = detector
        .detect(ENT, "contract_value", BucketType::Month, window, at(2024, 9, 3))
        .unwrap();
    assert!(second.is_clean());
    assert!(store.list_active_alerts(ENT, 10).unwrap().is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════
// Renewal at-risk alerts
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn failed_at_risk_alert_is_reported_and_retried() {
    let store = Arc::new(StorageEngine::open_in_memory().unwrap());
    let now = at(2024, 6, 1);
    let forecaster = RenewalForecaster::new(
        store.clone(),
        AlertLifecycle::new(UnreliableAlerts::new(store.clone(), 1, false)),
        CovenantConfig::default().renewal,
    );
    let prediction = forecaster
        .record_prediction(
            ENT,
            RenewalPredictionInput {
                contract_id: "contract-7".to_string(),
                probability: 0.1,
                predicted_date: Some(now + Duration::days(20)),
                predicted_value: Some(2_500.0),
            },
            now,
        )
        .unwrap();

    let first = forecaster.recompute(ENT, now).unwrap();
    assert_eq!(first.failures.len(), 1);
    assert_eq!(first.failures[0].item, prediction.id);
    assert!(store.list_active_alerts(ENT, 10).unwrap().is_empty());

    let second = forecaster.recompute(ENT, now).unwrap();
    assert!(second.is_clean());
    let active = store.list_active_alerts(ENT, 10).unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].alert_type, "renewal_at_risk");
}

// ═══════════════════════════════════════════════════════════════════════════
// Lost races
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn transition_that_keeps_losing_surfaces_conflict_after_one_retry() {
    let store = Arc::new(StorageEngine::open_in_memory().unwrap());
    let alerts = UnreliableAlerts::new(store.clone(), 0, true);
    let lifecycle = AlertLifecycle::new(alerts.clone());
    let alert = lifecycle
        .raise(ENT, NewAlert::new("manual_review", AlertSeverity::Info), at(2024, 1, 1))
        .unwrap()
        .unwrap();

    let err = lifecycle
        .acknowledge(ENT, &alert.id, "alice", at(2024, 1, 2))
        .unwrap_err();
    assert!(matches!(
        err,
        CovenantError::ConcurrencyConflict { entity: EntityKind::Alert, .. }
    ));
    assert!(err.is_retryable());
    assert_eq!(alerts.update_attempts.load(Ordering::SeqCst), 2);
    assert_eq!(lifecycle.get(ENT, &alert.id).unwrap().status, AlertStatus::Active);
}
