//! Runtime wiring, on-demand batch jobs, and the background scheduler.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use covenant_core::errors::CovenantError;
use covenant_core::models::*;
use covenant_runtime::{CovenantRuntime, Job, RuntimeOptions, Scheduler};

const ENT: &str = "ent-1";

// ═══════════════════════════════════════════════════════════════════════════
// Test Infrastructure
// ═══════════════════════════════════════════════════════════════════════════

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

fn in_memory(config_toml: Option<&str>) -> CovenantRuntime {
    CovenantRuntime::open(RuntimeOptions {
        in_memory: true,
        config_toml: config_toml.map(str::to_string),
        ..Default::default()
    })
    .unwrap()
}

fn obligation(rt: &CovenantRuntime, title: &str, due: DateTime<Utc>) -> Obligation {
    rt.obligations
        .lifecycle
        .create(
            ENT,
            NewObligation {
                contract_id: "contract-1".to_string(),
                title: title.to_string(),
                obligation_type: "payment".to_string(),
                priority: ObligationPriority::High,
                due_date: Some(due),
                frequency: ObligationFrequency::OneTime,
                responsible_party: None,
            },
            at(2020, 1, 1),
        )
        .unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════
// Opening
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn jobs_over_empty_store_touch_nothing() {
    let rt = in_memory(None);
    let summaries = rt.run_all(at(2024, 6, 1)).unwrap();
    assert_eq!(summaries.len(), 4);
    for s in summaries {
        assert_eq!(s.enterprises, 0);
        assert!(s.failures.is_empty());
    }
}

#[test]
fn invalid_config_fails_to_open() {
    let err = CovenantRuntime::open(RuntimeOptions {
        in_memory: true,
        config_toml: Some("[renewal]\nhigh_threshold = 0.2\nmedium_threshold = 0.5\n".to_string()),
        ..Default::default()
    })
    .err()
    .unwrap();
    assert!(matches!(err, CovenantError::ConfigError(_)));
}

#[test]
fn file_backed_runtime_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("covenant.db");
    let options = RuntimeOptions {
        db_path: Some(path),
        ..Default::default()
    };

    let id = {
        let rt = CovenantRuntime::open(options.clone()).unwrap();
        obligation(&rt, "Persist me", at(2030, 1, 1)).id
    };

    let reopened = CovenantRuntime::open(options).unwrap();
    let o = reopened.obligations.lifecycle.get(ENT, &id).unwrap();
    assert_eq!(o.title, "Persist me");
}

// ═══════════════════════════════════════════════════════════════════════════
// On-demand jobs
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn anomaly_sweep_flags_spike_and_raises_alert() {
    let rt = in_memory(None);
    let now = at(2024, 9, 1);
    for (month, value) in [100.0, 102.0, 98.0, 101.0, 99.0, 100.0, 300.0].iter().enumerate() {
        let event = MetricEvent::new(
            Utc.with_ymd_and_hms(2024, month as u32 + 1, 10, 0, 0, 0).unwrap(),
            "contract_value",
            *value,
            BucketType::Month,
        );
        rt.temporal.bucketer.ingest(ENT, &event, now).unwrap();
    }

    let summary = rt.run_job(Job::AnomalySweep, now).unwrap();
    assert_eq!(summary.enterprises, 1);
    assert_eq!(summary.produced, 1);

    let alerts = rt.temporal.alerts.list_active(ENT, 10).unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, "anomaly_detected");

    let again = rt.run_job(Job::AnomalySweep, now).unwrap();
    assert_eq!(again.produced, 0);
}

#[test]
fn renewal_recompute_raises_at_risk_alert() {
    let rt = in_memory(None);
    let now = at(2024, 6, 1);
    rt.temporal
        .renewals
        .record_prediction(
            ENT,
            RenewalPredictionInput {
                contract_id: "contract-9".to_string(),
                probability: 0.2,
                predicted_date: Some(now + Duration::days(30)),
                predicted_value: Some(5_000.0),
            },
            now,
        )
        .unwrap();

    let summary = rt.run_job(Job::RenewalRecompute, now).unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.produced, 0);

    let alerts = rt.temporal.alerts.list_active(ENT, 10).unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, "renewal_at_risk");
    assert_eq!(alerts[0].contract_id.as_deref(), Some("contract-9"));
}

#[test]
fn overdue_sweep_runs_per_enterprise() {
    let rt = in_memory(None);
    let late = obligation(&rt, "Late", at(2024, 1, 1));
    obligation(&rt, "Future", at(2030, 1, 1));

    let summary = rt.run_job(Job::OverdueSweep, at(2024, 6, 1)).unwrap();
    assert_eq!(summary.job, Job::OverdueSweep);
    assert_eq!(summary.produced, 1);
    assert_eq!(
        rt.obligations.lifecycle.get(ENT, &late.id).unwrap().status,
        ObligationStatus::Overdue
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// Scheduler
// ═══════════════════════════════════════════════════════════════════════════

const ONLY_OVERDUE: &str = r#"
[scheduler]
anomaly_sweep_secs = 0
renewal_recompute_secs = 0
pattern_detection_secs = 0
overdue_sweep_secs = 1
"#;

#[tokio::test]
async fn scheduler_runs_enabled_jobs_until_shutdown() {
    let rt = Arc::new(in_memory(Some(ONLY_OVERDUE)));
    let late = obligation(&rt, "Late", at(2021, 1, 1));

    let handle = Scheduler::start(rt.clone());
    assert_eq!(handle.jobs(), vec![Job::OverdueSweep]);

    let mut status = ObligationStatus::Pending;
    for _ in 0..250 {
        status = rt.obligations.lifecycle.get(ENT, &late.id).unwrap().status;
        if status == ObligationStatus::Overdue {
            break;
        }
        tokio::time::sleep(StdDuration::from_millis(20)).await;
    }
    assert_eq!(status, ObligationStatus::Overdue);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn scheduler_with_every_job_disabled_is_idle() {
    let toml = r#"
[scheduler]
anomaly_sweep_secs = 0
renewal_recompute_secs = 0
pattern_detection_secs = 0
overdue_sweep_secs = 0
"#;
    let rt = Arc::new(in_memory(Some(toml)));
    let handle = Scheduler::start(rt);
    assert!(handle.jobs().is_empty());
    handle.shutdown().await.unwrap();
}
