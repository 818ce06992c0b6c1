//! Query-level behaviour against an in-memory engine: bucket math, dedupe,
//! conditional writes, and the store-side cycle check.

use std::collections::HashMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use covenant_core::errors::{CovenantError, StorageError};
use covenant_core::models::*;
use covenant_core::traits::*;
use covenant_storage::StorageEngine;

const ENT: &str = "ent-1";

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

fn bucket_write(category: &str, start: DateTime<Utc>, value: f64) -> BucketWrite {
    let (bucket_start, bucket_end) = BucketType::Quarter.bounds(start).unwrap();
    BucketWrite {
        enterprise_id: ENT.to_string(),
        metric_category: category.to_string(),
        bucket_type: BucketType::Quarter,
        bucket_start,
        bucket_end,
        value,
        dimensions: HashMap::new(),
        observed_at: start,
    }
}

fn obligation(id: &str) -> Obligation {
    let now = at(2024, 1, 1);
    Obligation {
        id: id.to_string(),
        enterprise_id: ENT.to_string(),
        contract_id: "c-1".to_string(),
        title: format!("Obligation {id}"),
        obligation_type: "reporting".to_string(),
        status: ObligationStatus::Pending,
        priority: ObligationPriority::Medium,
        due_date: Some(at(2024, 3, 1)),
        frequency: ObligationFrequency::OneTime,
        responsible_party: None,
        completed_at: None,
        at_risk: false,
        created_at: now,
        updated_at: now,
    }
}

fn edge(from: &str, to: &str) -> ObligationDependency {
    ObligationDependency {
        id: format!("{from}->{to}"),
        enterprise_id: ENT.to_string(),
        obligation_id: from.to_string(),
        depends_on_id: to.to_string(),
        dependency_type: DependencyType::Prerequisite,
        cascade_on_delay: true,
        created_at: at(2024, 1, 2),
    }
}

fn alert(id: &str, dedupe: Option<&str>) -> TemporalAlert {
    TemporalAlert {
        id: id.to_string(),
        enterprise_id: ENT.to_string(),
        contract_id: None,
        alert_type: "anomaly_detected".to_string(),
        severity: AlertSeverity::Critical,
        status: AlertStatus::Active,
        triggered_at: at(2024, 2, 1),
        acknowledged_at: None,
        acknowledged_by: None,
        resolved_at: None,
        resolved_by: None,
        alert_data: serde_json::json!({"k": 1}),
        dedupe_key: dedupe.map(str::to_string),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// METRICS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn upsert_folds_values_into_running_aggregations() {
    let store = StorageEngine::open_in_memory().unwrap();
    store.upsert_bucket(&bucket_write("revenue", at(2024, 1, 15), 100.0)).unwrap();
    store.upsert_bucket(&bucket_write("revenue", at(2024, 2, 15), 100.0)).unwrap();
    let row = store
        .upsert_bucket(&bucket_write("revenue", at(2024, 3, 15), 40.0))
        .unwrap();

    assert_eq!(row.aggregations.sum, Some(240.0));
    assert_eq!(row.aggregations.count, Some(3));
    assert_eq!(row.aggregations.average, Some(80.0));
    assert_eq!(row.bucket_start, at(2024, 1, 1));
    assert_eq!(row.created_at, at(2024, 1, 15));
    assert_eq!(row.updated_at, at(2024, 3, 15));
}

#[test]
fn dimensions_are_kept_from_the_first_event() {
    let store = StorageEngine::open_in_memory().unwrap();
    let mut first = bucket_write("revenue", at(2024, 1, 15), 1.0);
    first.dimensions.insert("region".into(), "emea".into());
    store.upsert_bucket(&first).unwrap();

    let mut second = bucket_write("revenue", at(2024, 1, 16), 1.0);
    second.dimensions.insert("region".into(), "apac".into());
    let row = store.upsert_bucket(&second).unwrap();
    assert_eq!(row.dimensions.get("region").map(String::as_str), Some("emea"));
}

#[test]
fn series_is_ordered_and_window_filtered() {
    let store = StorageEngine::open_in_memory().unwrap();
    for (month, value) in [(7, 5.0), (1, 1.0), (4, 3.0)] {
        store.upsert_bucket(&bucket_write("spend", at(2024, month, 10), value)).unwrap();
    }
    let series = store
        .get_series(ENT, "spend", BucketType::Quarter, at(2024, 2, 1), at(2024, 6, 30))
        .unwrap();
    let starts: Vec<_> = series.iter().map(|m| m.bucket_start).collect();
    assert_eq!(starts, vec![at(2024, 1, 1), at(2024, 4, 1)]);

    let other_tenant = store
        .get_series("ent-2", "spend", BucketType::Quarter, at(2020, 1, 1), at(2030, 1, 1))
        .unwrap();
    assert!(other_tenant.is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════
// ALERTS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn open_alerts_with_same_dedupe_key_are_stored_once() {
    let store = StorageEngine::open_in_memory().unwrap();
    assert!(store.insert_alert(&alert("a1", Some("k"))).unwrap());
    assert!(!store.insert_alert(&alert("a2", Some("k"))).unwrap());
    // No key, no dedupe.
    assert!(store.insert_alert(&alert("a3", None)).unwrap());
    assert!(store.insert_alert(&alert("a4", None)).unwrap());
}

#[test]
fn dedupe_key_is_released_once_the_alert_closes() {
    let store = StorageEngine::open_in_memory().unwrap();
    let mut first = alert("a1", Some("k"));
    store.insert_alert(&first).unwrap();

    first.status = AlertStatus::Resolved;
    first.resolved_at = Some(at(2024, 2, 2));
    first.resolved_by = Some("ops".into());
    assert!(store.update_alert_if_status(&first, AlertStatus::Active).unwrap());

    assert!(store.insert_alert(&alert("a2", Some("k"))).unwrap());
}

#[test]
fn duplicate_alert_id_is_an_error_not_a_dedupe_hit() {
    let store = StorageEngine::open_in_memory().unwrap();
    assert!(store.insert_alert(&alert("a1", Some("k"))).unwrap());
    assert!(store.insert_alert(&alert("a1", Some("other"))).is_err());
    assert!(store.insert_alert(&alert("a1", None)).is_err());
    assert!(store.get_alert(ENT, "a1").unwrap().is_some());
}

#[test]
fn conditional_update_loses_against_a_changed_status() {
    let store = StorageEngine::open_in_memory().unwrap();
    let mut a = alert("a1", None);
    store.insert_alert(&a).unwrap();

    a.status = AlertStatus::Acknowledged;
    a.acknowledged_at = Some(at(2024, 2, 2));
    assert!(store.update_alert_if_status(&a, AlertStatus::Active).unwrap());
    // Second writer still believes the alert is active.
    a.status = AlertStatus::Dismissed;
    assert!(!store.update_alert_if_status(&a, AlertStatus::Active).unwrap());

    let stored = store.get_alert(ENT, "a1").unwrap().unwrap();
    assert_eq!(stored.status, AlertStatus::Acknowledged);
    assert_eq!(stored.alert_data, serde_json::json!({"k": 1}));
}

// ═══════════════════════════════════════════════════════════════════════════
// OBLIGATION GRAPH
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn store_side_check_rejects_cycles_and_duplicates() {
    let store = StorageEngine::open_in_memory().unwrap();
    for id in ["A", "B", "C"] {
        store.insert_obligation(&obligation(id)).unwrap();
    }
    assert_eq!(
        store.insert_dependency_if_acyclic(&edge("A", "B")).unwrap(),
        DependencyInsert::Inserted
    );
    assert_eq!(
        store.insert_dependency_if_acyclic(&edge("B", "C")).unwrap(),
        DependencyInsert::Inserted
    );
    assert_eq!(
        store.insert_dependency_if_acyclic(&edge("C", "A")).unwrap(),
        DependencyInsert::WouldCycle
    );
    assert_eq!(
        store.insert_dependency_if_acyclic(&edge("A", "B")).unwrap(),
        DependencyInsert::Duplicate
    );
    assert_eq!(store.list_dependencies(ENT).unwrap().len(), 2);
}

#[test]
fn escalation_insert_is_guarded_by_row_count() {
    let store = StorageEngine::open_in_memory().unwrap();
    store.insert_obligation(&obligation("A")).unwrap();
    let esc = |id: &str, level: u8| ObligationEscalation {
        id: id.to_string(),
        enterprise_id: ENT.to_string(),
        obligation_id: "A".to_string(),
        escalation_level: level,
        escalated_to: "vp".to_string(),
        escalated_by: "ops".to_string(),
        reason: "late".to_string(),
        status: EscalationStatus::Active,
        created_at: at(2024, 3, 2),
        resolved_at: None,
    };

    assert!(store.insert_escalation_if_unchanged(&esc("e1", 1), 0).unwrap());
    // Stale snapshot: the caller still saw zero escalations.
    assert!(!store.insert_escalation_if_unchanged(&esc("e2", 1), 0).unwrap());

    let state = store.escalation_state(ENT, "A").unwrap();
    assert_eq!(state, EscalationState { max_level: 1, count: 1 });
}

#[test]
fn completion_without_evidence_writes_nothing() {
    let store = StorageEngine::open_in_memory().unwrap();
    store.insert_obligation(&obligation("A")).unwrap();

    let outcome = store
        .complete_obligation_if(ENT, "A", ObligationStatus::Pending, at(2024, 2, 1), None)
        .unwrap();
    assert_eq!(outcome, CompletionOutcome::MissingEvidence);
    let stored = store.get_obligation(ENT, "A").unwrap().unwrap();
    assert_eq!(stored.status, ObligationStatus::Pending);
    assert!(stored.completed_at.is_none());
}

#[test]
fn completion_with_inline_record_commits_both() {
    let store = StorageEngine::open_in_memory().unwrap();
    store.insert_obligation(&obligation("A")).unwrap();
    let record = PerformanceRecord {
        id: "p1".into(),
        enterprise_id: ENT.into(),
        obligation_id: "A".into(),
        recorded_at: at(2024, 2, 1),
        recorded_by: "ops".into(),
        quality_score: Some(0.9),
        on_time: true,
        notes: None,
        evidence: vec!["report.pdf".into()],
    };

    let outcome = store
        .complete_obligation_if(ENT, "A", ObligationStatus::Pending, at(2024, 2, 1), Some(&record))
        .unwrap();
    assert_eq!(outcome, CompletionOutcome::Completed);
    let stored = store.get_obligation(ENT, "A").unwrap().unwrap();
    assert_eq!(stored.status, ObligationStatus::Completed);
    assert_eq!(stored.completed_at, Some(at(2024, 2, 1)));
    assert_eq!(store.list_performance(ENT, "A").unwrap(), vec![record]);
}

#[test]
fn past_due_excludes_terminal_and_undated() {
    let store = StorageEngine::open_in_memory().unwrap();
    store.insert_obligation(&obligation("due")).unwrap();
    let mut undated = obligation("undated");
    undated.due_date = None;
    store.insert_obligation(&undated).unwrap();
    let mut waived = obligation("waived");
    waived.status = ObligationStatus::Waived;
    store.insert_obligation(&waived).unwrap();

    let past_due = store.list_past_due(ENT, at(2024, 4, 1)).unwrap();
    let ids: Vec<_> = past_due.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["due"]);
}

// ═══════════════════════════════════════════════════════════════════════════
// CONTRACTS, PREDICTIONS, TENANTS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn expiry_counts_only_active_contracts_in_window() {
    let store = StorageEngine::open_in_memory().unwrap();
    let now = at(2024, 6, 1);
    let contract = |id: &str, status: ContractStatus, days: i64| Contract {
        id: id.to_string(),
        enterprise_id: ENT.to_string(),
        title: id.to_string(),
        status,
        end_date: Some(now + Duration::days(days)),
        value: None,
    };
    store.upsert_contract(&contract("soon", ContractStatus::Active, 10)).unwrap();
    store.upsert_contract(&contract("later", ContractStatus::Active, 60)).unwrap();
    store.upsert_contract(&contract("far", ContractStatus::Active, 200)).unwrap();
    store.upsert_contract(&contract("past", ContractStatus::Active, -5)).unwrap();
    store.upsert_contract(&contract("draft", ContractStatus::Draft, 10)).unwrap();

    let counts = store.expiry_counts(ENT, now, 30, 90).unwrap();
    assert_eq!(counts.expiring_short, 1);
    assert_eq!(counts.expiring_long, 2);
}

#[test]
fn oversized_expiry_window_is_rejected() {
    let store = StorageEngine::open_in_memory().unwrap();
    let err = store.expiry_counts(ENT, at(2024, 6, 1), 30, i64::MAX).unwrap_err();
    assert!(matches!(err, CovenantError::ValidationError(_)));

    let err = store.expiry_counts(ENT, at(2024, 6, 1), 400_000_000, 90).unwrap_err();
    assert!(matches!(err, CovenantError::ValidationError(_)));
}

#[test]
fn top_predictions_orders_by_probability() {
    let store = StorageEngine::open_in_memory().unwrap();
    for (id, p) in [("low", 0.2), ("high", 0.95), ("mid", 0.5)] {
        store
            .insert_prediction(&RenewalPrediction {
                id: id.into(),
                enterprise_id: ENT.into(),
                contract_id: format!("c-{id}"),
                probability: p,
                prediction_tier: PredictionTier::Low,
                predicted_date: None,
                predicted_value: None,
                created_at: at(2024, 1, 1),
                updated_at: at(2024, 1, 1),
            })
            .unwrap();
    }
    let top: Vec<_> = store
        .top_predictions(ENT, 2)
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(top, vec!["high", "mid"]);
}

#[test]
fn enterprises_are_discovered_across_tables() {
    let store = StorageEngine::open_in_memory().unwrap();
    store.upsert_bucket(&bucket_write("revenue", at(2024, 1, 1), 1.0)).unwrap();
    let mut foreign = obligation("X");
    foreign.enterprise_id = "ent-0".into();
    store.insert_obligation(&foreign).unwrap();
    assert_eq!(store.list_enterprises().unwrap(), vec!["ent-0", "ent-1"]);
}

#[test]
fn corrupt_enum_column_surfaces_as_corrupt_row() {
    let store = StorageEngine::open_in_memory().unwrap();
    store.insert_alert(&alert("a1", None)).unwrap();
    store
        .pool()
        .writer
        .with_conn(|conn| {
            conn.execute_batch(
                "PRAGMA ignore_check_constraints = ON;
                 UPDATE temporal_alerts SET severity = 'apocalyptic';
                 PRAGMA ignore_check_constraints = OFF;",
            )
            .unwrap();
            Ok(())
        })
        .unwrap();

    let err = store.get_alert(ENT, "a1").unwrap_err();
    assert!(matches!(
        err,
        CovenantError::UpstreamStore(StorageError::CorruptRow { table: "temporal_alerts", column: "severity", .. })
    ));
}
