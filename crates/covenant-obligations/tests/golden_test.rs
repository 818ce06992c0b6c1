//! Golden fixture tests: `test-fixtures/golden/obligations/`.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use covenant_core::config::CovenantConfig;
use covenant_core::errors::CovenantError;
use covenant_core::models::*;
use covenant_core::traits::IObligationStorage;
use covenant_obligations::ObligationEngine;
use covenant_storage::StorageEngine;
use serde_json::Value;
use test_fixtures::load_fixture_value;

fn str_of<'a>(v: &'a Value, key: &str) -> &'a str {
    v[key].as_str().unwrap()
}

fn seeded(fixture: &Value) -> ObligationEngine {
    let store = Arc::new(StorageEngine::open_in_memory().unwrap());
    let ent = str_of(fixture, "enterprise_id");
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    for id in fixture["obligations"].as_array().unwrap() {
        let id = id.as_str().unwrap();
        store
            .insert_obligation(&Obligation {
                id: id.to_string(),
                enterprise_id: ent.to_string(),
                contract_id: "golden-contract".to_string(),
                title: format!("Obligation {id}"),
                obligation_type: "milestone".to_string(),
                status: ObligationStatus::Pending,
                priority: ObligationPriority::Medium,
                due_date: None,
                frequency: ObligationFrequency::OneTime,
                responsible_party: None,
                completed_at: None,
                at_risk: false,
                created_at: now,
                updated_at: now,
            })
            .unwrap();
    }

    let engine = ObligationEngine::new(store, &CovenantConfig::default());
    for edge in fixture["edges"].as_array().unwrap() {
        engine
            .graph
            .add_dependency(
                ent,
                str_of(edge, "obligation_id"),
                str_of(edge, "depends_on_id"),
                DependencyType::Prerequisite,
                false,
                now,
            )
            .unwrap();
    }
    engine
}

#[test]
fn golden_cycle_rejection() {
    let fixture = load_fixture_value("golden/obligations/cycle_rejection.json");
    let ent = str_of(&fixture, "enterprise_id");
    let engine = seeded(&fixture);
    let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let baseline = engine.graph.list_dependencies(ent).unwrap().len();

    for case in fixture["rejected"].as_array().unwrap() {
        let err = engine
            .graph
            .add_dependency(
                ent,
                str_of(case, "obligation_id"),
                str_of(case, "depends_on_id"),
                DependencyType::Sequential,
                true,
                now,
            )
            .unwrap_err();
        match err {
            CovenantError::Cycle { path, .. } => assert_eq!(path, str_of(case, "path")),
            other => panic!("expected cycle for {case}, got {other:?}"),
        }
        assert_eq!(engine.graph.list_dependencies(ent).unwrap().len(), baseline);
    }

    for case in fixture["accepted"].as_array().unwrap() {
        engine
            .graph
            .add_dependency(
                ent,
                str_of(case, "obligation_id"),
                str_of(case, "depends_on_id"),
                DependencyType::Related,
                false,
                now,
            )
            .unwrap();
    }
    let accepted = fixture["accepted"].as_array().unwrap().len();
    assert_eq!(engine.graph.list_dependencies(ent).unwrap().len(), baseline + accepted);
}
