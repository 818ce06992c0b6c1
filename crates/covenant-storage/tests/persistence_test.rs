//! File-backed persistence: migrations, restart survival, WAL reads.

use std::collections::HashMap;

use chrono::{TimeZone, Utc};
use covenant_core::config::StorageConfig;
use covenant_core::models::BucketType;
use covenant_core::traits::{BucketWrite, IMetricStorage};
use covenant_storage::migrations::{current_version, LATEST_VERSION};
use covenant_storage::pool::pragmas::verify_wal_mode;
use covenant_storage::StorageEngine;

fn write(value: f64) -> BucketWrite {
    let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let (bucket_start, bucket_end) = BucketType::Month.bounds(ts).unwrap();
    BucketWrite {
        enterprise_id: "ent-1".into(),
        metric_category: "revenue".into(),
        bucket_type: BucketType::Month,
        bucket_start,
        bucket_end,
        value,
        dimensions: HashMap::new(),
        observed_at: ts,
    }
}

#[test]
fn fresh_database_is_migrated_to_latest() {
    let dir = tempfile::tempdir().unwrap();
    let engine = StorageEngine::open(&dir.path().join("covenant.db"), &StorageConfig::default())
        .unwrap();
    let version = engine.pool().writer.with_conn(current_version).unwrap();
    assert_eq!(version, LATEST_VERSION);
    assert!(engine.pool().writer.with_conn(verify_wal_mode).unwrap());
}

#[test]
fn buckets_survive_restart_and_reads_see_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("covenant.db");
    let config = StorageConfig::default();

    {
        let engine = StorageEngine::open(&path, &config).unwrap();
        engine.upsert_bucket(&write(10.0)).unwrap();
        engine.upsert_bucket(&write(30.0)).unwrap();
        // Read pool connection sees the committed writes.
        let series = engine
            .get_series(
                "ent-1",
                "revenue",
                BucketType::Month,
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            )
            .unwrap();
        assert_eq!(series.len(), 1);
    }

    let reopened = StorageEngine::open(&path, &config).unwrap();
    let series = reopened
        .get_series(
            "ent-1",
            "revenue",
            BucketType::Month,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        )
        .unwrap();
    assert_eq!(series[0].aggregations.sum, Some(40.0));
    assert_eq!(series[0].aggregations.average, Some(20.0));
    assert_eq!(series[0].aggregations.count, Some(2));
}

#[test]
fn reopening_does_not_rerun_migrations() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("covenant.db");
    StorageEngine::open(&path, &StorageConfig::default()).unwrap();
    let engine = StorageEngine::open(&path, &StorageConfig::default()).unwrap();
    let applied = engine
        .pool()
        .writer
        .with_conn(covenant_storage::migrations::run_migrations)
        .unwrap();
    assert_eq!(applied, 0);
}
