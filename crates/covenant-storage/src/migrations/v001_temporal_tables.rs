//! v001: temporal_metrics, temporal_patterns, anomaly_detections.

use rusqlite::Connection;

use covenant_core::errors::CovenantResult;

use crate::sql_err;

pub fn migrate(conn: &Connection) -> CovenantResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS temporal_metrics (
            id               TEXT PRIMARY KEY,
            enterprise_id    TEXT NOT NULL,
            metric_category  TEXT NOT NULL,
            bucket_type      TEXT NOT NULL
                CHECK (bucket_type IN ('day', 'week', 'month', 'quarter')),
            bucket_start     TEXT NOT NULL,
            bucket_end       TEXT NOT NULL,
            sum_value        REAL,
            average_value    REAL,
            count_value      INTEGER,
            dimensions       TEXT NOT NULL DEFAULT '{}',
            created_at       TEXT NOT NULL,
            updated_at       TEXT NOT NULL,
            CHECK (bucket_start < bucket_end),
            UNIQUE (enterprise_id, metric_category, bucket_type, bucket_start)
        );

        CREATE TABLE IF NOT EXISTS temporal_patterns (
            id                TEXT PRIMARY KEY,
            enterprise_id     TEXT NOT NULL,
            metric_category   TEXT NOT NULL,
            pattern_type      TEXT NOT NULL,
            detected_at       TEXT NOT NULL,
            last_observed_at  TEXT NOT NULL,
            is_active         INTEGER NOT NULL DEFAULT 1,
            supporting_data   TEXT NOT NULL DEFAULT '{}',
            UNIQUE (enterprise_id, metric_category, pattern_type)
        );

        CREATE INDEX IF NOT EXISTS idx_patterns_active
            ON temporal_patterns(enterprise_id, is_active);

        CREATE TABLE IF NOT EXISTS anomaly_detections (
            id                TEXT PRIMARY KEY,
            enterprise_id     TEXT NOT NULL,
            metric_category   TEXT NOT NULL,
            bucket_type       TEXT NOT NULL,
            bucket_start      TEXT NOT NULL,
            detected_at       TEXT NOT NULL,
            severity          TEXT NOT NULL
                CHECK (severity IN ('low', 'medium', 'high', 'critical')),
            baseline_value    REAL NOT NULL,
            observed_value    REAL NOT NULL,
            deviation         REAL NOT NULL,
            is_resolved       INTEGER NOT NULL DEFAULT 0,
            resolved_at       TEXT,
            resolution_notes  TEXT,
            CHECK (is_resolved = 0 OR resolved_at IS NOT NULL),
            UNIQUE (enterprise_id, metric_category, bucket_type, bucket_start)
        );

        CREATE INDEX IF NOT EXISTS idx_anomalies_open
            ON anomaly_detections(enterprise_id, is_resolved, detected_at);
        ",
    )
    .map_err(sql_err)?;
    Ok(())
}
