use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use covenant_core::errors::CovenantResult;
use covenant_core::models::AnomalyDetection;

use crate::row::{fmt_opt_ts, fmt_ts, Columns};
use crate::sql_err;

const COLS: Columns = Columns::of("anomaly_detections");

const SELECT_COLUMNS: &str = "id, enterprise_id, metric_category, bucket_type, bucket_start,
    detected_at, severity, baseline_value, observed_value, deviation, is_resolved,
    resolved_at, resolution_notes, alert_pending";

/// Returns `false` when the bucket already has a detection. Any other
/// constraint violation is an error.
pub fn insert_anomaly(conn: &Connection, anomaly: &AnomalyDetection) -> CovenantResult<bool> {
    let inserted = conn
        .execute(
            "INSERT INTO anomaly_detections
                (id, enterprise_id, metric_category, bucket_type, bucket_start, detected_at,
                 severity, baseline_value, observed_value, deviation, is_resolved,
                 resolved_at, resolution_notes, alert_pending)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
             ON CONFLICT (enterprise_id, metric_category, bucket_type, bucket_start) DO NOTHING",
            params![
                anomaly.id,
                anomaly.enterprise_id,
                anomaly.metric_category,
                anomaly.bucket_type.as_str(),
                fmt_ts(&anomaly.bucket_start),
                fmt_ts(&anomaly.detected_at),
                anomaly.severity.as_str(),
                anomaly.baseline_value,
                anomaly.observed_value,
                anomaly.deviation,
                anomaly.is_resolved,
                fmt_opt_ts(&anomaly.resolved_at),
                anomaly.resolution_notes,
                anomaly.alert_pending,
            ],
        )
        .map_err(sql_err)?;
    Ok(inserted == 1)
}

pub fn get_anomaly(
    conn: &Connection,
    enterprise_id: &str,
    id: &str,
) -> CovenantResult<Option<AnomalyDetection>> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM anomaly_detections WHERE enterprise_id = ?1 AND id = ?2"
    );
    conn.query_row(&sql, params![enterprise_id, id], map_anomaly)
        .optional()
        .map_err(sql_err)
}

pub fn resolve_anomaly_if_open(
    conn: &Connection,
    enterprise_id: &str,
    id: &str,
    resolved_at: DateTime<Utc>,
    notes: Option<&str>,
) -> CovenantResult<bool> {
    let updated = conn
        .execute(
            "UPDATE anomaly_detections
             SET is_resolved = 1, resolved_at = ?3, resolution_notes = ?4
             WHERE enterprise_id = ?1 AND id = ?2 AND is_resolved = 0",
            params![enterprise_id, id, fmt_ts(&resolved_at), notes],
        )
        .map_err(sql_err)?;
    Ok(updated == 1)
}

pub fn list_unresolved(
    conn: &Connection,
    enterprise_id: &str,
    limit: usize,
) -> CovenantResult<Vec<AnomalyDetection>> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM anomaly_detections
         WHERE enterprise_id = ?1 AND is_resolved = 0
         ORDER BY detected_at DESC, bucket_start DESC
         LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql).map_err(sql_err)?;
    let rows = stmt
        .query_map(params![enterprise_id, limit as i64], map_anomaly)
        .map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}

/// Unresolved anomalies of one category still owed an alert, oldest bucket first.
pub fn list_alert_pending(
    conn: &Connection,
    enterprise_id: &str,
    metric_category: &str,
) -> CovenantResult<Vec<AnomalyDetection>> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM anomaly_detections
         WHERE enterprise_id = ?1 AND metric_category = ?2
           AND alert_pending = 1 AND is_resolved = 0
         ORDER BY bucket_start ASC"
    );
    let mut stmt = conn.prepare(&sql).map_err(sql_err)?;
    let rows = stmt
        .query_map(params![enterprise_id, metric_category], map_anomaly)
        .map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}

pub fn clear_alert_pending(conn: &Connection, enterprise_id: &str, id: &str) -> CovenantResult<bool> {
    let updated = conn
        .execute(
            "UPDATE anomaly_detections SET alert_pending = 0
             WHERE enterprise_id = ?1 AND id = ?2 AND alert_pending = 1",
            params![enterprise_id, id],
        )
        .map_err(sql_err)?;
    Ok(updated == 1)
}

fn map_anomaly(row: &Row<'_>) -> rusqlite::Result<AnomalyDetection> {
    Ok(AnomalyDetection {
        id: row.get(0)?,
        enterprise_id: row.get(1)?,
        metric_category: row.get(2)?,
        bucket_type: COLS.parse(row, 3, "bucket_type")?,
        bucket_start: COLS.ts(row, 4, "bucket_start")?,
        detected_at: COLS.ts(row, 5, "detected_at")?,
        severity: COLS.parse(row, 6, "severity")?,
        baseline_value: row.get(7)?,
        observed_value: row.get(8)?,
        deviation: row.get(9)?,
        is_resolved: COLS.flag(row, 10)?,
        resolved_at: COLS.opt_ts(row, 11, "resolved_at")?,
        resolution_notes: row.get(12)?,
        alert_pending: COLS.flag(row, 13)?,
    })
}
