//! `temporal_alerts` reads and conditional status writes.

use rusqlite::{params, Connection, OptionalExtension, Row};

use covenant_core::errors::CovenantResult;
use covenant_core::models::{AlertStatus, TemporalAlert};

use crate::row::{fmt_opt_ts, fmt_ts, Columns};
use crate::sql_err;

const COLS: Columns = Columns::of("temporal_alerts");

const SELECT_COLUMNS: &str = "id, enterprise_id, contract_id, alert_type, severity, status,
    triggered_at, acknowledged_at, acknowledged_by, resolved_at, resolved_by, alert_data,
    dedupe_key";

/// Returns `false` when an open alert with the same dedupe key already
/// exists. Any other constraint violation is an error.
pub fn insert_alert(conn: &Connection, alert: &TemporalAlert) -> CovenantResult<bool> {
    let data = serde_json::to_string(&alert.alert_data)?;
    let inserted = conn
        .execute(
            "INSERT INTO temporal_alerts
                (id, enterprise_id, contract_id, alert_type, severity, status, triggered_at,
                 acknowledged_at, acknowledged_by, resolved_at, resolved_by, alert_data,
                 dedupe_key)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT (enterprise_id, dedupe_key)
                 WHERE dedupe_key IS NOT NULL AND status IN ('active', 'acknowledged')
             DO NOTHING",
            params![
                alert.id,
                alert.enterprise_id,
                alert.contract_id,
                alert.alert_type,
                alert.severity.as_str(),
                alert.status.as_str(),
                fmt_ts(&alert.triggered_at),
                fmt_opt_ts(&alert.acknowledged_at),
                alert.acknowledged_by,
                fmt_opt_ts(&alert.resolved_at),
                alert.resolved_by,
                data,
                alert.dedupe_key,
            ],
        )
        .map_err(sql_err)?;
    Ok(inserted == 1)
}

pub fn get_alert(
    conn: &Connection,
    enterprise_id: &str,
    id: &str,
) -> CovenantResult<Option<TemporalAlert>> {
    let sql =
        format!("SELECT {SELECT_COLUMNS} FROM temporal_alerts WHERE enterprise_id = ?1 AND id = ?2");
    conn.query_row(&sql, params![enterprise_id, id], map_alert)
        .optional()
        .map_err(sql_err)
}

/// Write the lifecycle columns and `alert_data` of `alert` only if the stored status is still
/// `expected`.
pub fn update_alert_if_status(
    conn: &Connection,
    alert: &TemporalAlert,
    expected: AlertStatus,
) -> CovenantResult<bool> {
    let data = serde_json::to_string(&alert.alert_data)?;
    let updated = conn
        .execute(
            "UPDATE temporal_alerts
             SET status = ?3, acknowledged_at = ?4, acknowledged_by = ?5,
                 resolved_at = ?6, resolved_by = ?7, alert_data = ?8
             WHERE enterprise_id = ?1 AND id = ?2 AND status = ?9",
            params![
                alert.enterprise_id,
                alert.id,
                alert.status.as_str(),
                fmt_opt_ts(&alert.acknowledged_at),
                alert.acknowledged_by,
                fmt_opt_ts(&alert.resolved_at),
                alert.resolved_by,
                data,
                expected.as_str(),
            ],
        )
        .map_err(sql_err)?;
    Ok(updated == 1)
}

pub fn list_active(
    conn: &Connection,
    enterprise_id: &str,
    limit: usize,
) -> CovenantResult<Vec<TemporalAlert>> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM temporal_alerts
         WHERE enterprise_id = ?1 AND status = 'active'
         ORDER BY triggered_at DESC
         LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql).map_err(sql_err)?;
    let rows = stmt
        .query_map(params![enterprise_id, limit as i64], map_alert)
        .map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}

fn map_alert(row: &Row<'_>) -> rusqlite::Result<TemporalAlert> {
    Ok(TemporalAlert {
        id: row.get(0)?,
        enterprise_id: row.get(1)?,
        contract_id: row.get(2)?,
        alert_type: row.get(3)?,
        severity: COLS.parse(row, 4, "severity")?,
        status: COLS.parse(row, 5, "status")?,
        triggered_at: COLS.ts(row, 6, "triggered_at")?,
        acknowledged_at: COLS.opt_ts(row, 7, "acknowledged_at")?,
        acknowledged_by: row.get(8)?,
        resolved_at: COLS.opt_ts(row, 9, "resolved_at")?,
        resolved_by: row.get(10)?,
        alert_data: COLS.json(row, 11, "alert_data")?,
        dedupe_key: row.get(12)?,
    })
}
