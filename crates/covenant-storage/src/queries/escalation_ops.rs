use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use covenant_core::errors::CovenantResult;
use covenant_core::models::ObligationEscalation;
use covenant_core::traits::EscalationState;

use crate::row::{fmt_opt_ts, fmt_ts, Columns};
use crate::sql_err;

const COLS: Columns = Columns::of("obligation_escalations");

const SELECT_COLUMNS: &str = "id, enterprise_id, obligation_id, escalation_level, escalated_to,
    escalated_by, reason, status, created_at, resolved_at";

pub fn escalation_state(
    conn: &Connection,
    enterprise_id: &str,
    obligation_id: &str,
) -> CovenantResult<EscalationState> {
    let (max_level, count): (i64, i64) = conn
        .query_row(
            "SELECT COALESCE(MAX(escalation_level), 0), COUNT(*)
             FROM obligation_escalations
             WHERE enterprise_id = ?1 AND obligation_id = ?2",
            params![enterprise_id, obligation_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .map_err(sql_err)?;
    Ok(EscalationState {
        max_level: max_level.clamp(0, i64::from(u8::MAX)) as u8,
        count: count as usize,
    })
}

/// Insert guarded by the row count observed when the level was computed.
/// Zero rows written means another escalation landed first.
pub fn insert_if_unchanged(
    conn: &Connection,
    escalation: &ObligationEscalation,
    expected_count: usize,
) -> CovenantResult<bool> {
    let inserted = conn
        .execute(
            "INSERT INTO obligation_escalations
                (id, enterprise_id, obligation_id, escalation_level, escalated_to,
                 escalated_by, reason, status, created_at, resolved_at)
             SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10
             WHERE (SELECT COUNT(*) FROM obligation_escalations
                    WHERE enterprise_id = ?2 AND obligation_id = ?3) = ?11",
            params![
                escalation.id,
                escalation.enterprise_id,
                escalation.obligation_id,
                escalation.escalation_level,
                escalation.escalated_to,
                escalation.escalated_by,
                escalation.reason,
                escalation.status.as_str(),
                fmt_ts(&escalation.created_at),
                fmt_opt_ts(&escalation.resolved_at),
                expected_count as i64,
            ],
        )
        .map_err(sql_err)?;
    Ok(inserted == 1)
}

pub fn get_escalation(
    conn: &Connection,
    enterprise_id: &str,
    id: &str,
) -> CovenantResult<Option<ObligationEscalation>> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM obligation_escalations WHERE enterprise_id = ?1 AND id = ?2"
    );
    conn.query_row(&sql, params![enterprise_id, id], map_escalation)
        .optional()
        .map_err(sql_err)
}

pub fn list_escalations(
    conn: &Connection,
    enterprise_id: &str,
    obligation_id: &str,
) -> CovenantResult<Vec<ObligationEscalation>> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM obligation_escalations
         WHERE enterprise_id = ?1 AND obligation_id = ?2
         ORDER BY created_at, escalation_level, id"
    );
    let mut stmt = conn.prepare(&sql).map_err(sql_err)?;
    let rows = stmt
        .query_map(params![enterprise_id, obligation_id], map_escalation)
        .map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}

pub fn resolve_if_active(
    conn: &Connection,
    enterprise_id: &str,
    id: &str,
    resolved_at: DateTime<Utc>,
) -> CovenantResult<bool> {
    let updated = conn
        .execute(
            "UPDATE obligation_escalations SET status = 'resolved', resolved_at = ?3
             WHERE enterprise_id = ?1 AND id = ?2 AND status = 'active'",
            params![enterprise_id, id, fmt_ts(&resolved_at)],
        )
        .map_err(sql_err)?;
    Ok(updated == 1)
}

fn map_escalation(row: &Row<'_>) -> rusqlite::Result<ObligationEscalation> {
    Ok(ObligationEscalation {
        id: row.get(0)?,
        enterprise_id: row.get(1)?,
        obligation_id: row.get(2)?,
        escalation_level: row.get(3)?,
        escalated_to: row.get(4)?,
        escalated_by: row.get(5)?,
        reason: row.get(6)?,
        status: COLS.parse(row, 7, "status")?,
        created_at: COLS.ts(row, 8, "created_at")?,
        resolved_at: COLS.opt_ts(row, 9, "resolved_at")?,
    })
}
