//! Obligations and `obligation_performance_tracking`.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use covenant_core::errors::CovenantResult;
use covenant_core::models::{Obligation, ObligationStatus, PerformanceRecord};
use covenant_core::traits::CompletionOutcome;

use crate::row::{fmt_opt_ts, fmt_ts, Columns};
use crate::sql_err;

const OBLIGATIONS: Columns = Columns::of("obligations");
const PERFORMANCE: Columns = Columns::of("obligation_performance_tracking");

const SELECT_COLUMNS: &str = "id, enterprise_id, contract_id, title, obligation_type, status,
    priority, due_date, frequency, responsible_party, completed_at, at_risk, created_at,
    updated_at";

const PERFORMANCE_COLUMNS: &str = "id, enterprise_id, obligation_id, recorded_at, recorded_by,
    quality_score, on_time, notes, evidence";

pub fn insert_obligation(conn: &Connection, obligation: &Obligation) -> CovenantResult<()> {
    conn.execute(
        "INSERT INTO obligations
            (id, enterprise_id, contract_id, title, obligation_type, status, priority,
             due_date, frequency, responsible_party, completed_at, at_risk, created_at,
             updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            obligation.id,
            obligation.enterprise_id,
            obligation.contract_id,
            obligation.title,
            obligation.obligation_type,
            obligation.status.as_str(),
            obligation.priority.as_str(),
            fmt_opt_ts(&obligation.due_date),
            obligation.frequency.as_str(),
            obligation.responsible_party,
            fmt_opt_ts(&obligation.completed_at),
            obligation.at_risk,
            fmt_ts(&obligation.created_at),
            fmt_ts(&obligation.updated_at),
        ],
    )
    .map_err(sql_err)?;
    Ok(())
}

pub fn get_obligation(
    conn: &Connection,
    enterprise_id: &str,
    id: &str,
) -> CovenantResult<Option<Obligation>> {
    let sql =
        format!("SELECT {SELECT_COLUMNS} FROM obligations WHERE enterprise_id = ?1 AND id = ?2");
    conn.query_row(&sql, params![enterprise_id, id], map_obligation)
        .optional()
        .map_err(sql_err)
}

/// Soonest due first; undated obligations last.
pub fn list_obligations(
    conn: &Connection,
    enterprise_id: &str,
    status: Option<ObligationStatus>,
) -> CovenantResult<Vec<Obligation>> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM obligations
         WHERE enterprise_id = ?1 AND (?2 IS NULL OR status = ?2)
         ORDER BY due_date IS NULL, due_date, created_at, id"
    );
    let mut stmt = conn.prepare(&sql).map_err(sql_err)?;
    let rows = stmt
        .query_map(params![enterprise_id, status.map(|s| s.as_str())], map_obligation)
        .map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}

pub fn update_status_if(
    conn: &Connection,
    enterprise_id: &str,
    id: &str,
    expected: ObligationStatus,
    target: ObligationStatus,
    updated_at: DateTime<Utc>,
) -> CovenantResult<bool> {
    let updated = conn
        .execute(
            "UPDATE obligations SET status = ?4, updated_at = ?5
             WHERE enterprise_id = ?1 AND id = ?2 AND status = ?3",
            params![
                enterprise_id,
                id,
                expected.as_str(),
                target.as_str(),
                fmt_ts(&updated_at),
            ],
        )
        .map_err(sql_err)?;
    Ok(updated == 1)
}

pub fn list_past_due(
    conn: &Connection,
    enterprise_id: &str,
    now: DateTime<Utc>,
) -> CovenantResult<Vec<Obligation>> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM obligations
         WHERE enterprise_id = ?1 AND status IN ('pending', 'in_progress')
           AND due_date IS NOT NULL AND due_date < ?2
         ORDER BY due_date, id"
    );
    let mut stmt = conn.prepare(&sql).map_err(sql_err)?;
    let rows = stmt
        .query_map(params![enterprise_id, fmt_ts(&now)], map_obligation)
        .map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}

/// Flag the given obligations at risk. Returns how many were newly flagged.
pub fn mark_at_risk(conn: &Connection, enterprise_id: &str, ids: &[String]) -> CovenantResult<usize> {
    let mut stmt = conn
        .prepare(
            "UPDATE obligations SET at_risk = 1
             WHERE enterprise_id = ?1 AND id = ?2 AND at_risk = 0",
        )
        .map_err(sql_err)?;
    let mut flagged = 0;
    for id in ids {
        flagged += stmt.execute(params![enterprise_id, id]).map_err(sql_err)?;
    }
    Ok(flagged)
}

pub fn insert_performance(conn: &Connection, record: &PerformanceRecord) -> CovenantResult<()> {
    let evidence = serde_json::to_string(&record.evidence)?;
    conn.execute(
        "INSERT INTO obligation_performance_tracking
            (id, enterprise_id, obligation_id, recorded_at, recorded_by, quality_score,
             on_time, notes, evidence)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            record.id,
            record.enterprise_id,
            record.obligation_id,
            fmt_ts(&record.recorded_at),
            record.recorded_by,
            record.quality_score,
            record.on_time,
            record.notes,
            evidence,
        ],
    )
    .map_err(sql_err)?;
    Ok(())
}

pub fn count_performance(
    conn: &Connection,
    enterprise_id: &str,
    obligation_id: &str,
) -> CovenantResult<usize> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM obligation_performance_tracking
             WHERE enterprise_id = ?1 AND obligation_id = ?2",
            params![enterprise_id, obligation_id],
            |row| row.get(0),
        )
        .map_err(sql_err)?;
    Ok(count as usize)
}

pub fn list_performance(
    conn: &Connection,
    enterprise_id: &str,
    obligation_id: &str,
) -> CovenantResult<Vec<PerformanceRecord>> {
    let sql = format!(
        "SELECT {PERFORMANCE_COLUMNS} FROM obligation_performance_tracking
         WHERE enterprise_id = ?1 AND obligation_id = ?2
         ORDER BY recorded_at, id"
    );
    let mut stmt = conn.prepare(&sql).map_err(sql_err)?;
    let rows = stmt
        .query_map(params![enterprise_id, obligation_id], map_performance)
        .map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}

/// Evidence-checked completion. Must run inside a transaction: every check
/// and write below is one unit.
pub fn complete_obligation_if(
    conn: &Connection,
    enterprise_id: &str,
    id: &str,
    expected: ObligationStatus,
    completed_at: DateTime<Utc>,
    performance: Option<&PerformanceRecord>,
) -> CovenantResult<CompletionOutcome> {
    let current: Option<String> = conn
        .query_row(
            "SELECT status FROM obligations WHERE enterprise_id = ?1 AND id = ?2",
            params![enterprise_id, id],
            |row| row.get(0),
        )
        .optional()
        .map_err(sql_err)?;
    if current.as_deref() != Some(expected.as_str()) {
        return Ok(CompletionOutcome::StatusChanged);
    }

    if let Some(record) = performance {
        insert_performance(conn, record)?;
    }
    if count_performance(conn, enterprise_id, id)? == 0 {
        return Ok(CompletionOutcome::MissingEvidence);
    }

    conn.execute(
        "UPDATE obligations SET status = 'completed', completed_at = ?3, updated_at = ?3
         WHERE enterprise_id = ?1 AND id = ?2",
        params![enterprise_id, id, fmt_ts(&completed_at)],
    )
    .map_err(sql_err)?;
    Ok(CompletionOutcome::Completed)
}

fn map_obligation(row: &Row<'_>) -> rusqlite::Result<Obligation> {
    Ok(Obligation {
        id: row.get(0)?,
        enterprise_id: row.get(1)?,
        contract_id: row.get(2)?,
        title: row.get(3)?,
        obligation_type: row.get(4)?,
        status: OBLIGATIONS.parse(row, 5, "status")?,
        priority: OBLIGATIONS.parse(row, 6, "priority")?,
        due_date: OBLIGATIONS.opt_ts(row, 7, "due_date")?,
        frequency: OBLIGATIONS.parse(row, 8, "frequency")?,
        responsible_party: row.get(9)?,
        completed_at: OBLIGATIONS.opt_ts(row, 10, "completed_at")?,
        at_risk: OBLIGATIONS.flag(row, 11)?,
        created_at: OBLIGATIONS.ts(row, 12, "created_at")?,
        updated_at: OBLIGATIONS.ts(row, 13, "updated_at")?,
    })
}

fn map_performance(row: &Row<'_>) -> rusqlite::Result<PerformanceRecord> {
    Ok(PerformanceRecord {
        id: row.get(0)?,
        enterprise_id: row.get(1)?,
        obligation_id: row.get(2)?,
        recorded_at: PERFORMANCE.ts(row, 3, "recorded_at")?,
        recorded_by: row.get(4)?,
        quality_score: row.get(5)?,
        on_time: PERFORMANCE.flag(row, 6)?,
        notes: row.get(7)?,
        evidence: PERFORMANCE.json(row, 8, "evidence")?,
    })
}
