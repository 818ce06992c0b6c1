//! Contracts mirror. Written only by the sync path; read for expiry counts.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use covenant_core::errors::{CovenantError, CovenantResult};
use covenant_core::models::{Contract, ExpiryCounts};

use crate::row::{fmt_opt_ts, fmt_ts, Columns};
use crate::sql_err;

const COLS: Columns = Columns::of("contracts");

pub fn upsert_contract(conn: &Connection, contract: &Contract) -> CovenantResult<()> {
    conn.execute(
        "INSERT INTO contracts (id, enterprise_id, title, status, end_date, value)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT (enterprise_id, id) DO UPDATE SET
            title = excluded.title,
            status = excluded.status,
            end_date = excluded.end_date,
            value = excluded.value",
        params![
            contract.id,
            contract.enterprise_id,
            contract.title,
            contract.status.as_str(),
            fmt_opt_ts(&contract.end_date),
            contract.value,
        ],
    )
    .map_err(sql_err)?;
    Ok(())
}

pub fn get_contract(
    conn: &Connection,
    enterprise_id: &str,
    id: &str,
) -> CovenantResult<Option<Contract>> {
    conn.query_row(
        "SELECT id, enterprise_id, title, status, end_date, value
         FROM contracts WHERE enterprise_id = ?1 AND id = ?2",
        params![enterprise_id, id],
        map_contract,
    )
    .optional()
    .map_err(sql_err)
}

/// Active contracts ending within `[now, now + window]` for both windows.
pub fn expiry_counts(
    conn: &Connection,
    enterprise_id: &str,
    now: DateTime<Utc>,
    short_window_days: i64,
    long_window_days: i64,
) -> CovenantResult<ExpiryCounts> {
    let short_end = window_end(now, short_window_days)?;
    let long_end = window_end(now, long_window_days)?;
    let (short, long): (i64, i64) = conn
        .query_row(
            "SELECT
                COALESCE(SUM(CASE WHEN end_date <= ?3 THEN 1 ELSE 0 END), 0),
                COUNT(*)
             FROM contracts
             WHERE enterprise_id = ?1 AND status = 'active'
               AND end_date IS NOT NULL AND end_date >= ?2 AND end_date <= ?4",
            params![
                enterprise_id,
                fmt_ts(&now),
                fmt_ts(&short_end),
                fmt_ts(&long_end),
            ],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .map_err(sql_err)?;
    Ok(ExpiryCounts {
        short_window_days,
        long_window_days,
        expiring_short: short as usize,
        expiring_long: long as usize,
    })
}

fn window_end(now: DateTime<Utc>, days: i64) -> CovenantResult<DateTime<Utc>> {
    Duration::try_days(days)
        .and_then(|span| now.checked_add_signed(span))
        .ok_or_else(|| {
            CovenantError::ValidationError(format!("expiry window of {days} days is out of range"))
        })
}

fn map_contract(row: &Row<'_>) -> rusqlite::Result<Contract> {
    Ok(Contract {
        id: row.get(0)?,
        enterprise_id: row.get(1)?,
        title: row.get(2)?,
        status: COLS.parse(row, 3, "status")?,
        end_date: COLS.opt_ts(row, 4, "end_date")?,
        value: row.get(5)?,
    })
}
