//! PRAGMA configuration applied to every SQLite connection.
//!
//! WAL mode, NORMAL sync, foreign_keys ON, configurable busy timeout.

use std::time::Duration;

use rusqlite::Connection;

use covenant_core::errors::CovenantResult;

use crate::sql_err;

/// Apply write-side pragmas. Returns the journal mode SQLite settled on
/// (`memory` for in-memory databases).
pub fn apply_pragmas(conn: &Connection, busy_timeout_ms: u32) -> CovenantResult<String> {
    conn.busy_timeout(Duration::from_millis(u64::from(busy_timeout_ms)))
        .map_err(sql_err)?;
    let mode: String = conn
        .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
        .map_err(sql_err)?;
    conn.execute_batch(
        "
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        ",
    )
    .map_err(sql_err)?;
    Ok(mode)
}

/// Apply read-side pragmas.
pub fn apply_read_pragmas(conn: &Connection, busy_timeout_ms: u32) -> CovenantResult<()> {
    conn.busy_timeout(Duration::from_millis(u64::from(busy_timeout_ms)))
        .map_err(sql_err)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(sql_err)?;
    Ok(())
}

/// Verify that WAL mode is active on a connection.
pub fn verify_wal_mode(conn: &Connection) -> CovenantResult<bool> {
    let mode: String = conn
        .pragma_query_value(None, "journal_mode", |row| row.get(0))
        .map_err(sql_err)?;
    Ok(mode.eq_ignore_ascii_case("wal"))
}
