//! Versioned schema migrations tracked in `PRAGMA user_version`.
//!
//! Each step runs in its own transaction together with the version bump, so
//! a failed step leaves the database at the previous version.

mod v001_temporal_tables;
mod v002_alert_renewal_tables;
mod v003_obligation_tables;
mod v004_anomaly_alert_tracking;

use rusqlite::Connection;

use covenant_core::errors::{CovenantError, CovenantResult, StorageError};

use crate::sql_err;

type MigrationFn = fn(&Connection) -> CovenantResult<()>;

const MIGRATIONS: &[(u32, &str, MigrationFn)] = &[
    (1, "temporal tables", v001_temporal_tables::migrate),
    (2, "alert and renewal tables", v002_alert_renewal_tables::migrate),
    (3, "obligation tables", v003_obligation_tables::migrate),
    (4, "anomaly alert tracking", v004_anomaly_alert_tracking::migrate),
];

/// Schema version after all migrations have run.
pub const LATEST_VERSION: u32 = 4;

pub fn current_version(conn: &Connection) -> CovenantResult<u32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(sql_err)
}

/// Apply every pending migration. Returns how many ran.
pub fn run_migrations(conn: &Connection) -> CovenantResult<usize> {
    let current = current_version(conn)?;
    if current > LATEST_VERSION {
        return Err(CovenantError::UpstreamStore(StorageError::MigrationFailed {
            version: current,
            reason: format!("database is newer than this build (latest known {LATEST_VERSION})"),
        }));
    }

    let mut applied = 0;
    for &(version, name, migrate) in MIGRATIONS.iter().filter(|(v, _, _)| *v > current) {
        let fail = |reason: String| {
            CovenantError::UpstreamStore(StorageError::MigrationFailed { version, reason })
        };

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| fail(e.to_string()))?;
        migrate(&tx).map_err(|e| fail(e.to_string()))?;
        tx.pragma_update(None, "user_version", version)
            .map_err(|e| fail(e.to_string()))?;
        tx.commit().map_err(|e| fail(e.to_string()))?;

        tracing::info!(version, name, "applied migration");
        applied += 1;
    }
    Ok(applied)
}
