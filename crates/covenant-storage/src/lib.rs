//! # covenant-storage
//!
//! SQLite persistence for every engine: one serialized writer, a small pool
//! of WAL readers, versioned migrations, and one query module per table.

pub mod engine;
pub mod migrations;
pub mod pool;
pub mod queries;
pub mod row;

pub use engine::StorageEngine;

use covenant_core::errors::{CovenantError, StorageError};

/// Wrap a plain message as a storage error.
pub fn to_storage_err(message: String) -> CovenantError {
    if is_busy_message(&message) {
        CovenantError::UpstreamStore(StorageError::Busy { message })
    } else {
        CovenantError::UpstreamStore(StorageError::SqliteError { message })
    }
}

/// Map a rusqlite error, keeping busy/locked and corrupt-column failures distinct.
pub fn sql_err(err: rusqlite::Error) -> CovenantError {
    use rusqlite::ErrorCode;

    match err {
        rusqlite::Error::SqliteFailure(ref code, _)
            if matches!(code.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
        {
            CovenantError::UpstreamStore(StorageError::Busy {
                message: err.to_string(),
            })
        }
        rusqlite::Error::FromSqlConversionFailure(_, _, inner) => {
            match inner.downcast::<row::CorruptColumn>() {
                Ok(corrupt) => {
                    let row::CorruptColumn {
                        table,
                        column,
                        reason,
                    } = *corrupt;
                    CovenantError::UpstreamStore(StorageError::CorruptRow {
                        table,
                        column,
                        reason,
                    })
                }
                Err(other) => to_storage_err(other.to_string()),
            }
        }
        other => to_storage_err(other.to_string()),
    }
}

fn is_busy_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("database is locked") || lower.contains("database table is locked")
}
