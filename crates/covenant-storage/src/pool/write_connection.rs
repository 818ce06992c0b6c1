//! The single serialized write connection.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, Transaction, TransactionBehavior};

use covenant_core::errors::CovenantResult;

use super::pragmas::apply_pragmas;
use crate::{sql_err, to_storage_err};

/// All writes go through this connection, one at a time.
pub struct WriteConnection {
    conn: Mutex<Connection>,
}

impl WriteConnection {
    pub fn open(path: &Path, busy_timeout_ms: u32) -> CovenantResult<Self> {
        let conn = Connection::open(path).map_err(sql_err)?;
        let mode = apply_pragmas(&conn, busy_timeout_ms)?;
        tracing::debug!(path = %path.display(), journal_mode = %mode, "write connection opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory(busy_timeout_ms: u32) -> CovenantResult<Self> {
        let conn = Connection::open_in_memory().map_err(sql_err)?;
        apply_pragmas(&conn, busy_timeout_ms)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` with exclusive access to the writer.
    pub fn with_conn<F, T>(&self, f: F) -> CovenantResult<T>
    where
        F: FnOnce(&Connection) -> CovenantResult<T>,
    {
        let guard = self
            .conn
            .lock()
            .map_err(|e| to_storage_err(format!("write lock poisoned: {e}")))?;
        f(&guard)
    }

    /// Run `f` inside a `BEGIN IMMEDIATE` transaction. Commits on `Ok`,
    /// rolls back when `f` errors.
    pub fn with_immediate_transaction<F, T>(&self, f: F) -> CovenantResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> CovenantResult<T>,
    {
        self.with_conn(|conn| {
            let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
                .map_err(sql_err)?;
            let out = f(&tx)?;
            tx.commit().map_err(sql_err)?;
            Ok(out)
        })
    }
}
