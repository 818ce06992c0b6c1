/// Storage-layer errors for SQLite operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("database busy: {message}")]
    Busy { message: String },

    #[error("migration failed at version {version}: {reason}")]
    MigrationFailed { version: u32, reason: String },

    #[error("corrupt row in {table}.{column}: {reason}")]
    CorruptRow {
        table: &'static str,
        column: &'static str,
        reason: String,
    },
}

impl StorageError {
    /// Whether the failure is transient (lock contention) and a read may be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }
}
