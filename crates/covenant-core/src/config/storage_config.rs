use serde::{Deserialize, Serialize};

use super::defaults;

/// Storage subsystem configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    pub db_path: String,
    /// Number of read connections in the pool.
    pub read_pool_size: usize,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
    /// Attempts for idempotent reads that hit a busy database.
    pub read_retry_attempts: u32,
    /// Fixed backoff between read attempts.
    pub read_retry_backoff_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: defaults::DEFAULT_DB_FILENAME.to_string(),
            read_pool_size: defaults::DEFAULT_READ_POOL_SIZE,
            busy_timeout_ms: defaults::DEFAULT_BUSY_TIMEOUT_MS,
            read_retry_attempts: defaults::DEFAULT_READ_RETRY_ATTEMPTS,
            read_retry_backoff_ms: defaults::DEFAULT_READ_RETRY_BACKOFF_MS,
        }
    }
}
