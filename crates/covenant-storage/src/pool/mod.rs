//! Connection pool managing read/write connections.

pub mod pragmas;
pub mod read_pool;
pub mod write_connection;

use std::path::{Path, PathBuf};

use covenant_core::errors::CovenantResult;

pub use read_pool::ReadPool;
pub use write_connection::WriteConnection;

/// Manages the single write connection and the read connection pool.
pub struct ConnectionPool {
    pub writer: WriteConnection,
    /// `None` in in-memory mode: a second in-memory connection would be a
    /// separate database, so reads go through the writer.
    pub readers: Option<ReadPool>,
    pub db_path: Option<PathBuf>,
}

impl ConnectionPool {
    /// Open a connection pool for the given database file. The writer opens
    /// first so the file exists before the read-only connections attach.
    pub fn open(path: &Path, read_pool_size: usize, busy_timeout_ms: u32) -> CovenantResult<Self> {
        let writer = WriteConnection::open(path, busy_timeout_ms)?;
        let readers = ReadPool::open(path, read_pool_size, busy_timeout_ms)?;
        Ok(Self {
            writer,
            readers: Some(readers),
            db_path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory(busy_timeout_ms: u32) -> CovenantResult<Self> {
        Ok(Self {
            writer: WriteConnection::open_in_memory(busy_timeout_ms)?,
            readers: None,
            db_path: None,
        })
    }
}
