pub mod migrations;
pub mod models;
pub mod queries;
pub mod seed;

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use rusqlite::{Connection, OpenFlags};
use thiserror::Error;
use tracing::info;

const READER_POOL_SIZE: usize = 4;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Unique constraint hit, e.g. a second user with the same Telegram id.
    #[error("{entity} already exists")]
    Conflict {
        entity: &'static str,
        field: &'static str,
    },

    /// A foreign key points at a row that does not exist.
    #[error("referenced {entity} does not exist")]
    MissingReference {
        entity: &'static str,
        field: &'static str,
    },

    #[error("data corruption: {0}")]
    DataCorruption(String),

    #[error("connection lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, DbError>;

/// SQLite handle with one writer connection and a small pool of readers.
///
/// WAL mode lets the readers proceed while the writer holds its lock.
pub struct Database {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    reader_idx: AtomicUsize,
}

impl Database {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let writer = Connection::open(path)?;
        writer.pragma_update(None, "journal_mode", "WAL")?;
        writer.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&writer)?;

        let mut readers = Vec::with_capacity(READER_POOL_SIZE);
        for _ in 0..READER_POOL_SIZE {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            readers.push(Mutex::new(conn));
        }

        info!(
            "Database opened at {} (1 writer + {} readers)",
            path.display(),
            READER_POOL_SIZE
        );
        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            reader_idx: AtomicUsize::new(0),
        })
    }

    /// Run a read-only closure on the next reader connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let idx = self.reader_idx.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[idx]
            .lock()
            .map_err(|_| DbError::LockPoisoned)?;
        f(&conn)
    }

    /// Run a closure on the writer connection. Reference checks and the write
    /// that depends on them share one critical section.
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.writer.lock().map_err(|_| DbError::LockPoisoned)?;
        f(&conn)
    }
}
