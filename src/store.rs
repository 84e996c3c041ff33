//! SQLite-backed instrument multiplier store
//!
//! Table `INSTRUMENT_PRICE_MODIFIER` maps an instrument name to the factor its
//! raw prices are multiplied by. Names are not unique; lookups return the
//! oldest matching row.
//!
//! The pipeline opens one bootstrap connection (schema, WAL) and then one
//! read-only connection per worker.

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::Path;
use std::time::Duration;

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS INSTRUMENT_PRICE_MODIFIER (
    ID INTEGER PRIMARY KEY,
    NAME TEXT NOT NULL,
    MULTIPLIER REAL NOT NULL
)";

const CREATE_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS idx_modifier_name ON INSTRUMENT_PRICE_MODIFIER(NAME)";

/// Concurrent readers wait this long for a writer before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub enum StoreError {
    Database(rusqlite::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err)
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

/// Keyed multiplier lookup used by the per-worker cache
pub trait MultiplierStore {
    /// Multiplier for an exact instrument name, `None` when no row matches
    fn lookup(&self, name: &str) -> Result<Option<f64>, StoreError>;
}

/// Multiplier store over a single SQLite connection
pub struct SqliteMultiplierStore {
    conn: Connection,
}

impl SqliteMultiplierStore {
    /// Open (or create) the database for read-write use
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self { conn })
    }

    /// Open an existing database for lookups only
    ///
    /// Used by pipeline workers; any write through this handle fails. A
    /// missing database file is an error, never created. The handle opens
    /// read-write at the SQLite level so WAL readers can maintain the shm file.
    pub fn open_read_only(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX
            | OpenFlags::SQLITE_OPEN_URI;
        let conn = Connection::open_with_flags(db_path, flags)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        // Must come after any PRAGMA that writes
        conn.execute("PRAGMA query_only = ON", [])?;

        Ok(Self { conn })
    }

    /// Create the modifier table if missing and switch to WAL
    ///
    /// Idempotent. WAL lets worker connections read while a seeding process
    /// writes.
    pub fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.execute(CREATE_TABLE_SQL, [])?;
        self.conn.execute(CREATE_INDEX_SQL, [])?;
        log::debug!("🔧 INSTRUMENT_PRICE_MODIFIER schema ready");
        Ok(())
    }

    /// Insert a multiplier row, returning its surrogate id
    pub fn insert(&self, name: &str, multiplier: f64) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO INSTRUMENT_PRICE_MODIFIER (NAME, MULTIPLIER) VALUES (?1, ?2)",
            params![name, multiplier],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Overwrite the multiplier of every row with this name
    ///
    /// Returns the number of rows changed.
    pub fn update(&self, name: &str, multiplier: f64) -> Result<usize, StoreError> {
        let changed = self.conn.execute(
            "UPDATE INSTRUMENT_PRICE_MODIFIER SET MULTIPLIER = ?1 WHERE NAME = ?2",
            params![multiplier, name],
        )?;
        Ok(changed)
    }
}

impl MultiplierStore for SqliteMultiplierStore {
    fn lookup(&self, name: &str) -> Result<Option<f64>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT MULTIPLIER FROM INSTRUMENT_PRICE_MODIFIER
             WHERE NAME = ?1
             ORDER BY ID ASC
             LIMIT 1",
        )?;

        let multiplier = stmt
            .query_row([name], |row| row.get::<_, f64>(0))
            .optional()?;

        Ok(multiplier)
    }
}
