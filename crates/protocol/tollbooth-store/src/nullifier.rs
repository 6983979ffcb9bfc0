//! SQLite-backed nullifier ledger.
//!
//! Consumed nullifiers survive restarts, so a proof accepted before a restart
//! is still rejected after it.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use tollbooth_x402::commitment::now_secs;
use tollbooth_x402::nullifier::normalize_nullifier;
use tollbooth_x402::{NullifierLedger, X402Result};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::schema::initialize_schema;

/// Durable nullifier ledger.
#[derive(Clone)]
pub struct SqliteNullifierLedger {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteNullifierLedger {
    /// Open (or create) the ledger database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        initialize_schema(&conn)?;
        debug!(path = %path.display(), "Opened nullifier ledger");
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }

    /// In-memory database, for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }

    /// Wrap an existing connection whose schema is already initialized.
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::lock_poisoned("database connection lock poisoned"))
    }

    fn insert(&self, nullifier: &str) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "INSERT OR IGNORE INTO nullifiers (nullifier, consumed_at) VALUES (?1, ?2)",
            params![normalize_nullifier(nullifier), now_secs() as i64],
        )?;
        Ok(changed == 1)
    }

    /// When `nullifier` was consumed (Unix seconds), if it was.
    pub fn consumed_at(&self, nullifier: &str) -> Result<Option<u64>> {
        let conn = self.lock()?;
        let at: Option<i64> = conn
            .query_row(
                "SELECT consumed_at FROM nullifiers WHERE nullifier = ?1",
                [normalize_nullifier(nullifier)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(at.map(|t| t as u64))
    }
}

impl NullifierLedger for SqliteNullifierLedger {
    fn is_used(&self, nullifier: &str) -> X402Result<bool> {
        Ok(self.consumed_at(nullifier)?.is_some())
    }

    fn mark_used(&self, nullifier: &str) -> X402Result<()> {
        self.insert(nullifier)?;
        Ok(())
    }

    fn try_consume(&self, nullifier: &str) -> X402Result<bool> {
        Ok(self.insert(nullifier)?)
    }

    fn clear(&self) -> X402Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM nullifiers", [])
            .map_err(StoreError::from)?;
        Ok(())
    }

    fn len(&self) -> X402Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM nullifiers", [], |row| row.get(0))
            .map_err(StoreError::from)?;
        Ok(count as usize)
    }
}
