//! SQL schema initialization.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Schema version for migration tracking.
pub const SCHEMA_VERSION: u32 = 1;

/// Initialize the database schema.
///
/// Idempotent; refuses databases written by a newer schema.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    // WAL lets readers proceed while a consume is being written.
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        [],
    )?;

    let current_version: Option<u32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .ok();

    match current_version {
        None => {
            create_tables(conn)?;
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )?;
        }
        Some(version) if version > SCHEMA_VERSION => {
            return Err(StoreError::Schema(format!(
                "database schema {} is newer than supported {}",
                version, SCHEMA_VERSION
            )));
        }
        Some(_) => {}
    }

    Ok(())
}

fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS nullifiers (
            nullifier TEXT PRIMARY KEY,
            consumed_at INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_nullifiers_consumed ON nullifiers(consumed_at)",
        [],
    )?;

    Ok(())
}
