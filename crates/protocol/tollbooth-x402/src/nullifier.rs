//! Nullifier ledger: the single authority on double-spend prevention.
//!
//! The gate only talks to the [`NullifierLedger`] trait, so storage lifetime is
//! decided by whoever builds the gate: [`InMemoryNullifierLedger`] for tests and
//! development, a durable implementation (see `tollbooth-store`) in production.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::error::{X402Error, X402Result};

/// Process-wide set of consumed nullifiers.
///
/// Implementations normalize keys to lowercase, so hex nullifiers compare
/// case-insensitively.
pub trait NullifierLedger: Send + Sync {
    /// Whether `nullifier` was consumed.
    fn is_used(&self, nullifier: &str) -> X402Result<bool>;

    /// Record `nullifier` as consumed. Idempotent.
    fn mark_used(&self, nullifier: &str) -> X402Result<()>;

    /// Atomically consume `nullifier` if it is unused.
    ///
    /// Returns `true` for exactly one caller per nullifier over the ledger's
    /// lifetime, however many race.
    fn try_consume(&self, nullifier: &str) -> X402Result<bool>;

    /// Drop every entry. Administrative reset for tests and development.
    fn clear(&self) -> X402Result<()>;

    /// Number of consumed nullifiers.
    fn len(&self) -> X402Result<usize>;

    /// Whether the ledger is empty.
    fn is_empty(&self) -> X402Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Normalize a nullifier for storage.
pub fn normalize_nullifier(nullifier: &str) -> String {
    nullifier.trim().to_ascii_lowercase()
}

/// Mutex-guarded in-memory ledger. History is lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryNullifierLedger {
    used: Mutex<HashSet<String>>,
}

impl InMemoryNullifierLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> X402Result<std::sync::MutexGuard<'_, HashSet<String>>> {
        self.used
            .lock()
            .map_err(|_| X402Error::Ledger("nullifier set lock poisoned".to_string()))
    }
}

impl NullifierLedger for InMemoryNullifierLedger {
    fn is_used(&self, nullifier: &str) -> X402Result<bool> {
        Ok(self.lock()?.contains(&normalize_nullifier(nullifier)))
    }

    fn mark_used(&self, nullifier: &str) -> X402Result<()> {
        self.lock()?.insert(normalize_nullifier(nullifier));
        Ok(())
    }

    fn try_consume(&self, nullifier: &str) -> X402Result<bool> {
        Ok(self.lock()?.insert(normalize_nullifier(nullifier)))
    }

    fn clear(&self) -> X402Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    fn len(&self) -> X402Result<usize> {
        Ok(self.lock()?.len())
    }
}
