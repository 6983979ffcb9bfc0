//! Durable storage for Tollbooth.
//!
//! Provides [`SqliteNullifierLedger`], a [`NullifierLedger`] that keeps consumed
//! nullifiers in SQLite so replay protection survives process restarts.
//!
//! # Storage Layout
//!
//! ```text
//! ~/.tollbooth/
//! ├── config.toml        # CLI configuration
//! ├── wallet/
//! │   └── wallet.key     # Hex-encoded wallet secret
//! └── nullifiers.db      # SQLite: consumed nullifiers
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tollbooth_store::{default_data_dir, SqliteNullifierLedger};
//! use tollbooth_x402::{PaymentGate, X402Config};
//!
//! let ledger = SqliteNullifierLedger::open(default_data_dir().join("nullifiers.db"))
//!     .expect("Failed to open ledger");
//! let gate = PaymentGate::new(X402Config::testnet("0xAGENT"))
//!     .expect("Invalid config")
//!     .with_ledger(Arc::new(ledger));
//! ```
//!
//! [`NullifierLedger`]: tollbooth_x402::NullifierLedger

pub mod error;
pub mod nullifier;
pub mod schema;

pub use error::{Result, StoreError};
pub use nullifier::SqliteNullifierLedger;
pub use schema::{initialize_schema, SCHEMA_VERSION};

use std::path::PathBuf;

/// Default file name of the nullifier database.
pub const NULLIFIER_DB_FILE: &str = "nullifiers.db";

/// Get the default data directory for Tollbooth state.
///
/// Priority:
/// 1. `TOLLBOOTH_DATA_DIR` environment variable (if set)
/// 2. `$HOME/.tollbooth`
/// 3. Platform-specific data directory
pub fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TOLLBOOTH_DATA_DIR") {
        return PathBuf::from(dir);
    }

    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".tollbooth"))
        .or_else(|| {
            directories::ProjectDirs::from("io", "tollbooth", "tollbooth")
                .map(|dirs| dirs.data_dir().to_path_buf())
        })
        .unwrap_or_else(|| PathBuf::from(".tollbooth"))
}
