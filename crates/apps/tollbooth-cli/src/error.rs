//! CLI error types.

use thiserror::Error;
use tollbooth_x402::{ErrorCategory, X402Error};

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;

/// CLI error enum wrapping all crate errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Payment protocol error.
    #[error("{0}")]
    Payment(#[from] X402Error),

    /// Store error.
    #[error("{0}")]
    Store(#[from] tollbooth_store::StoreError),

    /// IO error.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// User-facing error with actionable message.
    #[error("{0}")]
    User(String),

    /// No wallet key on disk.
    #[error("Wallet not initialized. Run 'tollbooth keygen' first.")]
    WalletNotInitialized,

    /// Refusing to overwrite an existing wallet key.
    #[error("Wallet already exists at {0}. Pass --force to overwrite.")]
    WalletExists(String),
}

impl CliError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a user-facing error.
    pub fn user(msg: impl Into<String>) -> Self {
        Self::User(msg.into())
    }

    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) | Self::WalletExists(_) => 1,
            Self::WalletNotInitialized => 2,
            Self::Config(_) | Self::Toml(_) => 3,
            Self::Payment(e) => match e.category() {
                ErrorCategory::Protocol | ErrorCategory::Payment => 4,
                ErrorCategory::Transport => 5,
                ErrorCategory::Settlement => 7,
                ErrorCategory::Config => 3,
                ErrorCategory::Internal => 8,
            },
            Self::Store(_) => 6,
            Self::Io(_) => 9,
            Self::Json(_) => 10,
        }
    }

    /// Recovery hint shown under the error line, if any.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Payment(e) => Some(e.suggestion()),
            Self::Store(_) => Some("Check the nullifier database under the data directory"),
            Self::WalletNotInitialized => Some("Create a wallet with 'tollbooth keygen'"),
            Self::Config(_) | Self::Toml(_) => Some("Fix the configuration file or pass --config"),
            _ => None,
        }
    }
}
