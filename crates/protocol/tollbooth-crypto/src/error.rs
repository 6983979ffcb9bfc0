//! Error types for tollbooth-crypto

use thiserror::Error;

/// Errors that can occur in cryptographic operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Address string is not `0x` + 40 hex characters
    #[error("Invalid address format: {0}")]
    InvalidAddress(String),

    /// Invalid hex encoding
    #[error("Invalid hex encoding: {0}")]
    InvalidHex(String),

    /// Invalid key or signature length
    #[error("Invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Amount string could not be parsed as a fixed-point decimal
    #[error("Invalid amount '{value}': {reason}")]
    InvalidAmount { value: String, reason: String },

    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,
}
