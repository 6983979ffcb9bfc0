//! Error types for x402 payment negotiation.

use thiserror::Error;

/// Result type for x402 operations.
pub type X402Result<T> = Result<T, X402Error>;

/// Broad classification of an [`X402Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The payload does not speak the protocol the server expects.
    Protocol,
    /// The payload is well-formed but does not pay for the resource.
    Payment,
    /// Finalizing an accepted payment failed.
    Settlement,
    /// Caller-side negotiation outcome or HTTP failure.
    Transport,
    /// Misconfiguration.
    Config,
    /// Storage or other internal failure.
    Internal,
}

/// Errors that can occur during x402 payment operations.
#[derive(Debug, Error)]
pub enum X402Error {
    // =========================================================================
    // Protocol errors
    // =========================================================================
    /// Payload declares a protocol version other than 1.
    #[error("unsupported x402 version: {version}")]
    UnsupportedVersion {
        /// Version found in the payload
        version: u32,
    },

    /// Payload scheme differs from the scheme the requirement declares.
    #[error("scheme mismatch: required {expected}, received {received}")]
    SchemeMismatch {
        /// Scheme of the requirement
        expected: String,
        /// Scheme of the payload
        received: String,
    },

    /// Payload targets a different network than the requirement.
    #[error("network mismatch: required {expected}, received {received}")]
    NetworkMismatch {
        /// Network of the requirement
        expected: String,
        /// Network of the payload
        received: String,
    },

    /// Payment payload is malformed or missing required fields.
    #[error("malformed payment payload: {reason}")]
    MalformedPayload {
        /// Description of what's wrong
        reason: String,
    },

    // =========================================================================
    // Payment errors
    // =========================================================================
    /// Payment amount is below the price of the resource.
    #[error("insufficient amount: required {required}, received {received}")]
    InsufficientAmount {
        /// Amount required (decimal string)
        required: String,
        /// Amount received (decimal string)
        received: String,
    },

    /// Payload timestamp is older than the payment window.
    #[error("payment expired: created {age_secs}s ago")]
    PaymentExpired {
        /// Age of the payload in seconds
        age_secs: u64,
    },

    /// The nullifier was already consumed by an earlier payment.
    #[error("nullifier already spent: {nullifier}")]
    NullifierSpent {
        /// The spent nullifier
        nullifier: String,
    },

    /// Signature missing, unrecoverable, or not from the sender.
    #[error("invalid payment signature")]
    InvalidSignature,

    /// Proof was built for another chain.
    #[error("chain mismatch: expected {expected}, proof has {received}")]
    ChainMismatch {
        /// Chain id the server expects
        expected: u64,
        /// Chain id in the proof
        received: u64,
    },

    /// Proof was built for another contract.
    #[error("contract mismatch: expected {expected}, proof has {received}")]
    ContractMismatch {
        /// Contract address the server expects
        expected: String,
        /// Contract address in the proof
        received: String,
    },

    /// Proof timestamp is older than the proof lifetime.
    #[error("proof expired: created {age_secs}s ago")]
    ProofExpired {
        /// Age of the proof in seconds
        age_secs: u64,
    },

    /// Proof timestamp is too far ahead of the server clock.
    #[error("proof timestamp {timestamp} is in the future")]
    TimestampInFuture {
        /// Proof timestamp (Unix seconds)
        timestamp: u64,
    },

    // =========================================================================
    // Settlement errors
    // =========================================================================
    /// Value transfer failed or timed out.
    #[error("settlement failed: {reason}")]
    SettlementFailed {
        /// Reason for failure
        reason: String,
    },

    // =========================================================================
    // Caller-side errors
    // =========================================================================
    /// The server demands payment and the client could not offer one.
    #[error("payment required: {reason}")]
    PaymentRequired {
        /// Error text from the 402 body
        reason: String,
    },

    /// The server rejected the payment the client made.
    #[error("payment failed: {reason}")]
    PaymentFailed {
        /// Error text from the second 402 body
        reason: String,
    },

    /// The signing oracle failed or timed out.
    #[error("signing unavailable: {reason}")]
    SigningUnavailable {
        /// Reason for failure
        reason: String,
    },

    /// HTTP transport error.
    #[error("transport error: {0}")]
    Transport(String),

    // =========================================================================
    // Configuration / internal
    // =========================================================================
    /// x402 is not configured or disabled.
    #[error("x402 payments not configured")]
    NotConfigured,

    /// A route pattern could not be compiled.
    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidRoute {
        /// The offending pattern
        pattern: String,
        /// Compilation error
        reason: String,
    },

    /// Configured network and chain id disagree.
    #[error("network {network} does not match chain id {chain_id}")]
    NetworkChainConflict {
        /// Advertised network
        network: String,
        /// Configured chain id
        chain_id: u64,
    },

    /// Nullifier storage failure.
    #[error("nullifier ledger error: {0}")]
    Ledger(String),

    /// Internal error.
    #[error("internal x402 error: {0}")]
    Internal(String),
}

impl X402Error {
    /// Shorthand for a malformed-payload error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            reason: reason.into(),
        }
    }

    /// Classify this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnsupportedVersion { .. }
            | Self::SchemeMismatch { .. }
            | Self::NetworkMismatch { .. }
            | Self::MalformedPayload { .. } => ErrorCategory::Protocol,
            Self::InsufficientAmount { .. }
            | Self::PaymentExpired { .. }
            | Self::NullifierSpent { .. }
            | Self::InvalidSignature
            | Self::ChainMismatch { .. }
            | Self::ContractMismatch { .. }
            | Self::ProofExpired { .. }
            | Self::TimestampInFuture { .. } => ErrorCategory::Payment,
            Self::SettlementFailed { .. } => ErrorCategory::Settlement,
            Self::PaymentRequired { .. }
            | Self::PaymentFailed { .. }
            | Self::SigningUnavailable { .. }
            | Self::Transport(_) => ErrorCategory::Transport,
            Self::NotConfigured
            | Self::InvalidRoute { .. }
            | Self::NetworkChainConflict { .. } => ErrorCategory::Config,
            Self::Ledger(_) | Self::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Returns a user-friendly suggestion for recovering from this error.
    pub fn suggestion(&self) -> &str {
        match self {
            Self::UnsupportedVersion { .. } => "Send x402Version 1",
            Self::SchemeMismatch { .. } => "Pay with the scheme listed in the 402 accepts array",
            Self::NetworkMismatch { .. } => "Pay on the network listed in the 402 accepts array",
            Self::MalformedPayload { .. } => "Send base64-encoded JSON matching the PaymentPayload format",
            Self::InsufficientAmount { .. } => "Pay at least maxAmountRequired",
            Self::PaymentExpired { .. } => "Build a new payment; payloads are valid for 5 minutes",
            Self::NullifierSpent { .. } => "Generate a fresh proof; each proof pays once",
            Self::InvalidSignature => "Sign the payment with the sender's wallet",
            Self::ChainMismatch { .. } => "Build the proof for the chain in the requirement's network",
            Self::ContractMismatch { .. } => "Build the proof for the requirement's contractAddress",
            Self::ProofExpired { .. } => "Generate a fresh proof; proofs are valid for one hour",
            Self::TimestampInFuture { .. } => "Check the client clock",
            Self::SettlementFailed { .. } => "Reconcile the payment out-of-band",
            Self::PaymentRequired { .. } => "Configure a wallet so the client can pay",
            Self::PaymentFailed { .. } => "Inspect the rejection reason and retry with a fresh payment",
            Self::SigningUnavailable { .. } => "Check that the wallet is unlocked and reachable",
            Self::Transport(_) => "Check network connectivity to the server",
            Self::NotConfigured => "Enable x402 in the configuration",
            Self::InvalidRoute { .. } => "Fix the route pattern in the configuration",
            Self::NetworkChainConflict { .. } => "Set chain_id to the id in the eip155 network",
            Self::Ledger(_) => "Check the nullifier database",
            Self::Internal(_) => "This is an internal error; please report it",
        }
    }

    /// Returns true if this error is transient and the operation may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::SettlementFailed { .. } | Self::SigningUnavailable { .. }
        )
    }

    /// Returns the HTTP status code a server should answer with.
    ///
    /// Every protocol and payment failure is answered with a fresh 402.
    pub fn http_status(&self) -> u16 {
        match self.category() {
            ErrorCategory::Protocol | ErrorCategory::Payment => 402,
            ErrorCategory::Config => 501,
            _ => 500,
        }
    }
}

impl From<reqwest::Error> for X402Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

impl From<tollbooth_crypto::CryptoError> for X402Error {
    fn from(e: tollbooth_crypto::CryptoError) -> Self {
        Self::MalformedPayload {
            reason: e.to_string(),
        }
    }
}
