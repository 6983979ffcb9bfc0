//! HTTP 402 pay-per-request negotiation for Tollbooth.
//!
//! This crate gates HTTP routes behind a payment attached to the request. A
//! client that calls a priced route without paying receives a `402 Payment
//! Required` listing what the server accepts; it retries with a payment header,
//! the gate verifies the payment and consumes its nullifier, runs the handler,
//! and returns a settlement receipt.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    POST /api/agents/run    ┌──────────────────────────┐
//! │ PaymentClient│ ─────────────────────────→ │ PaidHandler              │
//! │              │ ←───────────────────────── │  ┌────────────┐          │
//! │              │   402 + PAYMENT-REQUIRED   │  │ RouteTable │          │
//! │              │                            │  └─────┬──────┘          │
//! │  proof engine│   POST + PAYMENT-SIGNATURE │  ┌─────▼──────┐          │
//! │  + wallet    │ ─────────────────────────→ │  │ PaymentGate│─► NullifierLedger
//! │              │                            │  └─────┬──────┘          │
//! │              │                            │  ┌─────▼──────┐          │
//! │              │   200 + PAYMENT-RESPONSE   │  │ handler    │─► TransferLedger
//! │              │ ←───────────────────────── │  └────────────┘          │
//! └──────────────┘                            └──────────────────────────┘
//! ```
//!
//! # Components
//!
//! - **[`types`]**: wire envelopes and configuration
//! - **[`commitment`]**: commitment/proof engine for both schemes
//! - **[`nullifier`]**: replay ledger trait and in-memory ledger
//! - **[`routes`]**: route policy matching
//! - **[`gate`]**: the server-side negotiation and [`with_payment`]
//! - **[`settlement`]**: transfer collaborator and settlement records
//! - **[`client`]**: the caller-side payment agent
//! - **[`error`]**: error taxonomy with recovery suggestions
//!
//! # Schemes
//!
//! - `exact`: the payer signs `H(sender || amount || nonce || timestamp)`.
//! - `zk-exact`: the payer commits to the payment terms and signs a binding
//!   over the commitment, nullifier and field hashes. Despite the name this is
//!   a commitment + signature scheme: it stops replay and tampering but does not
//!   hide the amount or the parties.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tollbooth_x402::{
//!     handler_fn, with_payment, BusinessHandler, HttpRequest, PaymentGate, PaymentScheme,
//!     RoutePolicy, X402Config,
//! };
//!
//! # async fn example(request: HttpRequest) -> Result<(), Box<dyn std::error::Error>> {
//! let config = X402Config::testnet("0xAGENT").with_route(RoutePolicy::new(
//!     "POST",
//!     "/api/agents/run",
//!     "0.001",
//!     PaymentScheme::ZkExact,
//!     "Run an agent",
//! ));
//! let gate = Arc::new(PaymentGate::new(config)?);
//!
//! let handler = with_payment(
//!     handler_fn(|_req: HttpRequest| async { http::Response::new(b"done".to_vec()) }),
//!     gate,
//! );
//! let response = handler.call(request).await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod commitment;
pub mod error;
pub mod gate;
pub mod nullifier;
pub mod routes;
pub mod settlement;
pub mod signer;
pub mod types;

// Re-export main types
pub use client::{HttpTransport, PaidResponse, PaymentClient, ReqwestTransport, RequestOptions};
pub use commitment::{
    create_commitment, generate_proof, verify_exact_signature, verify_proof, Commitment,
    GeneratedProof, ProofParams, ProofWindow,
};
pub use error::{ErrorCategory, X402Error, X402Result};
pub use gate::{
    handler_fn, with_payment, BusinessHandler, GateStatus, HttpRequest, HttpResponse,
    PaidHandler, PaymentGate, VerifiedPayment,
};
pub use nullifier::{InMemoryNullifierLedger, NullifierLedger};
pub use routes::{RoutePolicy, RouteTable};
pub use settlement::{SettlementRecord, TransferLedger};
pub use signer::{LocalWallet, WalletSigner};
pub use types::{
    ClientConfig, PaymentBody, PaymentPayload, PaymentRequired, PaymentRequirements,
    PaymentScheme, ProofData, PublicInputs, SettlementResponse, X402Config, ZkPaymentProof,
    DEFAULT_NETWORK, HEADER_PAYMENT_REQUIRED, HEADER_PAYMENT_RESPONSE, HEADER_PAYMENT_SIGNATURE,
    HEADER_X_PAYMENT, X402_VERSION,
};
