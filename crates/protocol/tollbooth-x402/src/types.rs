//! x402 protocol types.
//!
//! Wire envelopes exchanged during the request → 402 → retry → 200 handshake,
//! plus server and client configuration.

use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{X402Error, X402Result};
use crate::routes::RoutePolicy;

/// x402 protocol version.
pub const X402_VERSION: u32 = 1;

/// Request header carrying the payment payload.
pub const HEADER_PAYMENT_SIGNATURE: &str = "PAYMENT-SIGNATURE";

/// Legacy alias of [`HEADER_PAYMENT_SIGNATURE`].
pub const HEADER_X_PAYMENT: &str = "X-PAYMENT";

/// Response header carrying the requirements list on a 402.
pub const HEADER_PAYMENT_REQUIRED: &str = "PAYMENT-REQUIRED";

/// Response header carrying the settlement outcome on a settled 2xx.
pub const HEADER_PAYMENT_RESPONSE: &str = "PAYMENT-RESPONSE";

/// Default network (Base Sepolia, CAIP-2).
pub const DEFAULT_NETWORK: &str = "eip155:84532";

/// Chain id of [`DEFAULT_NETWORK`].
pub const DEFAULT_CHAIN_ID: u64 = 84532;

/// Maximum age of a payment payload (seconds).
pub const DEFAULT_PAYMENT_WINDOW_SECS: u64 = 300;

/// Maximum age of a commitment proof (seconds).
pub const DEFAULT_PROOF_MAX_AGE_SECS: u64 = 3600;

/// Tolerated clock skew for proof timestamps ahead of the server (seconds).
pub const DEFAULT_PROOF_FUTURE_SKEW_SECS: u64 = 60;

/// Timeout for the settlement transfer (seconds).
pub const DEFAULT_SETTLEMENT_TIMEOUT_SECS: u64 = 30;

/// Timeout for the wallet signing oracle (seconds).
pub const DEFAULT_SIGNING_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Scheme
// =============================================================================

/// Payment-proof format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentScheme {
    /// Signed amount: `sign(H(sender || amount || nonce || timestamp))`.
    #[default]
    #[serde(rename = "exact")]
    Exact,
    /// Commitment + nullifier proof bound by a signature.
    #[serde(rename = "zk-exact")]
    ZkExact,
}

impl PaymentScheme {
    /// Wire identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::ZkExact => "zk-exact",
        }
    }
}

impl std::fmt::Display for PaymentScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentScheme {
    type Err = X402Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "zk-exact" | "zk_exact" | "zkexact" => Ok(Self::ZkExact),
            other => Err(X402Error::malformed(format!("unknown scheme: {other}"))),
        }
    }
}

// =============================================================================
// Payment Requirements (402 Response)
// =============================================================================

/// Server-declared price for a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    /// Payment scheme the server accepts.
    pub scheme: PaymentScheme,

    /// Network identifier (CAIP-2, e.g. "eip155:84532").
    pub network: String,

    /// Price in base-currency units, as a decimal string.
    pub max_amount_required: String,

    /// Recipient identity.
    pub pay_to: String,

    /// URI of the protected resource.
    pub resource: String,

    /// Human-readable description.
    pub description: String,

    /// MIME type of the resource.
    pub mime_type: String,

    /// Contract the proof is bound to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,

    /// Bounty the payment is tied to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounty_id: Option<String>,
}

impl PaymentRequirements {
    /// Required amount in 18-decimal base units.
    pub fn max_amount_base_units(&self) -> X402Result<u128> {
        Ok(tollbooth_crypto::parse_amount(&self.max_amount_required)?)
    }

    /// Chain id parsed from an `eip155:<id>` network.
    pub fn chain_id(&self) -> Option<u64> {
        chain_id_from_network(&self.network)
    }
}

/// Body of a 402 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequired {
    /// x402 protocol version.
    pub x402_version: u32,

    /// Why payment is (still) required.
    pub error: String,

    /// Requirements the client may satisfy.
    pub accepts: Vec<PaymentRequirements>,
}

impl PaymentRequired {
    /// Build a 402 body.
    pub fn new(error: impl Into<String>, accepts: Vec<PaymentRequirements>) -> Self {
        Self {
            x402_version: X402_VERSION,
            error: error.into(),
            accepts,
        }
    }

    /// Pick the requirement matching `preferred`, falling back to the first offered.
    pub fn select(&self, preferred: PaymentScheme) -> Option<&PaymentRequirements> {
        self.accepts
            .iter()
            .find(|r| r.scheme == preferred)
            .or_else(|| self.accepts.first())
    }
}

// =============================================================================
// Payment Payload (Client → Server)
// =============================================================================

/// Caller's attempt to satisfy a requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    /// x402 protocol version. Must be 1.
    #[serde(alias = "version")]
    pub x402_version: u32,

    /// The payment scheme used.
    pub scheme: PaymentScheme,

    /// Network the payment is for.
    pub network: String,

    /// Scheme-specific payment body.
    pub payload: PaymentBody,
}

/// Payment body shared by both schemes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBody {
    /// Payer address.
    pub sender: String,

    /// Amount paid, decimal string in base-currency units.
    pub amount: String,

    /// Single-use random value (256 bits, hex).
    pub nonce: String,

    /// Creation time (Unix seconds).
    pub timestamp: u64,

    /// Wallet signature envelope (`exact` scheme).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    /// Commitment proof (`zk-exact` scheme).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zk_proof: Option<ZkPaymentProof>,
}

impl PaymentPayload {
    /// Decode a payment payload from a base64-encoded header value.
    pub fn from_header(header_value: &str) -> X402Result<Self> {
        decode_header(header_value)
    }

    /// Encode this payment payload to a base64 string for the header.
    pub fn to_header(&self) -> X402Result<String> {
        encode_header(self)
    }
}

// =============================================================================
// Commitment proof
// =============================================================================

/// Commitment-based payment artifact.
///
/// This is a hash commitment bound by a wallet signature. It prevents replay and
/// tampering; it does not hide the amount, sender or receiver, whose pre-images
/// can be recomputed by anyone who sees the payload nonce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZkPaymentProof {
    /// `H(amount || nonce || sender || receiver || bountyId?)`
    pub commitment: String,

    /// `H(nonce || sender || creationTimeMillis)`; single use.
    pub nullifier: String,

    /// Hashed fields plus the binding signature.
    pub proof: ProofData,

    /// Values the verifier checks against its own configuration.
    pub public_inputs: PublicInputs,
}

/// Hashed proof fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofData {
    /// `H(amount || nonce)`
    pub amount_hash: String,
    /// `H(sender || nonce)`
    pub sender_hash: String,
    /// `H(receiver || nonce)`
    pub receiver_hash: String,
    /// Proof creation time (Unix seconds).
    pub timestamp: u64,
    /// Signature envelope over the binding message.
    pub signature: String,
}

/// Public inputs of a proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicInputs {
    /// Amount the proof commits to, decimal string.
    pub min_amount: String,
    /// Chain the proof is valid on.
    pub chain_id: u64,
    /// Contract the proof is valid for (empty if none).
    pub contract_address: String,
    /// Bounty the proof pays for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounty_id: Option<String>,
}

// =============================================================================
// Settlement Response (Server → Client after settlement)
// =============================================================================

/// Outcome of finalizing a verified payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResponse {
    /// Whether settlement succeeded.
    pub success: bool,

    /// On-chain transaction hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,

    /// Off-chain receipt, `offchain:<nonce>:<timestampMillis>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,

    /// Network the settlement occurred on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,

    /// If failed, the error reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SettlementResponse {
    /// Decode from a base64 `PAYMENT-RESPONSE` header value.
    pub fn from_header(header_value: &str) -> X402Result<Self> {
        decode_header(header_value)
    }

    /// Encode for the `PAYMENT-RESPONSE` header.
    pub fn to_header(&self) -> X402Result<String> {
        encode_header(self)
    }
}

// =============================================================================
// Header codec
// =============================================================================

/// Encode a value as `base64(JSON(value))`.
pub fn encode_header<T: Serialize + ?Sized>(value: &T) -> X402Result<String> {
    let json = serde_json::to_vec(value)
        .map_err(|e| X402Error::Internal(format!("JSON encode error: {}", e)))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(json))
}

/// Decode a `base64(JSON(value))` header value.
pub fn decode_header<T: DeserializeOwned>(header_value: &str) -> X402Result<T> {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(header_value.trim())
        .map_err(|e| X402Error::malformed(format!("base64 decode error: {}", e)))?;
    serde_json::from_slice(&decoded)
        .map_err(|e| X402Error::malformed(format!("JSON parse error: {}", e)))
}

/// Parse the chain id out of an `eip155:<id>` network string.
pub fn chain_id_from_network(network: &str) -> Option<u64> {
    network
        .strip_prefix("eip155:")
        .and_then(|id| id.parse().ok())
}

// =============================================================================
// Configuration
// =============================================================================

/// Server-side payment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct X402Config {
    /// Whether x402 payments are enabled.
    pub enabled: bool,

    /// Network advertised in requirements.
    pub network: String,

    /// Chain id proofs must be bound to.
    pub chain_id: u64,

    /// Recipient of payments.
    pub pay_to: String,

    /// Contract proofs are bound to; enables on-chain settlement.
    pub contract_address: Option<String>,

    /// Bounty attached to every requirement, if any.
    pub bounty_id: Option<String>,

    /// MIME type advertised for protected resources.
    pub mime_type: String,

    /// Prefix joined with the request path to form the `resource` URI.
    pub resource_base: String,

    /// Maximum payload age in seconds.
    pub payment_window_secs: u64,

    /// Maximum proof age in seconds.
    pub proof_max_age_secs: u64,

    /// Tolerated proof clock skew in seconds.
    pub proof_future_skew_secs: u64,

    /// Settlement transfer timeout in seconds.
    pub settlement_timeout_secs: u64,

    /// Metered routes.
    pub routes: Vec<RoutePolicy>,
}

impl Default for X402Config {
    fn default() -> Self {
        Self {
            enabled: false,
            network: DEFAULT_NETWORK.to_string(),
            chain_id: DEFAULT_CHAIN_ID,
            pay_to: String::new(),
            contract_address: None,
            bounty_id: None,
            mime_type: "application/json".to_string(),
            resource_base: String::new(),
            payment_window_secs: DEFAULT_PAYMENT_WINDOW_SECS,
            proof_max_age_secs: DEFAULT_PROOF_MAX_AGE_SECS,
            proof_future_skew_secs: DEFAULT_PROOF_FUTURE_SKEW_SECS,
            settlement_timeout_secs: DEFAULT_SETTLEMENT_TIMEOUT_SECS,
            routes: Vec::new(),
        }
    }
}

impl X402Config {
    /// Enabled configuration on the default testnet, paying `pay_to`.
    pub fn testnet(pay_to: &str) -> Self {
        Self {
            enabled: true,
            pay_to: pay_to.to_string(),
            ..Self::default()
        }
    }

    /// Add a route policy.
    pub fn with_route(mut self, route: RoutePolicy) -> Self {
        self.routes.push(route);
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> X402Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.pay_to.trim().is_empty() {
            return Err(X402Error::NotConfigured);
        }
        // Clients derive the proof chain from the advertised network.
        if let Some(id) = chain_id_from_network(&self.network) {
            if id != self.chain_id {
                return Err(X402Error::NetworkChainConflict {
                    network: self.network.clone(),
                    chain_id: self.chain_id,
                });
            }
        }
        for route in &self.routes {
            tollbooth_crypto::parse_amount(&route.price).map_err(|e| X402Error::InvalidRoute {
                pattern: route.key(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}

/// Caller-side configuration for the payment agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Scheme to pick when the server offers several.
    pub preferred_scheme: PaymentScheme,

    /// Signing oracle timeout in seconds.
    pub signing_timeout_secs: u64,

    /// Chain id used when the requirement network carries none.
    pub fallback_chain_id: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            preferred_scheme: PaymentScheme::ZkExact,
            signing_timeout_secs: DEFAULT_SIGNING_TIMEOUT_SECS,
            fallback_chain_id: DEFAULT_CHAIN_ID,
        }
    }
}
