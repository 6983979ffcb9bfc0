//! Commitment/proof engine.
//!
//! Builds and verifies the payment artifacts of both schemes. Apart from the
//! signing oracle call in [`generate_proof`] and [`sign_exact_payment`], every
//! function here is pure: no ledger access, no network I/O.
//!
//! ```text
//! commitment   = H(amount || nonce || sender || receiver || bountyId?)
//! nullifier    = H(nonce || sender || creationTimeMillis)
//! amountHash   = H(amount || nonce)
//! senderHash   = H(sender || nonce)
//! receiverHash = H(receiver || nonce)
//! signature    = sign(H(commitment || nullifier || amountHash || senderHash || receiverHash || timestamp))
//! ```
//!
//! Amounts enter every hash as integer base units; identities are lowercased
//! first so address case never changes a hash.

use std::time::Duration;

use tollbooth_crypto::{
    addresses_equal, domain, format_amount, hash_fields, random_nonce, recover_signer, Address,
    Hash,
};
use tracing::debug;

use crate::error::{X402Error, X402Result};
use crate::signer::{sign_with_timeout, WalletSigner};
use crate::types::{
    ProofData, PublicInputs, ZkPaymentProof, DEFAULT_PROOF_FUTURE_SKEW_SECS,
    DEFAULT_PROOF_MAX_AGE_SECS,
};

/// Fresh commitment material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commitment {
    /// Binding hash of the payment terms.
    pub commitment: Hash,
    /// Random single-use value.
    pub nonce: String,
    /// Replay key.
    pub nullifier: Hash,
    /// Creation time (Unix milliseconds) folded into the nullifier.
    pub created_at_ms: u64,
}

fn normalize(identity: &str) -> String {
    identity.trim().to_ascii_lowercase()
}

/// Commit to a payment with a fresh random nonce.
pub fn create_commitment(
    amount: u128,
    sender: &str,
    receiver: &str,
    bounty_id: Option<&str>,
) -> Commitment {
    commitment_with(
        amount,
        sender,
        receiver,
        bounty_id,
        random_nonce(),
        now_millis(),
    )
}

/// Deterministic form of [`create_commitment`].
pub fn commitment_with(
    amount: u128,
    sender: &str,
    receiver: &str,
    bounty_id: Option<&str>,
    nonce: String,
    created_at_ms: u64,
) -> Commitment {
    let commitment = commitment_hash(amount, &nonce, sender, receiver, bounty_id);
    let nullifier = proof_nullifier(&nonce, sender, created_at_ms);

    Commitment {
        commitment,
        nonce,
        nullifier,
        created_at_ms,
    }
}

/// `H(amount || nonce || sender || receiver || bountyId?)`
pub fn commitment_hash(
    amount: u128,
    nonce: &str,
    sender: &str,
    receiver: &str,
    bounty_id: Option<&str>,
) -> Hash {
    let sender = normalize(sender);
    let receiver = normalize(receiver);
    let amount = amount.to_string();

    let mut fields: Vec<&[u8]> = vec![
        amount.as_bytes(),
        nonce.as_bytes(),
        sender.as_bytes(),
        receiver.as_bytes(),
    ];
    if let Some(bounty) = bounty_id {
        fields.push(bounty.as_bytes());
    }
    hash_fields(domain::COMMITMENT, &fields)
}

/// `H(nonce || sender || creationTimeMillis)`
pub fn proof_nullifier(nonce: &str, sender: &str, created_at_ms: u64) -> Hash {
    let sender = normalize(sender);
    hash_fields(
        domain::NULLIFIER,
        &[
            nonce.as_bytes(),
            sender.as_bytes(),
            created_at_ms.to_string().as_bytes(),
        ],
    )
}

/// `H(amount || nonce)`
pub fn amount_hash(amount: u128, nonce: &str) -> Hash {
    hash_fields(
        domain::AMOUNT,
        &[amount.to_string().as_bytes(), nonce.as_bytes()],
    )
}

/// `H(sender || nonce)`
pub fn sender_hash(sender: &str, nonce: &str) -> Hash {
    hash_fields(domain::SENDER, &[normalize(sender).as_bytes(), nonce.as_bytes()])
}

/// `H(receiver || nonce)`
pub fn receiver_hash(receiver: &str, nonce: &str) -> Hash {
    hash_fields(
        domain::RECEIVER,
        &[normalize(receiver).as_bytes(), nonce.as_bytes()],
    )
}

/// The message the prover signs.
///
/// Hashes the proof fields exactly as they appear on the wire, so any edit to a
/// transmitted field breaks the signature.
pub fn binding_message(
    commitment: &str,
    nullifier: &str,
    amount_hash: &str,
    sender_hash: &str,
    receiver_hash: &str,
    timestamp: u64,
) -> Hash {
    hash_fields(
        domain::PROOF_BINDING,
        &[
            commitment.as_bytes(),
            nullifier.as_bytes(),
            amount_hash.as_bytes(),
            sender_hash.as_bytes(),
            receiver_hash.as_bytes(),
            &timestamp.to_be_bytes(),
        ],
    )
}

/// Inputs of a commitment proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofParams {
    /// Amount in base units.
    pub amount: u128,
    /// Payer address.
    pub sender: String,
    /// Recipient address.
    pub receiver: String,
    /// Chain the proof is bound to.
    pub chain_id: u64,
    /// Contract the proof is bound to (empty for none).
    pub contract_address: String,
    /// Bounty the payment is for.
    pub bounty_id: Option<String>,
}

/// A proof together with the nonce that opens its hashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedProof {
    /// The proof artifact.
    pub proof: ZkPaymentProof,
    /// Nonce used for every hash in the proof.
    pub nonce: String,
}

/// Build a signed commitment proof.
///
/// # Errors
/// `SigningUnavailable` if the oracle fails or does not answer within
/// `signing_timeout`.
pub async fn generate_proof(
    params: &ProofParams,
    signer: &dyn WalletSigner,
    signing_timeout: Duration,
) -> X402Result<GeneratedProof> {
    let committed = create_commitment(
        params.amount,
        &params.sender,
        &params.receiver,
        params.bounty_id.as_deref(),
    );
    let nonce = committed.nonce.clone();

    let commitment = committed.commitment.to_string();
    let nullifier = committed.nullifier.to_string();
    let amount_hash = amount_hash(params.amount, &nonce).to_string();
    let sender_hash = sender_hash(&params.sender, &nonce).to_string();
    let receiver_hash = receiver_hash(&params.receiver, &nonce).to_string();
    let timestamp = now_secs();

    let message = binding_message(
        &commitment,
        &nullifier,
        &amount_hash,
        &sender_hash,
        &receiver_hash,
        timestamp,
    );
    let signature = sign_with_timeout(signer, message.as_ref(), signing_timeout).await?;

    debug!(nullifier = %nullifier, chain_id = params.chain_id, "Generated commitment proof");

    Ok(GeneratedProof {
        proof: ZkPaymentProof {
            commitment,
            nullifier,
            proof: ProofData {
                amount_hash,
                sender_hash,
                receiver_hash,
                timestamp,
                signature,
            },
            public_inputs: PublicInputs {
                min_amount: format_amount(params.amount),
                chain_id: params.chain_id,
                contract_address: params.contract_address.clone(),
                bounty_id: params.bounty_id.clone(),
            },
        },
        nonce,
    })
}

/// Age limits applied to proof timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofWindow {
    /// Oldest acceptable proof, in seconds.
    pub max_age_secs: u64,
    /// How far ahead of the verifier clock a proof may be, in seconds.
    pub future_skew_secs: u64,
}

impl Default for ProofWindow {
    fn default() -> Self {
        Self {
            max_age_secs: DEFAULT_PROOF_MAX_AGE_SECS,
            future_skew_secs: DEFAULT_PROOF_FUTURE_SKEW_SECS,
        }
    }
}

/// Verify a proof against the current time and default window.
///
/// Returns the recovered signer. Says nothing about nullifier freshness.
pub fn verify_proof(
    proof: &ZkPaymentProof,
    expected_chain_id: u64,
    expected_contract_address: &str,
) -> X402Result<Address> {
    verify_proof_at(
        proof,
        expected_chain_id,
        expected_contract_address,
        ProofWindow::default(),
        now_secs(),
    )
}

/// Verify a proof at `now` (Unix seconds).
///
/// Checks, in order: chain id, contract address (case-insensitive), maximum
/// age, future skew, then the binding signature.
pub fn verify_proof_at(
    proof: &ZkPaymentProof,
    expected_chain_id: u64,
    expected_contract_address: &str,
    window: ProofWindow,
    now: u64,
) -> X402Result<Address> {
    let inputs = &proof.public_inputs;

    if inputs.chain_id != expected_chain_id {
        return Err(X402Error::ChainMismatch {
            expected: expected_chain_id,
            received: inputs.chain_id,
        });
    }

    if !inputs
        .contract_address
        .eq_ignore_ascii_case(expected_contract_address)
    {
        return Err(X402Error::ContractMismatch {
            expected: expected_contract_address.to_string(),
            received: inputs.contract_address.clone(),
        });
    }

    let timestamp = proof.proof.timestamp;
    let age = now.saturating_sub(timestamp);
    if age > window.max_age_secs {
        return Err(X402Error::ProofExpired { age_secs: age });
    }
    if timestamp > now.saturating_add(window.future_skew_secs) {
        return Err(X402Error::TimestampInFuture { timestamp });
    }

    let message = binding_message(
        &proof.commitment,
        &proof.nullifier,
        &proof.proof.amount_hash,
        &proof.proof.sender_hash,
        &proof.proof.receiver_hash,
        timestamp,
    );
    recover_signer(message.as_ref(), &proof.proof.signature).ok_or(X402Error::InvalidSignature)
}

// =============================================================================
// Exact scheme
// =============================================================================

/// `H(sender || amountBaseUnits || nonce || timestamp)`
pub fn exact_message(sender: &str, amount: u128, nonce: &str, timestamp: u64) -> Hash {
    hash_fields(
        domain::EXACT_PAYMENT,
        &[
            normalize(sender).as_bytes(),
            amount.to_string().as_bytes(),
            nonce.as_bytes(),
            timestamp.to_string().as_bytes(),
        ],
    )
}

/// Replay key for an `exact` payment: `H(nonce || sender || timestamp)`.
pub fn exact_nullifier(sender: &str, nonce: &str, timestamp: u64) -> Hash {
    hash_fields(
        domain::EXACT_NULLIFIER,
        &[
            nonce.as_bytes(),
            normalize(sender).as_bytes(),
            timestamp.to_string().as_bytes(),
        ],
    )
}

/// Sign an `exact` payment with the wallet oracle.
pub async fn sign_exact_payment(
    signer: &dyn WalletSigner,
    amount: u128,
    nonce: &str,
    timestamp: u64,
    signing_timeout: Duration,
) -> X402Result<String> {
    let sender = signer.address().to_string();
    let message = exact_message(&sender, amount, nonce, timestamp);
    sign_with_timeout(signer, message.as_ref(), signing_timeout).await
}

/// Whether `signature` was produced by `sender` over the payment terms.
pub fn verify_exact_signature(
    sender: &str,
    amount: u128,
    nonce: &str,
    timestamp: u64,
    signature: &str,
) -> bool {
    let message = exact_message(sender, amount, nonce, timestamp);
    recover_signer(message.as_ref(), signature)
        .map(|signer| addresses_equal(&signer.to_string(), sender))
        .unwrap_or(false)
}

/// Current Unix time in seconds.
pub fn now_secs() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

/// Current Unix time in milliseconds.
pub fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
