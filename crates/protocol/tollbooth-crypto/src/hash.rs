//! Domain-separated field hashing.
//!
//! Every hash used by the payment protocol is computed as:
//! ```text
//! H(domain || len(f1) as u64be || f1 || len(f2) as u64be || f2 || ...)
//! ```
//!
//! The length prefix keeps field boundaries unambiguous, so `("ab", "c")` and
//! `("a", "bc")` never hash to the same value.

use sha2::{Digest, Sha256};

use crate::Hash;

/// Domain separators. Each hash role in the protocol has its own byte.
pub mod domain {
    /// Wallet public key -> address (also used by `identity`).
    pub const KEY: u8 = 0x00;
    /// `H(amount || nonce || sender || receiver || bountyId?)`
    pub const COMMITMENT: u8 = 0x10;
    /// `H(nonce || sender || creationTimeMillis)`
    pub const NULLIFIER: u8 = 0x11;
    /// `H(amount || nonce)`
    pub const AMOUNT: u8 = 0x12;
    /// `H(sender || nonce)`
    pub const SENDER: u8 = 0x13;
    /// `H(receiver || nonce)`
    pub const RECEIVER: u8 = 0x14;
    /// Binding message signed by the prover.
    pub const PROOF_BINDING: u8 = 0x15;
    /// Message signed for the plain `exact` scheme.
    pub const EXACT_PAYMENT: u8 = 0x16;
    /// Replay key for `exact` payments.
    pub const EXACT_NULLIFIER: u8 = 0x17;
}

/// Hash a list of fields under the given domain separator.
///
/// # Example
/// ```
/// use tollbooth_crypto::{hash_fields, domain};
///
/// let a = hash_fields(domain::AMOUNT, &[b"1000", b"0xabc"]);
/// let b = hash_fields(domain::AMOUNT, &[b"100", b"00xabc"]);
/// assert_ne!(a, b);
/// ```
pub fn hash_fields(domain: u8, fields: &[&[u8]]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([domain]);

    for field in fields {
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field);
    }

    let result: [u8; 32] = hasher.finalize().into();
    Hash(result)
}
