//! Cryptographic primitives for the tollbooth payment protocol.
//!
//! - **Hashing**: SHA-256 over length-prefixed fields with a per-role domain byte
//! - **Identity**: Ed25519 wallet keypairs and 20-byte addresses
//! - **Signatures**: signing, verification and signer recovery from envelopes
//! - **Amounts**: 18-decimal fixed-point parsing and formatting
//!
//! # Example
//!
//! ```
//! use tollbooth_crypto::{
//!     generate_identity, address_from_public_key, sign_message, recover_signer,
//!     hash_fields, domain, parse_amount,
//! };
//!
//! let (private_key, public_key) = generate_identity();
//! let address = address_from_public_key(&public_key);
//!
//! let amount = parse_amount("0.001").unwrap();
//! let digest = hash_fields(domain::AMOUNT, &[amount.to_string().as_bytes(), b"0x01"]);
//!
//! let envelope = sign_message(&private_key, digest.as_ref());
//! assert_eq!(recover_signer(digest.as_ref(), &envelope), Some(address));
//! ```

mod amount;
mod error;
mod hash;
mod identity;
mod signature;

pub use amount::{format_amount, parse_amount, DECIMALS, UNIT};
pub use error::CryptoError;
pub use hash::{domain, hash_fields};
pub use identity::{
    address_from_public_key, address_from_string, addresses_equal, generate_identity,
    public_key_from_private,
};
pub use signature::{recover_signer, sign, sign_message, verify, WalletSignature, ENVELOPE_LEN};

use ed25519_dalek::SigningKey;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A 32-byte SHA-256 hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    /// Parse a `0x`-prefixed (or bare) 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let body = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(body).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }
}

impl std::fmt::Debug for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash({})", hex_string(&self.0[..8]))
    }
}

/// Renders as `0x` + 64 lowercase hex characters.
impl std::fmt::Display for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// An Ed25519 private key (32 bytes).
///
/// Implements Zeroize + ZeroizeOnDrop to clear key material from memory.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey([u8; 32]);

impl PrivateKey {
    /// Create a PrivateKey from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse from a hex string (as stored in wallet key files).
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let body = s.trim();
        let body = body.strip_prefix("0x").unwrap_or(body);
        let mut bytes = hex::decode(body).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            let actual = bytes.len();
            bytes.zeroize();
            return Err(CryptoError::InvalidLength {
                expected: 32,
                actual,
            });
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self(key))
    }

    /// Get the raw bytes of the private key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub(crate) fn from_signing_key(key: &SigningKey) -> Self {
        Self(key.to_bytes())
    }

    pub(crate) fn to_signing_key(&self) -> SigningKey {
        SigningKey::from_bytes(&self.0)
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrivateKey([REDACTED])")
    }
}

/// An Ed25519 public key (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    /// Create a PublicKey from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes of the public key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", hex_string(&self.0[..8]))
    }
}

/// An Ed25519 signature (64 bytes).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({})", hex_string(&self.0[..8]))
    }
}

/// A wallet address (20 bytes).
///
/// The address is the first 20 bytes of `H(0x00 || public_key)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address(pub [u8; 20]);

/// The null identity. Never a valid signer.
pub const NULL_ADDRESS: Address = Address([0u8; 20]);

impl Address {
    /// Get the raw bytes of the address.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Whether this is the all-zero null identity.
    pub fn is_null(&self) -> bool {
        *self == NULL_ADDRESS
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl std::str::FromStr for Address {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        address_from_string(s)
    }
}

/// Generate a fresh 256-bit random nonce, `0x`-prefixed hex.
pub fn random_nonce() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    format!("0x{}", hex::encode(bytes))
}

/// Convert bytes to a truncated hex string (for Debug output).
fn hex_string(bytes: &[u8]) -> String {
    hex::encode(bytes) + "..."
}
