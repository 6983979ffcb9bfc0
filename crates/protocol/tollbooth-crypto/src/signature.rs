//! Signature creation, verification and signer recovery.
//!
//! Signatures are computed over the hash of the message:
//! ```text
//! signature = Ed25519_Sign(private_key, SHA256(message))
//! ```
//!
//! Ed25519 signatures do not carry a recovery id, so wallet signatures travel as
//! an envelope holding the signer's public key next to the signature:
//! ```text
//! envelope = "0x" || hex(public_key[32] || signature[64])
//! ```
//! Recovering the signer means checking the signature against the embedded key
//! and deriving the address from it.

use ed25519_dalek::{Signature as DalekSignature, Signer, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::error::CryptoError;
use crate::identity::{address_from_public_key, public_key_from_private};
use crate::{Address, PrivateKey, PublicKey, Signature};

/// Length of a decoded signature envelope in bytes.
pub const ENVELOPE_LEN: usize = 32 + 64;

fn digest(message: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(message);
    hasher.finalize().into()
}

/// Sign a message with a private key.
///
/// # Example
/// ```
/// use tollbooth_crypto::{generate_identity, sign, verify};
///
/// let (private_key, public_key) = generate_identity();
/// let message = b"Hello, world!";
/// let signature = sign(&private_key, message);
/// assert!(verify(&public_key, message, &signature));
/// ```
pub fn sign(private_key: &PrivateKey, message: &[u8]) -> Signature {
    let signing_key = private_key.to_signing_key();
    let sig: DalekSignature = signing_key.sign(&digest(message));
    Signature(sig.to_bytes())
}

/// Verify a signature against a public key and message.
///
/// Uses strict verification: small-order keys and non-canonical signature
/// points are rejected.
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(&public_key.0) else {
        return false;
    };

    let sig = DalekSignature::from_bytes(&signature.0);
    verifying_key.verify_strict(&digest(message), &sig).is_ok()
}

/// A signature bundled with the public key that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletSignature {
    /// Signer's public key
    pub public_key: PublicKey,
    /// Signature over the message digest
    pub signature: Signature,
}

impl WalletSignature {
    /// Sign a message and wrap the result in an envelope.
    pub fn create(private_key: &PrivateKey, message: &[u8]) -> Self {
        Self {
            public_key: public_key_from_private(private_key),
            signature: sign(private_key, message),
        }
    }

    /// Encode as `0x`-prefixed hex.
    pub fn encode(&self) -> String {
        let mut bytes = Vec::with_capacity(ENVELOPE_LEN);
        bytes.extend_from_slice(&self.public_key.0);
        bytes.extend_from_slice(&self.signature.0);
        format!("0x{}", hex::encode(bytes))
    }

    /// Decode from `0x`-prefixed (or bare) hex.
    pub fn decode(s: &str) -> Result<Self, CryptoError> {
        let body = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(body).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        if bytes.len() != ENVELOPE_LEN {
            return Err(CryptoError::InvalidLength {
                expected: ENVELOPE_LEN,
                actual: bytes.len(),
            });
        }

        let mut public_key = [0u8; 32];
        public_key.copy_from_slice(&bytes[..32]);
        let mut signature = [0u8; 64];
        signature.copy_from_slice(&bytes[32..]);

        Ok(Self {
            public_key: PublicKey(public_key),
            signature: Signature(signature),
        })
    }

    /// Verify against `message` and return the signer's address.
    pub fn recover(&self, message: &[u8]) -> Result<Address, CryptoError> {
        if verify(&self.public_key, message, &self.signature) {
            Ok(address_from_public_key(&self.public_key))
        } else {
            Err(CryptoError::SignatureVerificationFailed)
        }
    }
}

/// Sign `message` and return the encoded envelope.
pub fn sign_message(private_key: &PrivateKey, message: &[u8]) -> String {
    WalletSignature::create(private_key, message).encode()
}

/// Recover the signer address of an encoded envelope.
///
/// Returns `None` if the envelope is malformed, the signature does not match, or
/// the recovered address is the null identity.
///
/// # Example
/// ```
/// use tollbooth_crypto::{generate_identity, address_from_public_key, sign_message, recover_signer};
///
/// let (private_key, public_key) = generate_identity();
/// let envelope = sign_message(&private_key, b"pay 1");
/// assert_eq!(recover_signer(b"pay 1", &envelope), Some(address_from_public_key(&public_key)));
/// assert_eq!(recover_signer(b"pay 2", &envelope), None);
/// ```
pub fn recover_signer(message: &[u8], envelope: &str) -> Option<Address> {
    let sig = WalletSignature::decode(envelope).ok()?;
    let address = sig.recover(message).ok()?;
    (!address.is_null()).then_some(address)
}
