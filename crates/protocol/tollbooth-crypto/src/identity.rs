//! Wallet identities.
//!
//! A wallet is an Ed25519 keypair. Its public address is derived from the
//! public key:
//! ```text
//! Address = H(0x00 || public_key)[0:20]
//! ```
//!
//! Human-readable format: `0x` + 40 lowercase hex characters.

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::error::CryptoError;
use crate::hash::domain;
use crate::{Address, PrivateKey, PublicKey};

/// Generate a new Ed25519 wallet keypair.
///
/// Uses the operating system's cryptographically secure random number generator.
///
/// # Example
/// ```
/// use tollbooth_crypto::generate_identity;
///
/// let (private_key, public_key) = generate_identity();
/// ```
pub fn generate_identity() -> (PrivateKey, PublicKey) {
    let mut csprng = OsRng;
    let signing_key = SigningKey::generate(&mut csprng);
    let verifying_key = signing_key.verifying_key();

    let private_key = PrivateKey::from_signing_key(&signing_key);
    let public_key = PublicKey(verifying_key.to_bytes());

    (private_key, public_key)
}

/// Derive the public key belonging to a private key.
pub fn public_key_from_private(private_key: &PrivateKey) -> PublicKey {
    PublicKey(private_key.to_signing_key().verifying_key().to_bytes())
}

/// Derive an address from a public key.
///
/// # Example
/// ```
/// use tollbooth_crypto::{generate_identity, address_from_public_key};
///
/// let (_, public_key) = generate_identity();
/// let address = address_from_public_key(&public_key);
/// assert!(address.to_string().starts_with("0x"));
/// ```
pub fn address_from_public_key(public_key: &PublicKey) -> Address {
    let mut hasher = Sha256::new();
    hasher.update([domain::KEY]);
    hasher.update(public_key.0);
    let hash: [u8; 32] = hasher.finalize().into();

    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[..20]);
    Address(address)
}

/// Parse a `0x`-prefixed address string. Hex digits may be in either case.
///
/// # Errors
/// - `InvalidAddress` if the prefix is missing
/// - `InvalidHex` if the body is not valid hex
/// - `InvalidLength` if the decoded data isn't 20 bytes
pub fn address_from_string(s: &str) -> Result<Address, CryptoError> {
    let body = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| CryptoError::InvalidAddress(s.to_string()))?;

    let decoded = hex::decode(body).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
    if decoded.len() != 20 {
        return Err(CryptoError::InvalidLength {
            expected: 20,
            actual: decoded.len(),
        });
    }

    let mut address = [0u8; 20];
    address.copy_from_slice(&decoded);
    Ok(Address(address))
}

/// Case-insensitive comparison of two address strings.
///
/// Addresses that fail to parse are compared as plain strings, ignoring ASCII case.
pub fn addresses_equal(a: &str, b: &str) -> bool {
    match (address_from_string(a), address_from_string(b)) {
        (Ok(x), Ok(y)) => x == y,
        _ => a.eq_ignore_ascii_case(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_identity() {
        let (_private_key, public_key) = generate_identity();
        assert_eq!(public_key.0.len(), 32);
    }

    #[test]
    fn test_address_deterministic() {
        let (_, public_key) = generate_identity();
        assert_eq!(
            address_from_public_key(&public_key),
            address_from_public_key(&public_key)
        );
    }

    #[test]
    fn test_public_key_from_private() {
        let (private_key, public_key) = generate_identity();
        assert_eq!(public_key_from_private(&private_key), public_key);
    }

    #[test]
    fn test_address_roundtrip() {
        let (_, public_key) = generate_identity();
        let address = address_from_public_key(&public_key);
        let parsed = address_from_string(&address.to_string()).unwrap();
        assert_eq!(address, parsed);
    }

    #[test]
    fn test_address_case_insensitive() {
        let (_, public_key) = generate_identity();
        let lower = address_from_public_key(&public_key).to_string();
        let upper = format!("0x{}", lower[2..].to_uppercase());
        assert!(addresses_equal(&lower, &upper));
        assert_eq!(
            address_from_string(&upper).unwrap(),
            address_from_string(&lower).unwrap()
        );
    }

    #[test]
    fn test_invalid_addresses() {
        assert!(matches!(
            address_from_string("abcdef"),
            Err(CryptoError::InvalidAddress(_))
        ));
        assert!(matches!(
            address_from_string("0xzz"),
            Err(CryptoError::InvalidHex(_))
        ));
        assert!(matches!(
            address_from_string("0xabcd"),
            Err(CryptoError::InvalidLength { expected: 20, actual: 2 })
        ));
    }

    #[test]
    fn test_unparseable_addresses_compare_as_strings() {
        assert!(addresses_equal("0xAGENT", "0xagent"));
        assert!(!addresses_equal("0xAGENT", "0xother"));
    }
}
