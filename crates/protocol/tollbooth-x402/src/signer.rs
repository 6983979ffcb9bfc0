//! Wallet signing oracle.
//!
//! Key custody sits outside the protocol: proof builders only see the
//! [`WalletSigner`] trait, which signs byte strings and reports its address.

use std::time::Duration;

use async_trait::async_trait;
use tollbooth_crypto::{
    address_from_public_key, generate_identity, public_key_from_private, sign_message, Address,
    PrivateKey,
};

use crate::error::{X402Error, X402Result};

/// Signs messages on behalf of a wallet.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Address of the signing wallet.
    fn address(&self) -> Address;

    /// Sign `message`, returning a signature envelope.
    async fn sign(&self, message: &[u8]) -> X402Result<String>;
}

/// Call the oracle under a timeout. Any failure becomes `SigningUnavailable`.
pub async fn sign_with_timeout(
    signer: &dyn WalletSigner,
    message: &[u8],
    timeout: Duration,
) -> X402Result<String> {
    match tokio::time::timeout(timeout, signer.sign(message)).await {
        Ok(Ok(signature)) => Ok(signature),
        Ok(Err(X402Error::SigningUnavailable { reason })) => {
            Err(X402Error::SigningUnavailable { reason })
        }
        Ok(Err(e)) => Err(X402Error::SigningUnavailable {
            reason: e.to_string(),
        }),
        Err(_) => Err(X402Error::SigningUnavailable {
            reason: format!("signer did not answer within {:?}", timeout),
        }),
    }
}

/// In-process wallet holding its own key.
pub struct LocalWallet {
    private_key: PrivateKey,
    address: Address,
}

impl LocalWallet {
    /// Wrap an existing key.
    pub fn new(private_key: PrivateKey) -> Self {
        let address = address_from_public_key(&public_key_from_private(&private_key));
        Self {
            private_key,
            address,
        }
    }

    /// Create a wallet with a fresh random key.
    pub fn generate() -> Self {
        let (private_key, _) = generate_identity();
        Self::new(private_key)
    }

    /// Load from a hex-encoded secret key.
    pub fn from_hex(secret: &str) -> X402Result<Self> {
        let key = PrivateKey::from_hex(secret)
            .map_err(|e| X402Error::SigningUnavailable {
                reason: format!("invalid wallet key: {}", e),
            })?;
        Ok(Self::new(key))
    }

    /// The wallet's private key.
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }
}

impl std::fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWallet")
            .field("address", &self.address)
            .finish()
    }
}

#[async_trait]
impl WalletSigner for LocalWallet {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign(&self, message: &[u8]) -> X402Result<String> {
        Ok(sign_message(&self.private_key, message))
    }
}
