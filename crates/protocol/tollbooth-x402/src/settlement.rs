//! Settlement: finalizing verified payments.
//!
//! The chain is an opaque collaborator reached through [`TransferLedger`].
//! Payments for requirements without a contract, or gates without a transfer
//! ledger, settle off-chain with a receipt string.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{X402Error, X402Result};
use crate::types::PaymentScheme;

/// Value-transfer service signed by the server's administrative identity.
#[async_trait]
pub trait TransferLedger: Send + Sync {
    /// Transfer `amount` base units to `to`, returning the transaction hash.
    async fn transfer(&self, to: &str, amount: u128) -> X402Result<String>;
}

/// Run a transfer under `timeout`.
pub async fn transfer_with_timeout(
    ledger: &dyn TransferLedger,
    to: &str,
    amount: u128,
    timeout: Duration,
) -> X402Result<String> {
    match tokio::time::timeout(timeout, ledger.transfer(to, amount)).await {
        Ok(Ok(tx_hash)) => Ok(tx_hash),
        Ok(Err(X402Error::SettlementFailed { reason })) => {
            Err(X402Error::SettlementFailed { reason })
        }
        Ok(Err(e)) => Err(X402Error::SettlementFailed {
            reason: e.to_string(),
        }),
        Err(_) => Err(X402Error::SettlementFailed {
            reason: format!("transfer timed out after {:?}", timeout),
        }),
    }
}

/// `offchain:<nonce>:<timestampMillis>`
pub fn offchain_receipt(nonce: &str, timestamp_ms: u64) -> String {
    format!("offchain:{}:{}", nonce, timestamp_ms)
}

/// Settlement record kept for audit and reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRecord {
    /// Nullifier consumed by the payment.
    pub nullifier: String,

    /// Payer address.
    pub payer: String,

    /// Recipient address.
    pub pay_to: String,

    /// Amount paid, in base units.
    pub amount: u128,

    /// Resource that was paid for.
    pub resource: String,

    /// Scheme of the payment.
    pub scheme: PaymentScheme,

    /// Transaction hash of an on-chain settlement.
    pub tx_hash: Option<String>,

    /// Off-chain receipt.
    pub receipt: Option<String>,

    /// Whether settlement succeeded.
    pub settled: bool,

    /// When the record was written (Unix seconds).
    pub timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct CountingLedger {
        calls: AtomicU64,
    }

    #[async_trait]
    impl TransferLedger for CountingLedger {
        async fn transfer(&self, _to: &str, amount: u128) -> X402Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("0xtx{}-{}", n, amount))
        }
    }

    struct HangingLedger;

    #[async_trait]
    impl TransferLedger for HangingLedger {
        async fn transfer(&self, _to: &str, _amount: u128) -> X402Result<String> {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok("never".into())
        }
    }

    struct BrokenLedger;

    #[async_trait]
    impl TransferLedger for BrokenLedger {
        async fn transfer(&self, _to: &str, _amount: u128) -> X402Result<String> {
            Err(X402Error::Transport("rpc unreachable".into()))
        }
    }

    #[test]
    fn test_offchain_receipt_format() {
        assert_eq!(offchain_receipt("0xab", 1700000000123), "offchain:0xab:1700000000123");
    }

    #[tokio::test]
    async fn test_transfer_ok() {
        let ledger = CountingLedger {
            calls: AtomicU64::new(0),
        };
        let tx = transfer_with_timeout(&ledger, "0xagent", 7, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(tx, "0xtx0-7");
    }

    #[tokio::test(start_paused = true)]
    async fn test_transfer_timeout() {
        let result =
            transfer_with_timeout(&HangingLedger, "0xagent", 7, Duration::from_secs(30)).await;
        assert!(matches!(result, Err(X402Error::SettlementFailed { .. })));
    }

    #[tokio::test]
    async fn test_transfer_error_becomes_settlement_failure() {
        let result =
            transfer_with_timeout(&BrokenLedger, "0xagent", 7, Duration::from_secs(1)).await;
        match result {
            Err(X402Error::SettlementFailed { reason }) => assert!(reason.contains("rpc")),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
