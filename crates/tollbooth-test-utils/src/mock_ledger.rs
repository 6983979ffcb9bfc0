//! Mock implementation of the `TransferLedger` trait for testing.
//!
//! Records every transfer in memory and returns sequential fake transaction
//! hashes. Can be switched into a failing or slow mode at runtime.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tollbooth_x402::{TransferLedger, X402Error, X402Result};

struct MockTransferLedgerInner {
    /// Record of all successful transfers: (to, amount).
    transfers: Vec<(String, u128)>,
    /// When true, all transfers fail.
    should_fail: bool,
    /// Artificial latency per transfer.
    delay: Option<Duration>,
    /// Auto-incrementing transaction counter.
    tx_counter: u64,
}

/// A mock implementation of the `TransferLedger` trait for testing.
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct MockTransferLedger {
    inner: Arc<RwLock<MockTransferLedgerInner>>,
}

impl Default for MockTransferLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransferLedger {
    /// Create a ledger that accepts every transfer.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MockTransferLedgerInner {
                transfers: Vec::new(),
                should_fail: false,
                delay: None,
                tx_counter: 0,
            })),
        }
    }

    /// Configure the mock to fail all transfers.
    pub fn with_failure(self) -> Self {
        self.inner.write().unwrap().should_fail = true;
        self
    }

    /// Delay every transfer by `delay`.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.inner.write().unwrap().delay = Some(delay);
        self
    }

    /// Set the failure mode at runtime.
    pub fn set_should_fail(&self, should_fail: bool) {
        self.inner.write().unwrap().should_fail = should_fail;
    }

    /// All successful transfers, in order.
    pub fn transfers(&self) -> Vec<(String, u128)> {
        self.inner.read().unwrap().transfers.clone()
    }

    /// Number of successful transfers.
    pub fn transfer_count(&self) -> usize {
        self.inner.read().unwrap().transfers.len()
    }
}

#[async_trait]
impl TransferLedger for MockTransferLedger {
    async fn transfer(&self, to: &str, amount: u128) -> X402Result<String> {
        let delay = self.inner.read().unwrap().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.write().unwrap();
        if inner.should_fail {
            return Err(X402Error::SettlementFailed {
                reason: "mock transfer failure".to_string(),
            });
        }
        inner.tx_counter += 1;
        inner.transfers.push((to.to_string(), amount));
        Ok(format!("0x{:064x}", inner.tx_counter))
    }
}
