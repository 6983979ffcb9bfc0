//! Helper functions for creating test fixtures.
//!
//! Provides wallets, gate configurations and a fully wired
//! client → gate → handler stack running in-process.

use std::sync::Arc;
use std::time::Duration;

use tollbooth_crypto::random_nonce;
use tollbooth_x402::commitment::{now_secs, sign_exact_payment};
use tollbooth_x402::{
    with_payment, BusinessHandler, LocalWallet, PaidHandler, PaymentBody, PaymentClient,
    PaymentGate, PaymentPayload, PaymentScheme, RoutePolicy, WalletSigner, X402Config,
    DEFAULT_NETWORK,
};

use crate::in_process::InProcessTransport;

/// Recipient used by every test gate.
pub const TEST_PAY_TO: &str = "0xAGENT";

/// Base URL used for in-process requests.
pub const TEST_BASE_URL: &str = "http://tollbooth.test";

/// Price of the metered test routes.
pub const TEST_PRICE: &str = "0.001";

/// Create a fresh wallet.
pub fn test_wallet() -> Arc<LocalWallet> {
    Arc::new(LocalWallet::generate())
}

/// Enabled config metering `POST /api/agents/run` with `scheme` and
/// `GET /api/bounties/[id]/answers` with `exact`.
pub fn test_config(scheme: PaymentScheme) -> X402Config {
    X402Config::testnet(TEST_PAY_TO)
        .with_route(RoutePolicy::new(
            "POST",
            "/api/agents/run",
            TEST_PRICE,
            scheme,
            "Run an agent",
        ))
        .with_route(RoutePolicy::new(
            "GET",
            "/api/bounties/[id]/answers",
            TEST_PRICE,
            PaymentScheme::Exact,
            "Read bounty answers",
        ))
}

/// Gate built from [`test_config`].
pub fn test_gate(scheme: PaymentScheme) -> Arc<PaymentGate> {
    Arc::new(PaymentGate::new(test_config(scheme)).unwrap())
}

/// Full URL for `path` on the in-process server.
pub fn test_url(path: &str) -> String {
    format!("{}{}", TEST_BASE_URL, path)
}

/// Client type produced by [`paid_client`].
pub type TestClient<H> = PaymentClient<InProcessTransport<PaidHandler<H>>>;

/// Client paying with `wallet`, wired straight to `handler` behind `gate`.
pub fn paid_client<H: BusinessHandler>(
    gate: Arc<PaymentGate>,
    handler: H,
    wallet: Option<Arc<LocalWallet>>,
) -> TestClient<H> {
    let transport = InProcessTransport::new(with_payment(handler, gate));
    let client = PaymentClient::new(transport);
    match wallet {
        Some(wallet) => client.with_signer(wallet as Arc<dyn WalletSigner>),
        None => client,
    }
}

/// Signed `exact` payload for `amount`, created at `timestamp`.
pub async fn exact_payload(wallet: &LocalWallet, amount: &str, timestamp: u64) -> PaymentPayload {
    let nonce = random_nonce();
    let base_units = tollbooth_crypto::parse_amount(amount).unwrap();
    let signature = sign_exact_payment(wallet, base_units, &nonce, timestamp, Duration::from_secs(5))
        .await
        .unwrap();

    PaymentPayload {
        x402_version: 1,
        scheme: PaymentScheme::Exact,
        network: DEFAULT_NETWORK.to_string(),
        payload: PaymentBody {
            sender: wallet.address().to_string(),
            amount: amount.to_string(),
            nonce,
            timestamp,
            signature: Some(signature),
            zk_proof: None,
        },
    }
}

/// Signed `exact` payload created now.
pub async fn fresh_exact_payload(wallet: &LocalWallet, amount: &str) -> PaymentPayload {
    exact_payload(wallet, amount, now_secs()).await
}
