//! Payment gate for x402-protected routes.
//!
//! The `PaymentGate` drives the per-request negotiation:
//! 1. Match the route against the policy table
//! 2. Issue a 402 with payment requirements when no payment is attached
//! 3. Decode and verify the attached payment, consuming its nullifier
//! 4. Run the business handler
//! 5. Settle on success and attach the receipt
//!
//! ```text
//! Unpaid ──► RequirementsIssued ──► PayloadReceived ──► Verified ──► Settled
//!                                          │
//!                                          └──────────► Rejected (fresh 402)
//! ```
//!
//! The nullifier is consumed during verification, before the handler runs, and
//! is never released: a payment buys one attempt whatever the handler returns.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tollbooth_crypto::{addresses_equal, format_amount, parse_amount};
use tracing::{debug, info, warn};

use crate::commitment::{
    amount_hash, commitment_hash, exact_nullifier, now_millis, now_secs, receiver_hash,
    sender_hash, verify_exact_signature, verify_proof_at, ProofWindow,
};
use crate::error::{X402Error, X402Result};
use crate::nullifier::{InMemoryNullifierLedger, NullifierLedger};
use crate::routes::RouteTable;
use crate::settlement::{offchain_receipt, transfer_with_timeout, SettlementRecord, TransferLedger};
use crate::types::{
    encode_header, PaymentPayload, PaymentRequired, PaymentRequirements, PaymentScheme,
    SettlementResponse, X402Config, HEADER_PAYMENT_REQUIRED, HEADER_PAYMENT_RESPONSE,
    HEADER_PAYMENT_SIGNATURE, HEADER_X_PAYMENT, X402_VERSION,
};

/// Request type seen by gated handlers.
pub type HttpRequest = http::Request<Vec<u8>>;

/// Response type produced by gated handlers.
pub type HttpResponse = http::Response<Vec<u8>>;

/// The business logic a gate protects.
#[async_trait]
pub trait BusinessHandler: Send + Sync {
    /// Execute the request.
    async fn call(&self, request: HttpRequest) -> HttpResponse;
}

#[async_trait]
impl<H: BusinessHandler + ?Sized> BusinessHandler for Arc<H> {
    async fn call(&self, request: HttpRequest) -> HttpResponse {
        (**self).call(request).await
    }
}

/// Handler backed by an async closure. See [`handler_fn`].
pub struct HandlerFn<F>(F);

/// Wrap an async closure as a [`BusinessHandler`].
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(HttpRequest) -> Fut + Send + Sync,
    Fut: Future<Output = HttpResponse> + Send,
{
    HandlerFn(f)
}

#[async_trait]
impl<F, Fut> BusinessHandler for HandlerFn<F>
where
    F: Fn(HttpRequest) -> Fut + Send + Sync,
    Fut: Future<Output = HttpResponse> + Send,
{
    async fn call(&self, request: HttpRequest) -> HttpResponse {
        (self.0)(request).await
    }
}

/// A payment that passed verification and whose nullifier is consumed.
#[derive(Debug, Clone)]
pub struct VerifiedPayment {
    /// Requirement the payment satisfied.
    pub requirement: PaymentRequirements,
    /// The decoded payload.
    pub payload: PaymentPayload,
    /// Amount paid, in base units.
    pub amount: u128,
    /// Consumed nullifier.
    pub nullifier: String,
}

/// Payment gate that manages the x402 flow for a set of routes.
pub struct PaymentGate {
    /// x402 configuration.
    config: X402Config,

    /// Compiled route policies.
    routes: RouteTable,

    /// Consumed nullifiers.
    ledger: Arc<dyn NullifierLedger>,

    /// On-chain settlement, when an administrative identity is configured.
    transfer_ledger: Option<Arc<dyn TransferLedger>>,

    /// Settlement history for reporting.
    records: Arc<RwLock<Vec<SettlementRecord>>>,
}

impl PaymentGate {
    /// Create a gate from configuration, with an in-memory nullifier ledger.
    pub fn new(config: X402Config) -> X402Result<Self> {
        config.validate()?;
        let routes = RouteTable::new(config.routes.clone())?;

        Ok(Self {
            config,
            routes,
            ledger: Arc::new(InMemoryNullifierLedger::new()),
            transfer_ledger: None,
            records: Arc::new(RwLock::new(Vec::new())),
        })
    }

    /// Create a disabled gate that passes every request through.
    pub fn disabled() -> Self {
        Self {
            config: X402Config::default(),
            routes: RouteTable::default(),
            ledger: Arc::new(InMemoryNullifierLedger::new()),
            transfer_ledger: None,
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Use `ledger` for nullifier tracking.
    pub fn with_ledger(mut self, ledger: Arc<dyn NullifierLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    /// Settle on-chain through `ledger` when a requirement carries a contract.
    pub fn with_transfer_ledger(mut self, ledger: Arc<dyn TransferLedger>) -> Self {
        self.transfer_ledger = Some(ledger);
        self
    }

    /// Check if x402 is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Get the current configuration.
    pub fn config(&self) -> &X402Config {
        &self.config
    }

    /// The compiled route table.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// The nullifier ledger.
    pub fn ledger(&self) -> &Arc<dyn NullifierLedger> {
        &self.ledger
    }

    /// Build the requirement for a request, or `None` if it is unmetered.
    pub fn requirements_for(&self, method: &str, path: &str) -> Option<PaymentRequirements> {
        if !self.config.enabled {
            return None;
        }
        let policy = self.routes.matches(method, path)?;

        Some(PaymentRequirements {
            scheme: policy.scheme,
            network: self.config.network.clone(),
            max_amount_required: policy.price.clone(),
            pay_to: self.config.pay_to.clone(),
            resource: format!("{}{}", self.config.resource_base, path),
            description: policy.description.clone(),
            mime_type: self.config.mime_type.clone(),
            contract_address: self.config.contract_address.clone(),
            bounty_id: self.config.bounty_id.clone(),
        })
    }

    /// Build a 402 response offering `requirement`.
    ///
    /// The body is the JSON [`PaymentRequired`]; the `PAYMENT-REQUIRED` header
    /// carries the same `accepts` list, base64-encoded.
    pub fn payment_required_response(
        &self,
        error: &str,
        requirement: &PaymentRequirements,
    ) -> HttpResponse {
        let body = PaymentRequired::new(error, vec![requirement.clone()]);
        build_payment_required(&body).unwrap_or_else(|e| error_response(&e))
    }

    /// Payment header value, `PAYMENT-SIGNATURE` first, then `X-PAYMENT`.
    pub fn extract_payment_header(headers: &HeaderMap) -> Option<&str> {
        [HEADER_PAYMENT_SIGNATURE, HEADER_X_PAYMENT]
            .into_iter()
            .filter_map(|name| headers.get(name))
            .find_map(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Decode and verify a payment header against `requirement`.
    ///
    /// On success the payment's nullifier has been consumed.
    pub fn verify_payment(
        &self,
        header_value: &str,
        requirement: &PaymentRequirements,
    ) -> X402Result<VerifiedPayment> {
        self.verify_payment_at(header_value, requirement, now_secs())
    }

    /// [`verify_payment`](Self::verify_payment) at a fixed time (Unix seconds).
    pub fn verify_payment_at(
        &self,
        header_value: &str,
        requirement: &PaymentRequirements,
        now: u64,
    ) -> X402Result<VerifiedPayment> {
        let payload = PaymentPayload::from_header(header_value)?;
        self.validate_payload(payload, requirement, now)
    }

    /// Validate a decoded payload.
    ///
    /// Checks run in order: version, scheme, network, amount, payment window,
    /// then scheme-specific verification and the nullifier.
    fn validate_payload(
        &self,
        payload: PaymentPayload,
        requirement: &PaymentRequirements,
        now: u64,
    ) -> X402Result<VerifiedPayment> {
        if payload.x402_version != X402_VERSION {
            return Err(X402Error::UnsupportedVersion {
                version: payload.x402_version,
            });
        }

        if payload.scheme != requirement.scheme {
            return Err(X402Error::SchemeMismatch {
                expected: requirement.scheme.to_string(),
                received: payload.scheme.to_string(),
            });
        }

        if payload.network != requirement.network {
            return Err(X402Error::NetworkMismatch {
                expected: requirement.network.clone(),
                received: payload.network.clone(),
            });
        }

        let body = &payload.payload;
        let required = requirement.max_amount_base_units()?;
        let amount = parse_amount(&body.amount)?;
        if amount < required {
            return Err(X402Error::InsufficientAmount {
                required: requirement.max_amount_required.clone(),
                received: body.amount.clone(),
            });
        }

        let age = now.saturating_sub(body.timestamp);
        if age > self.config.payment_window_secs {
            return Err(X402Error::PaymentExpired { age_secs: age });
        }

        let nullifier = match payload.scheme {
            PaymentScheme::Exact => {
                let signature = body
                    .signature
                    .as_deref()
                    .ok_or_else(|| X402Error::malformed("exact payment without signature"))?;
                if !verify_exact_signature(
                    &body.sender,
                    amount,
                    &body.nonce,
                    body.timestamp,
                    signature,
                ) {
                    return Err(X402Error::InvalidSignature);
                }
                exact_nullifier(&body.sender, &body.nonce, body.timestamp).to_string()
            }
            PaymentScheme::ZkExact => {
                let proof = body
                    .zk_proof
                    .as_ref()
                    .ok_or_else(|| X402Error::malformed("zk-exact payment without zkProof"))?;

                let window = ProofWindow {
                    max_age_secs: self.config.proof_max_age_secs,
                    future_skew_secs: self.config.proof_future_skew_secs,
                };
                let contract = requirement.contract_address.as_deref().unwrap_or_default();
                let signer =
                    verify_proof_at(proof, self.config.chain_id, contract, window, now)?;
                if !addresses_equal(&signer.to_string(), &body.sender) {
                    return Err(X402Error::InvalidSignature);
                }

                // The proof must open to the payload's amount, sender and this server's terms.
                let expected_amount = amount_hash(amount, &body.nonce).to_string();
                if !proof.proof.amount_hash.eq_ignore_ascii_case(&expected_amount) {
                    return Err(X402Error::malformed("proof does not commit to payload amount"));
                }
                let expected_receiver = receiver_hash(&requirement.pay_to, &body.nonce).to_string();
                if !proof.proof.receiver_hash.eq_ignore_ascii_case(&expected_receiver) {
                    return Err(X402Error::malformed("proof is not payable to this server"));
                }
                let expected_sender = sender_hash(&body.sender, &body.nonce).to_string();
                if !proof.proof.sender_hash.eq_ignore_ascii_case(&expected_sender) {
                    return Err(X402Error::malformed("proof does not commit to payload sender"));
                }
                let expected_commitment = commitment_hash(
                    amount,
                    &body.nonce,
                    &body.sender,
                    &requirement.pay_to,
                    requirement.bounty_id.as_deref(),
                )
                .to_string();
                if !proof.commitment.eq_ignore_ascii_case(&expected_commitment) {
                    return Err(X402Error::malformed(
                        "commitment does not match the requirement terms",
                    ));
                }

                proof.nullifier.clone()
            }
        };

        if self.ledger.is_used(&nullifier)? || !self.ledger.try_consume(&nullifier)? {
            return Err(X402Error::NullifierSpent { nullifier });
        }

        debug!(
            scheme = %payload.scheme,
            sender = %body.sender,
            nullifier = %nullifier,
            "Payment verified"
        );

        Ok(VerifiedPayment {
            requirement: requirement.clone(),
            payload,
            amount,
            nullifier,
        })
    }

    /// Finalize a verified payment and record it.
    ///
    /// Transfer failures are reported in the returned response, never as errors:
    /// by the time settlement runs the business response already exists.
    pub async fn settle(&self, verified: &VerifiedPayment) -> SettlementResponse {
        let requirement = &verified.requirement;
        let body = &verified.payload.payload;

        if verified.payload.scheme == PaymentScheme::ZkExact {
            // Already consumed during verification; this is a confirmation.
            if let Err(e) = self.ledger.mark_used(&verified.nullifier) {
                warn!(nullifier = %verified.nullifier, error = %e, "Failed to confirm nullifier");
            }
        }

        let on_chain = requirement
            .contract_address
            .as_ref()
            .and(self.transfer_ledger.as_ref());

        let response = match on_chain {
            Some(ledger) => {
                let timeout = Duration::from_secs(self.config.settlement_timeout_secs);
                match transfer_with_timeout(
                    &**ledger,
                    &requirement.pay_to,
                    verified.amount,
                    timeout,
                )
                .await
                {
                    Ok(tx_hash) => SettlementResponse {
                        success: true,
                        tx_hash: Some(tx_hash),
                        receipt: None,
                        network: Some(requirement.network.clone()),
                        error: None,
                    },
                    Err(e) => {
                        warn!(
                            nullifier = %verified.nullifier,
                            error = %e,
                            "Settlement failed; payment accepted but unsettled"
                        );
                        SettlementResponse {
                            success: false,
                            tx_hash: None,
                            receipt: None,
                            network: Some(requirement.network.clone()),
                            error: Some(e.to_string()),
                        }
                    }
                }
            }
            None => SettlementResponse {
                success: true,
                tx_hash: None,
                receipt: Some(offchain_receipt(&body.nonce, now_millis())),
                network: Some(requirement.network.clone()),
                error: None,
            },
        };

        let record = SettlementRecord {
            nullifier: verified.nullifier.clone(),
            payer: body.sender.clone(),
            pay_to: requirement.pay_to.clone(),
            amount: verified.amount,
            resource: requirement.resource.clone(),
            scheme: verified.payload.scheme,
            tx_hash: response.tx_hash.clone(),
            receipt: response.receipt.clone(),
            settled: response.success,
            timestamp: now_secs(),
        };
        self.records.write().await.push(record);

        if response.success {
            info!(
                resource = %requirement.resource,
                amount = %format_amount(verified.amount),
                tx_hash = ?response.tx_hash,
                receipt = ?response.receipt,
                "x402 payment settled"
            );
        }

        response
    }

    /// Run the full negotiation for one request.
    pub async fn handle(&self, request: HttpRequest, handler: &dyn BusinessHandler) -> HttpResponse {
        let method = request.method().as_str().to_string();
        let path = request.uri().path().to_string();

        let Some(requirement) = self.requirements_for(&method, &path) else {
            return handler.call(request).await;
        };

        let Some(header_value) = Self::extract_payment_header(request.headers()) else {
            debug!(%method, %path, "No payment attached; issuing requirements");
            return self.payment_required_response("Payment required", &requirement);
        };

        let verified = match self.verify_payment(header_value, &requirement) {
            Ok(verified) => verified,
            Err(e) => {
                warn!(%method, %path, error = %e, "Payment rejected");
                return if e.http_status() == 402 {
                    self.payment_required_response(&e.to_string(), &requirement)
                } else {
                    error_response(&e)
                };
            }
        };

        let mut response = handler.call(request).await;
        if response.status().as_u16() >= 400 {
            debug!(
                %path,
                status = response.status().as_u16(),
                nullifier = %verified.nullifier,
                "Handler failed; payment consumed without settlement"
            );
            return response;
        }

        let settlement = self.settle(&verified).await;
        match settlement_header(&settlement) {
            Ok((name, value)) => {
                response.headers_mut().insert(name, value);
            }
            Err(e) => warn!(error = %e, "Failed to encode settlement header"),
        }
        response
    }

    /// Get settlement history.
    pub async fn records(&self) -> Vec<SettlementRecord> {
        self.records.read().await.clone()
    }

    /// Get x402 status summary.
    pub async fn status(&self) -> X402Result<GateStatus> {
        let records = self.records.read().await;
        let settled: Vec<_> = records.iter().filter(|r| r.settled).collect();
        let volume: u128 = settled.iter().map(|r| r.amount).sum();

        Ok(GateStatus {
            enabled: self.config.enabled,
            network: self.config.network.clone(),
            pay_to: self.config.pay_to.clone(),
            routes: self.routes.len(),
            nullifiers_consumed: self.ledger.len()?,
            total_settlements: settled.len(),
            failed_settlements: records.len() - settled.len(),
            settled_volume: format_amount(volume),
        })
    }
}

/// Gate status summary for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateStatus {
    pub enabled: bool,
    pub network: String,
    pub pay_to: String,
    pub routes: usize,
    pub nullifiers_consumed: usize,
    pub total_settlements: usize,
    pub failed_settlements: usize,
    pub settled_volume: String,
}

/// A business handler wrapped with the negotiation state machine.
pub struct PaidHandler<H> {
    inner: H,
    gate: Arc<PaymentGate>,
}

impl<H> PaidHandler<H> {
    /// The gate guarding this handler.
    pub fn gate(&self) -> &Arc<PaymentGate> {
        &self.gate
    }
}

#[async_trait]
impl<H: BusinessHandler> BusinessHandler for PaidHandler<H> {
    async fn call(&self, request: HttpRequest) -> HttpResponse {
        self.gate.handle(request, &self.inner).await
    }
}

/// Wrap `handler` so routes metered by `gate` require payment.
pub fn with_payment<H: BusinessHandler>(handler: H, gate: Arc<PaymentGate>) -> PaidHandler<H> {
    PaidHandler {
        inner: handler,
        gate,
    }
}

fn header_name(name: &str) -> X402Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| X402Error::Internal(format!("invalid header name {}: {}", name, e)))
}

fn header_value(value: String) -> X402Result<HeaderValue> {
    HeaderValue::try_from(value)
        .map_err(|e| X402Error::Internal(format!("invalid header value: {}", e)))
}

fn build_payment_required(body: &PaymentRequired) -> X402Result<HttpResponse> {
    let json = serde_json::to_vec(body)
        .map_err(|e| X402Error::Internal(format!("JSON encode error: {}", e)))?;
    let encoded = encode_header(&body.accepts)?;

    http::Response::builder()
        .status(StatusCode::PAYMENT_REQUIRED)
        .header(CONTENT_TYPE, "application/json")
        .header(header_name(HEADER_PAYMENT_REQUIRED)?, header_value(encoded)?)
        .body(json)
        .map_err(|e| X402Error::Internal(e.to_string()))
}

fn settlement_header(settlement: &SettlementResponse) -> X402Result<(HeaderName, HeaderValue)> {
    Ok((
        header_name(HEADER_PAYMENT_RESPONSE)?,
        header_value(settlement.to_header()?)?,
    ))
}

fn error_response(error: &X402Error) -> HttpResponse {
    let status =
        StatusCode::from_u16(error.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = serde_json::json!({ "error": error.to_string() }).to_string();

    let mut response = http::Response::new(body.into_bytes());
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::{generate_proof, sign_exact_payment, ProofParams};
    use crate::routes::RoutePolicy;
    use crate::signer::{LocalWallet, WalletSigner};
    use crate::types::{decode_header, PaymentBody, DEFAULT_NETWORK};
    use tollbooth_crypto::{random_nonce, UNIT};

    const PAY_TO: &str = "0xAGENT";

    fn gate() -> PaymentGate {
        let config = X402Config::testnet(PAY_TO)
            .with_route(RoutePolicy::new(
                "POST",
                "/api/agents/run",
                "0.001",
                PaymentScheme::Exact,
                "Agent run",
            ))
            .with_route(RoutePolicy::new(
                "GET",
                "/api/bounties/[id]/oracle",
                "0.001",
                PaymentScheme::ZkExact,
                "Oracle",
            ));
        PaymentGate::new(config).unwrap()
    }

    fn ok_handler() -> HandlerFn<impl Fn(HttpRequest) -> std::future::Ready<HttpResponse>> {
        handler_fn(|_req: HttpRequest| std::future::ready(http::Response::new(b"ok".to_vec())))
    }

    fn request(method: &str, path: &str, payment: Option<&str>) -> HttpRequest {
        let mut builder = http::Request::builder().method(method).uri(path);
        if let Some(value) = payment {
            builder = builder.header(HEADER_PAYMENT_SIGNATURE, value);
        }
        builder.body(Vec::new()).unwrap()
    }

    async fn exact_payload(wallet: &LocalWallet, amount: &str, timestamp: u64) -> PaymentPayload {
        let nonce = random_nonce();
        let base_units = parse_amount(amount).unwrap();
        let signature = sign_exact_payment(
            wallet,
            base_units,
            &nonce,
            timestamp,
            Duration::from_secs(5),
        )
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

    async fn zk_payload(wallet: &LocalWallet, pay_to: &str) -> PaymentPayload {
        zk_payload_for_bounty(wallet, pay_to, None).await
    }

    async fn zk_payload_for_bounty(
        wallet: &LocalWallet,
        pay_to: &str,
        bounty_id: Option<&str>,
    ) -> PaymentPayload {
        let params = ProofParams {
            amount: UNIT / 1000,
            sender: wallet.address().to_string(),
            receiver: pay_to.to_string(),
            chain_id: 84532,
            contract_address: String::new(),
            bounty_id: bounty_id.map(str::to_string),
        };
        let generated = generate_proof(&params, wallet, Duration::from_secs(5))
            .await
            .unwrap();

        PaymentPayload {
            x402_version: 1,
            scheme: PaymentScheme::ZkExact,
            network: DEFAULT_NETWORK.to_string(),
            payload: PaymentBody {
                sender: wallet.address().to_string(),
                amount: "0.001".to_string(),
                nonce: generated.nonce,
                timestamp: generated.proof.proof.timestamp,
                signature: None,
                zk_proof: Some(generated.proof),
            },
        }
    }

    fn exact_requirement(gate: &PaymentGate) -> PaymentRequirements {
        gate.requirements_for("POST", "/api/agents/run").unwrap()
    }

    #[test]
    fn test_payment_gate_disabled() {
        let gate = PaymentGate::disabled();
        assert!(!gate.is_enabled());
        assert!(gate.requirements_for("POST", "/api/agents/run").is_none());
    }

    #[test]
    fn test_requirements_for_route() {
        let gate = gate();
        let req = gate.requirements_for("GET", "/api/bounties/9/oracle").unwrap();
        assert_eq!(req.scheme, PaymentScheme::ZkExact);
        assert_eq!(req.max_amount_required, "0.001");
        assert_eq!(req.pay_to, PAY_TO);
        assert_eq!(req.resource, "/api/bounties/9/oracle");
        assert!(gate.requirements_for("GET", "/api/health").is_none());
    }

    #[test]
    fn test_extract_header_prefers_payment_signature() {
        let mut headers = HeaderMap::new();
        headers.insert("x-payment", HeaderValue::from_static("legacy"));
        assert_eq!(PaymentGate::extract_payment_header(&headers), Some("legacy"));

        headers.insert("payment-signature", HeaderValue::from_static(" current "));
        assert_eq!(PaymentGate::extract_payment_header(&headers), Some("current"));

        assert_eq!(PaymentGate::extract_payment_header(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_unmetered_route_passes_through() {
        let gate = gate();
        let response = gate.handle(request("GET", "/api/health", None), &ok_handler()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), b"ok");
    }

    #[tokio::test]
    async fn test_missing_payment_issues_402() {
        let gate = gate();
        let response = gate
            .handle(request("POST", "/api/agents/run", None), &ok_handler())
            .await;

        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");

        let body: PaymentRequired = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body.x402_version, 1);
        assert_eq!(body.accepts.len(), 1);
        assert_eq!(body.accepts[0].max_amount_required, "0.001");

        let header = response.headers()[HEADER_PAYMENT_REQUIRED].to_str().unwrap();
        let accepts: Vec<PaymentRequirements> = decode_header(header).unwrap();
        assert_eq!(accepts, body.accepts);
    }

    #[tokio::test]
    async fn test_malformed_header_is_402_not_500() {
        let gate = gate();
        let response = gate
            .handle(request("POST", "/api/agents/run", Some("!!!")), &ok_handler())
            .await;
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
        let body: PaymentRequired = serde_json::from_slice(response.body()).unwrap();
        assert!(body.error.contains("malformed"));
    }

    #[tokio::test]
    async fn test_validate_exact_payload() {
        let gate = gate();
        let wallet = LocalWallet::generate();
        let now = now_secs();
        let payload = exact_payload(&wallet, "0.001", now).await;

        let verified = gate
            .validate_payload(payload, &exact_requirement(&gate), now)
            .unwrap();
        assert_eq!(verified.amount, UNIT / 1000);
        assert!(gate.ledger().is_used(&verified.nullifier).unwrap());
    }

    #[tokio::test]
    async fn test_validate_payload_unsupported_version() {
        let gate = gate();
        let wallet = LocalWallet::generate();
        let now = now_secs();
        let mut payload = exact_payload(&wallet, "0.001", now).await;
        payload.x402_version = 2;

        assert!(matches!(
            gate.validate_payload(payload, &exact_requirement(&gate), now),
            Err(X402Error::UnsupportedVersion { version: 2 })
        ));
    }

    #[tokio::test]
    async fn test_validate_payload_scheme_mismatch() {
        let gate = gate();
        let wallet = LocalWallet::generate();
        let now = now_secs();
        let payload = exact_payload(&wallet, "0.001", now).await;
        let zk_requirement = gate.requirements_for("GET", "/api/bounties/1/oracle").unwrap();

        assert!(matches!(
            gate.validate_payload(payload, &zk_requirement, now),
            Err(X402Error::SchemeMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_validate_payload_wrong_network() {
        let gate = gate();
        let wallet = LocalWallet::generate();
        let now = now_secs();
        let mut payload = exact_payload(&wallet, "0.001", now).await;
        payload.network = "eip155:8453".to_string();

        assert!(matches!(
            gate.validate_payload(payload, &exact_requirement(&gate), now),
            Err(X402Error::NetworkMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_validate_payload_insufficient_amount() {
        let gate = gate();
        let wallet = LocalWallet::generate();
        let now = now_secs();
        let payload = exact_payload(&wallet, "0.000999999999999999", now).await;

        assert!(matches!(
            gate.validate_payload(payload, &exact_requirement(&gate), now),
            Err(X402Error::InsufficientAmount { .. })
        ));
    }

    #[tokio::test]
    async fn test_validate_payload_expired() {
        let gate = gate();
        let wallet = LocalWallet::generate();
        let now = now_secs();
        let payload = exact_payload(&wallet, "0.001", now - 301).await;

        assert!(matches!(
            gate.validate_payload(payload, &exact_requirement(&gate), now),
            Err(X402Error::PaymentExpired { age_secs: 301 })
        ));
    }

    #[tokio::test]
    async fn test_validate_payload_forged_sender() {
        let gate = gate();
        let wallet = LocalWallet::generate();
        let now = now_secs();
        let mut payload = exact_payload(&wallet, "0.001", now).await;
        payload.payload.sender = LocalWallet::generate().address().to_string();

        assert!(matches!(
            gate.validate_payload(payload, &exact_requirement(&gate), now),
            Err(X402Error::InvalidSignature)
        ));
    }

    #[tokio::test]
    async fn test_exact_replay_rejected() {
        let gate = gate();
        let wallet = LocalWallet::generate();
        let now = now_secs();
        let payload = exact_payload(&wallet, "0.001", now).await;
        let requirement = exact_requirement(&gate);

        assert!(gate.validate_payload(payload.clone(), &requirement, now).is_ok());
        assert!(matches!(
            gate.validate_payload(payload, &requirement, now),
            Err(X402Error::NullifierSpent { .. })
        ));
    }

    #[tokio::test]
    async fn test_zk_payload_bound_to_payee() {
        let gate = gate();
        let wallet = LocalWallet::generate();
        let requirement = gate.requirements_for("GET", "/api/bounties/1/oracle").unwrap();

        let wrong_payee = zk_payload(&wallet, "0xSOMEONE_ELSE").await;
        assert!(matches!(
            gate.validate_payload(wrong_payee, &requirement, now_secs()),
            Err(X402Error::MalformedPayload { .. })
        ));

        let payload = zk_payload(&wallet, PAY_TO).await;
        assert!(gate.validate_payload(payload, &requirement, now_secs()).is_ok());
    }

    #[tokio::test]
    async fn test_zk_commitment_bound_to_bounty() {
        let mut config = X402Config::testnet(PAY_TO).with_route(RoutePolicy::new(
            "GET",
            "/api/bounties/[id]/oracle",
            "0.001",
            PaymentScheme::ZkExact,
            "Oracle",
        ));
        config.bounty_id = Some("7".to_string());
        let gate = PaymentGate::new(config).unwrap();
        let wallet = LocalWallet::generate();
        let requirement = gate.requirements_for("GET", "/api/bounties/7/oracle").unwrap();

        for other in [None, Some("8")] {
            let payload = zk_payload_for_bounty(&wallet, PAY_TO, other).await;
            assert!(matches!(
                gate.validate_payload(payload, &requirement, now_secs()),
                Err(X402Error::MalformedPayload { .. })
            ));
        }

        let payload = zk_payload_for_bounty(&wallet, PAY_TO, Some("7")).await;
        assert!(gate.validate_payload(payload, &requirement, now_secs()).is_ok());
    }

    #[tokio::test]
    async fn test_zk_sender_hash_must_open_to_sender() {
        let gate = gate();
        let wallet = LocalWallet::generate();
        let requirement = gate.requirements_for("GET", "/api/bounties/1/oracle").unwrap();
        let mut payload = zk_payload(&wallet, PAY_TO).await;

        // Re-sign the proof with a sender hash over a different nonce.
        let proof = payload.payload.zk_proof.as_mut().unwrap();
        proof.proof.sender_hash = sender_hash(&wallet.address().to_string(), "0x00").to_string();
        let message = crate::commitment::binding_message(
            &proof.commitment,
            &proof.nullifier,
            &proof.proof.amount_hash,
            &proof.proof.sender_hash,
            &proof.proof.receiver_hash,
            proof.proof.timestamp,
        );
        proof.proof.signature = wallet.sign(message.as_ref()).await.unwrap();

        match gate.validate_payload(payload, &requirement, now_secs()) {
            Err(X402Error::MalformedPayload { reason }) => assert!(reason.contains("sender")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_zk_sender_must_match_signer() {
        let gate = gate();
        let wallet = LocalWallet::generate();
        let requirement = gate.requirements_for("GET", "/api/bounties/1/oracle").unwrap();
        let mut payload = zk_payload(&wallet, PAY_TO).await;
        payload.payload.sender = LocalWallet::generate().address().to_string();

        assert!(matches!(
            gate.validate_payload(payload, &requirement, now_secs()),
            Err(X402Error::InvalidSignature)
        ));
    }

    #[tokio::test]
    async fn test_handler_failure_consumes_payment_without_settlement() {
        let gate = gate();
        let wallet = LocalWallet::generate();
        let payload = exact_payload(&wallet, "0.001", now_secs()).await;
        let header = payload.to_header().unwrap();

        let failing = handler_fn(|_req: HttpRequest| async {
            let mut response = http::Response::new(b"boom".to_vec());
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        });

        let response = gate
            .handle(request("POST", "/api/agents/run", Some(&header)), &failing)
            .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(HEADER_PAYMENT_RESPONSE).is_none());
        assert!(gate.records().await.is_empty());

        let retry = gate
            .handle(request("POST", "/api/agents/run", Some(&header)), &ok_handler())
            .await;
        assert_eq!(retry.status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[tokio::test]
    async fn test_paid_request_settles_offchain() {
        let gate = Arc::new(gate());
        let wallet = LocalWallet::generate();
        let payload = exact_payload(&wallet, "0.002", now_secs()).await;
        let nonce = payload.payload.nonce.clone();
        let paid = with_payment(ok_handler(), Arc::clone(&gate));

        let response = paid
            .call(request("POST", "/api/agents/run", Some(&payload.to_header().unwrap())))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let header = response.headers()[HEADER_PAYMENT_RESPONSE].to_str().unwrap();
        let settlement = SettlementResponse::from_header(header).unwrap();
        assert!(settlement.success);
        assert!(settlement
            .receipt
            .unwrap()
            .starts_with(&format!("offchain:{}:", nonce)));

        let status = gate.status().await.unwrap();
        assert_eq!(status.total_settlements, 1);
        assert_eq!(status.nullifiers_consumed, 1);
        assert_eq!(status.settled_volume, "0.002");
    }
}
