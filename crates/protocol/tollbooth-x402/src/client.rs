//! Client payment agent.
//!
//! Makes the two-step negotiation transparent to callers: send the request, and
//! on a 402 pick a requirement, build a payment with the proof engine, retry once
//! with the payment header, and decode the settlement receipt.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::de::DeserializeOwned;
use tollbooth_crypto::random_nonce;
use tracing::{debug, info, warn};

use crate::commitment::{generate_proof, now_secs, sign_exact_payment, ProofParams};
use crate::error::{X402Error, X402Result};
use crate::gate::{HttpRequest, HttpResponse};
use crate::signer::WalletSigner;
use crate::types::{
    decode_header, ClientConfig, PaymentBody, PaymentPayload, PaymentRequired,
    PaymentRequirements, PaymentScheme, SettlementResponse, HEADER_PAYMENT_REQUIRED,
    HEADER_PAYMENT_RESPONSE, HEADER_PAYMENT_SIGNATURE,
};

/// Sends HTTP requests for the payment agent.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request` and return the full response.
    async fn send(&self, request: HttpRequest) -> X402Result<HttpResponse>;
}

/// Transport backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Create a transport whose requests time out after `timeout`.
    pub fn with_timeout(timeout: Duration) -> X402Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> X402Result<HttpResponse> {
        let request = reqwest::Request::try_from(request)?;
        let response = self.client.execute(request).await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        let mut out = http::Response::new(body);
        *out.status_mut() = status;
        *out.headers_mut() = headers;
        Ok(out)
    }
}

/// Per-request options.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// HTTP method.
    pub method: Method,
    /// Extra request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Vec<u8>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }
}

impl RequestOptions {
    /// A `GET` request.
    pub fn get() -> Self {
        Self::default()
    }

    /// A `POST` request with a JSON body.
    pub fn post_json(body: impl Into<Vec<u8>>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Self {
            method: Method::POST,
            headers,
            body: body.into(),
        }
    }

    /// Set the method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }
}

/// Outcome of a request made through the agent.
#[derive(Debug, Clone)]
pub struct PaidResponse {
    /// Final HTTP status.
    pub status: StatusCode,
    /// Final response headers.
    pub headers: HeaderMap,
    /// Final response body.
    pub data: Vec<u8>,
    /// Decoded `PAYMENT-RESPONSE` header, if present.
    pub settlement: Option<SettlementResponse>,
    /// Whether the first attempt was answered with a 402.
    pub payment_required: bool,
    /// Whether a payment was attached to a retry.
    pub payment_made: bool,
}

impl PaidResponse {
    /// Parse the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> X402Result<T> {
        serde_json::from_slice(&self.data)
            .map_err(|e| X402Error::Transport(format!("invalid JSON response: {}", e)))
    }

    /// The body as lossy UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// Caller-side payment agent.
pub struct PaymentClient<T> {
    transport: T,
    signer: Option<Arc<dyn WalletSigner>>,
    config: ClientConfig,
}

impl<T: HttpTransport> PaymentClient<T> {
    /// Create an agent without a wallet; 402s surface as `PaymentRequired`.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            signer: None,
            config: ClientConfig::default(),
        }
    }

    /// Pay with `signer`.
    pub fn with_signer(mut self, signer: Arc<dyn WalletSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Replace the client configuration.
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// The configuration in use.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send a request, paying once if the server answers 402.
    ///
    /// # Errors
    /// - `PaymentRequired` if payment is demanded and no wallet is configured or
    ///   nothing acceptable is offered
    /// - `PaymentFailed` if the paid retry is answered with another 402
    /// - `SigningUnavailable` if the wallet cannot sign
    /// - `Transport` on HTTP failures
    pub async fn request(&self, url: &str, options: RequestOptions) -> X402Result<PaidResponse> {
        let response = self.transport.send(build_request(url, &options, None)?).await?;
        if response.status() != StatusCode::PAYMENT_REQUIRED {
            return Ok(paid_response(response, false, false));
        }

        let required = parse_payment_required(&response)?;
        debug!(
            url = %url,
            offers = required.accepts.len(),
            error = %required.error,
            "Payment required"
        );

        if self.signer.is_none() {
            return Err(X402Error::PaymentRequired {
                reason: required.error,
            });
        }
        let requirement = required
            .select(self.config.preferred_scheme)
            .ok_or_else(|| X402Error::PaymentRequired {
                reason: format!("{} (no payment options offered)", required.error),
            })?;

        let payload = self.build_payment(requirement).await?;
        let header = payload.to_header()?;

        let retry = self
            .transport
            .send(build_request(url, &options, Some(header))?)
            .await?;

        if retry.status() == StatusCode::PAYMENT_REQUIRED {
            let reason = parse_payment_required(&retry)
                .map(|r| r.error)
                .unwrap_or_else(|e| e.to_string());
            warn!(url = %url, reason = %reason, "Payment rejected by server");
            return Err(X402Error::PaymentFailed { reason });
        }

        info!(
            url = %url,
            scheme = %payload.scheme,
            amount = %payload.payload.amount,
            status = retry.status().as_u16(),
            "Paid request completed"
        );
        Ok(paid_response(retry, true, true))
    }

    /// Build a payment payload satisfying `requirement`.
    pub async fn build_payment(
        &self,
        requirement: &PaymentRequirements,
    ) -> X402Result<PaymentPayload> {
        let signer = self
            .signer
            .as_deref()
            .ok_or_else(|| X402Error::SigningUnavailable {
                reason: "no wallet configured".to_string(),
            })?;
        let amount = requirement.max_amount_base_units()?;
        let timeout = Duration::from_secs(self.config.signing_timeout_secs);
        let sender = signer.address().to_string();

        let body = match requirement.scheme {
            PaymentScheme::Exact => {
                let nonce = random_nonce();
                let timestamp = now_secs();
                let signature =
                    sign_exact_payment(signer, amount, &nonce, timestamp, timeout).await?;
                PaymentBody {
                    sender,
                    amount: requirement.max_amount_required.clone(),
                    nonce,
                    timestamp,
                    signature: Some(signature),
                    zk_proof: None,
                }
            }
            PaymentScheme::ZkExact => {
                let params = ProofParams {
                    amount,
                    sender: sender.clone(),
                    receiver: requirement.pay_to.clone(),
                    chain_id: requirement
                        .chain_id()
                        .unwrap_or(self.config.fallback_chain_id),
                    contract_address: requirement.contract_address.clone().unwrap_or_default(),
                    bounty_id: requirement.bounty_id.clone(),
                };
                let generated = generate_proof(&params, signer, timeout).await?;
                PaymentBody {
                    sender,
                    amount: requirement.max_amount_required.clone(),
                    nonce: generated.nonce,
                    timestamp: generated.proof.proof.timestamp,
                    signature: None,
                    zk_proof: Some(generated.proof),
                }
            }
        };

        Ok(PaymentPayload {
            x402_version: crate::types::X402_VERSION,
            scheme: requirement.scheme,
            network: requirement.network.clone(),
            payload: body,
        })
    }
}

fn build_request(
    url: &str,
    options: &RequestOptions,
    payment: Option<String>,
) -> X402Result<HttpRequest> {
    let mut request = http::Request::builder()
        .method(options.method.clone())
        .uri(url)
        .body(options.body.clone())
        .map_err(|e| X402Error::Transport(format!("invalid request: {}", e)))?;

    *request.headers_mut() = options.headers.clone();
    if let Some(value) = payment {
        let name = HeaderName::from_bytes(HEADER_PAYMENT_SIGNATURE.as_bytes())
            .map_err(|e| X402Error::Internal(e.to_string()))?;
        let value = HeaderValue::try_from(value)
            .map_err(|e| X402Error::Internal(format!("invalid payment header: {}", e)))?;
        request.headers_mut().insert(name, value);
    }
    Ok(request)
}

/// Read requirements from a 402, preferring the JSON body over the header.
fn parse_payment_required(response: &HttpResponse) -> X402Result<PaymentRequired> {
    if let Ok(body) = serde_json::from_slice::<PaymentRequired>(response.body()) {
        return Ok(body);
    }

    let header = response
        .headers()
        .get(HEADER_PAYMENT_REQUIRED)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| X402Error::malformed("402 response without payment requirements"))?;
    let accepts: Vec<PaymentRequirements> = decode_header(header)?;
    Ok(PaymentRequired::new("Payment required", accepts))
}

fn paid_response(response: HttpResponse, payment_required: bool, payment_made: bool) -> PaidResponse {
    let settlement = response
        .headers()
        .get(HEADER_PAYMENT_RESPONSE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| match SettlementResponse::from_header(v) {
            Ok(settlement) => Some(settlement),
            Err(e) => {
                warn!(error = %e, "Ignoring undecodable settlement header");
                None
            }
        });

    let (parts, data) = response.into_parts();
    PaidResponse {
        status: parts.status,
        headers: parts.headers,
        data,
        settlement,
        payment_required,
        payment_made,
    }
}
