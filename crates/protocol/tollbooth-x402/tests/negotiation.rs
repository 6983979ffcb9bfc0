//! End-to-end negotiation through the in-process client → gate → handler stack.

use std::sync::Arc;

use http::StatusCode;
use tollbooth_test_utils::{
    echo_handler, fresh_exact_payload, paid_client, status_handler, test_config, test_gate,
    test_url, test_wallet, TEST_PAY_TO,
};
use tollbooth_x402::{
    types::decode_header, BusinessHandler, HttpRequest, PaymentGate, PaymentRequired,
    PaymentRequirements, PaymentScheme, RequestOptions, SettlementResponse, WalletSigner,
    X402Error, HEADER_PAYMENT_REQUIRED, HEADER_PAYMENT_RESPONSE, HEADER_PAYMENT_SIGNATURE,
    HEADER_X_PAYMENT,
};

fn request(method: &str, path: &str, payment: Option<(&str, &str)>) -> HttpRequest {
    let mut builder = http::Request::builder().method(method).uri(test_url(path));
    if let Some((name, value)) = payment {
        builder = builder.header(name, value);
    }
    builder.body(b"{}".to_vec()).unwrap()
}

#[tokio::test]
async fn test_end_to_end_zk_scenario() {
    let gate = test_gate(PaymentScheme::ZkExact);
    let handler = echo_handler();
    let wallet = test_wallet();

    // First call: no payment, 402 with the requirement.
    let first = gate
        .handle(request("POST", "/api/agents/run", None), &handler)
        .await;
    assert_eq!(first.status(), StatusCode::PAYMENT_REQUIRED);
    let body: PaymentRequired = serde_json::from_slice(first.body()).unwrap();
    assert_eq!(body.accepts.len(), 1);
    let requirement = &body.accepts[0];
    assert_eq!(requirement.scheme, PaymentScheme::ZkExact);
    assert_eq!(requirement.max_amount_required, "0.001");
    assert_eq!(requirement.pay_to, TEST_PAY_TO);

    let header_accepts: Vec<PaymentRequirements> =
        decode_header(first.headers()[HEADER_PAYMENT_REQUIRED].to_str().unwrap()).unwrap();
    assert_eq!(&header_accepts, &body.accepts);

    // Build the proof the way the client agent does.
    let client = paid_client(gate.clone(), echo_handler(), Some(wallet.clone()));
    let payload = client.build_payment(requirement).await.unwrap();
    assert_eq!(payload.payload.amount, "0.001");
    let encoded = payload.to_header().unwrap();

    // Second call: paid, handler runs, receipt attached.
    let second = gate
        .handle(
            request(
                "POST",
                "/api/agents/run",
                Some((HEADER_PAYMENT_SIGNATURE, &encoded)),
            ),
            &handler,
        )
        .await;
    assert_eq!(second.status(), StatusCode::OK);
    let settlement = SettlementResponse::from_header(
        second.headers()[HEADER_PAYMENT_RESPONSE].to_str().unwrap(),
    )
    .unwrap();
    assert!(settlement.success);
    let receipt = settlement.receipt.unwrap();
    let prefix = format!("offchain:{}:", payload.payload.nonce);
    assert!(receipt.starts_with(&prefix), "{receipt}");
    assert!(receipt[prefix.len()..].parse::<u64>().is_ok());

    // Third call: same payload again, rejected as spent.
    let third = gate
        .handle(
            request(
                "POST",
                "/api/agents/run",
                Some((HEADER_PAYMENT_SIGNATURE, &encoded)),
            ),
            &handler,
        )
        .await;
    assert_eq!(third.status(), StatusCode::PAYMENT_REQUIRED);
    let rejected: PaymentRequired = serde_json::from_slice(third.body()).unwrap();
    assert!(rejected.error.contains("nullifier"), "{}", rejected.error);

    let status = gate.status().await.unwrap();
    assert_eq!(status.total_settlements, 1);
    assert_eq!(status.settled_volume, "0.001");
}

#[tokio::test]
async fn test_client_agent_pays_transparently() {
    let gate = test_gate(PaymentScheme::ZkExact);
    let wallet = test_wallet();
    let client = paid_client(gate.clone(), echo_handler(), Some(wallet.clone()));

    let response = client
        .request(
            &test_url("/api/agents/run"),
            RequestOptions::post_json(r#"{"task":"summarize"}"#),
        )
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.payment_required);
    assert!(response.payment_made);
    assert!(response.settlement.as_ref().unwrap().success);

    let echoed: serde_json::Value = response.json().unwrap();
    assert_eq!(echoed["path"], "/api/agents/run");
    assert_eq!(echoed["body"], r#"{"task":"summarize"}"#);

    assert_eq!(client.transport().request_count(), 2);
    let records = gate.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].payer, wallet.address().to_string());
    assert_eq!(records[0].scheme, PaymentScheme::ZkExact);
}

#[tokio::test]
async fn test_client_agent_exact_scheme() {
    let gate = test_gate(PaymentScheme::Exact);
    let client = paid_client(gate.clone(), echo_handler(), Some(test_wallet()));

    let response = client
        .request(&test_url("/api/bounties/17/answers"), RequestOptions::get())
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.payment_made);
    assert_eq!(gate.records().await[0].scheme, PaymentScheme::Exact);
}

#[tokio::test]
async fn test_client_without_wallet_gets_payment_required() {
    let gate = test_gate(PaymentScheme::ZkExact);
    let handler = status_handler(200);
    let client = paid_client(gate, handler.clone(), None);

    let result = client
        .request(&test_url("/api/agents/run"), RequestOptions::post_json("{}"))
        .await;
    assert!(matches!(result, Err(X402Error::PaymentRequired { .. })));
    assert_eq!(handler.calls(), 0);
}

#[tokio::test]
async fn test_unconfigured_route_never_402() {
    let gate = test_gate(PaymentScheme::ZkExact);
    let handler = status_handler(200);

    for (method, path) in [("GET", "/api/health"), ("GET", "/api/agents/run"), ("POST", "/")] {
        let response = gate.handle(request(method, path, None), &handler).await;
        assert_eq!(response.status(), StatusCode::OK, "{method} {path}");
        assert!(response.headers().get(HEADER_PAYMENT_REQUIRED).is_none());
    }
    assert_eq!(handler.calls(), 3);
}

#[tokio::test]
async fn test_valid_payment_does_not_loop_back_to_402() {
    let gate = test_gate(PaymentScheme::ZkExact);
    let handler = status_handler(200);
    let client = paid_client(gate, handler.clone(), Some(test_wallet()));

    for _ in 0..3 {
        let response = client
            .request(&test_url("/api/agents/run"), RequestOptions::post_json("{}"))
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::OK);
    }
    assert_eq!(handler.calls(), 3);
}

#[tokio::test]
async fn test_scheme_binding() {
    let gate = test_gate(PaymentScheme::ZkExact);
    let wallet = test_wallet();
    // Correctly signed, but for the wrong scheme.
    let payload = fresh_exact_payload(&wallet, "0.001").await;

    let response = gate
        .handle(
            request(
                "POST",
                "/api/agents/run",
                Some((HEADER_PAYMENT_SIGNATURE, &payload.to_header().unwrap())),
            ),
            &echo_handler(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    let body: PaymentRequired = serde_json::from_slice(response.body()).unwrap();
    assert!(body.error.contains("scheme mismatch"), "{}", body.error);
}

#[tokio::test]
async fn test_amount_below_price_rejected() {
    let gate = test_gate(PaymentScheme::Exact);
    let wallet = test_wallet();
    let handler = status_handler(200);

    for amount in ["0", "0.0009", "0.000999999999999999"] {
        let payload = fresh_exact_payload(&wallet, amount).await;
        let response = gate
            .handle(
                request(
                    "POST",
                    "/api/agents/run",
                    Some((HEADER_PAYMENT_SIGNATURE, &payload.to_header().unwrap())),
                ),
                &handler,
            )
            .await;
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED, "{amount}");
    }
    assert_eq!(handler.calls(), 0);

    // Overpaying is accepted.
    let payload = fresh_exact_payload(&wallet, "0.01").await;
    let response = gate
        .handle(
            request(
                "POST",
                "/api/agents/run",
                Some((HEADER_PAYMENT_SIGNATURE, &payload.to_header().unwrap())),
            ),
            &handler,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_legacy_header_accepted() {
    let gate = test_gate(PaymentScheme::Exact);
    let payload = fresh_exact_payload(&test_wallet(), "0.001").await;

    let response = gate
        .handle(
            request(
                "POST",
                "/api/agents/run",
                Some((HEADER_X_PAYMENT, &payload.to_header().unwrap())),
            ),
            &status_handler(200),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(HEADER_PAYMENT_RESPONSE).is_some());
}

#[tokio::test]
async fn test_handler_error_consumes_payment() {
    let gate = test_gate(PaymentScheme::Exact);
    let failing = status_handler(503);
    let payload = fresh_exact_payload(&test_wallet(), "0.001").await;
    let header = payload.to_header().unwrap();

    let response = gate
        .handle(
            request(
                "POST",
                "/api/agents/run",
                Some((HEADER_PAYMENT_SIGNATURE, &header)),
            ),
            &failing,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(response.headers().get(HEADER_PAYMENT_RESPONSE).is_none());

    // Pay-to-attempt: the payment cannot be reused.
    let retry = gate
        .handle(
            request(
                "POST",
                "/api/agents/run",
                Some((HEADER_PAYMENT_SIGNATURE, &header)),
            ),
            &status_handler(200),
        )
        .await;
    assert_eq!(retry.status(), StatusCode::PAYMENT_REQUIRED);
    assert_eq!(gate.status().await.unwrap().total_settlements, 0);
}

#[tokio::test]
async fn test_paid_handler_exposes_gate() {
    let gate = test_gate(PaymentScheme::Exact);
    let paid = tollbooth_x402::with_payment(status_handler(200), gate.clone());
    assert!(Arc::ptr_eq(paid.gate(), &gate));

    let response = paid.call(request("POST", "/api/agents/run", None)).await;
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
}

#[tokio::test]
async fn test_zk_payment_on_non_default_network() {
    let mut config = test_config(PaymentScheme::ZkExact);
    config.network = "eip155:8453".to_string();
    assert!(matches!(
        PaymentGate::new(config.clone()),
        Err(X402Error::NetworkChainConflict { .. })
    ));

    config.chain_id = 8453;
    let gate = Arc::new(PaymentGate::new(config).unwrap());
    let client = paid_client(gate.clone(), status_handler(200), Some(test_wallet()));

    let response = client
        .request(&test_url("/api/agents/run"), RequestOptions::post_json("{}"))
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.payment_made);
    assert_eq!(gate.records().await[0].scheme, PaymentScheme::ZkExact);
}
