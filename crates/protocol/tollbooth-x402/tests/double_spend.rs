//! Concurrent presentation of identical payments.

use std::sync::Arc;

use futures::future::join_all;
use http::StatusCode;
use tollbooth_test_utils::{
    fresh_exact_payload, paid_client, status_handler, test_gate, test_url, test_wallet,
};
use tollbooth_x402::{PaymentScheme, X402Error, HEADER_PAYMENT_SIGNATURE};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_identical_zk_proofs_race_single_winner() {
    let gate = test_gate(PaymentScheme::ZkExact);
    let requirement = gate.requirements_for("POST", "/api/agents/run").unwrap();
    let client = paid_client(gate.clone(), status_handler(200), Some(test_wallet()));
    let header = Arc::new(
        client
            .build_payment(&requirement)
            .await
            .unwrap()
            .to_header()
            .unwrap(),
    );

    let attempts = (0..32).map(|_| {
        let gate = Arc::clone(&gate);
        let header = Arc::clone(&header);
        let requirement = requirement.clone();
        tokio::spawn(async move { gate.verify_payment(&header, &requirement) })
    });
    let results = join_all(attempts).await;

    let mut accepted = 0;
    for result in results {
        match result.unwrap() {
            Ok(_) => accepted += 1,
            Err(X402Error::NullifierSpent { .. }) => {}
            Err(other) => panic!("unexpected rejection: {other}"),
        }
    }
    assert_eq!(accepted, 1);
    assert_eq!(gate.ledger().len().unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_identical_exact_payloads_race_through_handler() {
    let gate = test_gate(PaymentScheme::Exact);
    let handler = status_handler(200);
    let header = fresh_exact_payload(&test_wallet(), "0.001")
        .await
        .to_header()
        .unwrap();

    let attempts = (0..16).map(|_| {
        let gate = Arc::clone(&gate);
        let handler = handler.clone();
        let request = http::Request::builder()
            .method("POST")
            .uri(test_url("/api/agents/run"))
            .header(HEADER_PAYMENT_SIGNATURE, header.as_str())
            .body(Vec::new())
            .unwrap();
        tokio::spawn(async move { gate.handle(request, &handler).await.status() })
    });
    let statuses: Vec<StatusCode> = join_all(attempts)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let ok = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    let rejected = statuses
        .iter()
        .filter(|s| **s == StatusCode::PAYMENT_REQUIRED)
        .count();
    assert_eq!(ok, 1);
    assert_eq!(rejected, 15);
    assert_eq!(handler.calls(), 1);
    assert_eq!(gate.status().await.unwrap().total_settlements, 1);
}

#[tokio::test]
async fn test_rejected_payment_cannot_be_retried() {
    // Nullifier inspection during a successful verification burns the payment;
    // a second presentation is rejected even on a different route.
    let gate = test_gate(PaymentScheme::Exact);
    let payload = fresh_exact_payload(&test_wallet(), "0.001").await;
    let header = payload.to_header().unwrap();

    let run = gate.requirements_for("POST", "/api/agents/run").unwrap();
    let answers = gate.requirements_for("GET", "/api/bounties/3/answers").unwrap();

    assert!(gate.verify_payment(&header, &run).is_ok());
    assert!(matches!(
        gate.verify_payment(&header, &answers),
        Err(X402Error::NullifierSpent { .. })
    ));
}
