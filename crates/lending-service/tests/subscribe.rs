//! Subscription integration tests.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn subscribe_returns_kyc_summary() {
    let harness = TestHarness::new().await;
    harness.mount_kyc("234774784", "Jane Doe").await;

    let response = harness
        .server
        .post("/api/v1/subscribe/")
        .json(&json!({ "customer_number": "234774784" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "SUCCESS");
    assert_eq!(body["message"], "Customer subscribed successfully");
    assert_eq!(body["subscription"]["customer_number"], "234774784");
    assert_eq!(body["subscription"]["is_active"], true);
    assert_eq!(body["customerDetails"]["name"], "Jane Doe");
    assert_eq!(body["customerDetails"]["accountStatus"], "ACTIVE");
    assert_eq!(body["customerDetails"]["existingLoan"], false);
}

#[tokio::test]
async fn subscribing_twice_returns_the_same_subscription() {
    let harness = TestHarness::new().await;
    harness.mount_kyc("234774784", "Jane Doe").await;

    let first: serde_json::Value = harness
        .server
        .post("/api/v1/subscribe")
        .json(&json!({ "customer_number": 234_774_784 }))
        .await
        .json();
    let second: serde_json::Value = harness
        .server
        .post("/api/v1/subscribe/")
        .json(&json!({ "customer_number": "234774784" }))
        .await
        .json();

    assert_eq!(first["subscription"], second["subscription"]);
    assert_eq!(second["message"], "Customer already subscribed");
}

#[tokio::test]
async fn subscribe_reports_existing_loan() {
    let harness = TestHarness::new().await;
    harness.mount_kyc("234774784", "Jane Doe").await;
    harness.mount_approval().await;

    let loan = harness.request_loan("234774784", 500).await;
    assert_eq!(loan["status"], "APPROVED");

    let body: serde_json::Value = harness
        .server
        .post("/api/v1/subscribe/")
        .json(&json!({ "customer_number": "234774784" }))
        .await
        .json();
    assert_eq!(body["customerDetails"]["existingLoan"], true);
}

#[tokio::test]
async fn unknown_customer_is_not_found() {
    let harness = TestHarness::new().await;
    harness.mount_kyc_unknown().await;

    let response = harness
        .server
        .post("/api/v1/subscribe/")
        .json(&json!({ "customer_number": "000000" }))
        .await;

    response.assert_status_not_found();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["message"], "Customer not found in CBS");
}

#[tokio::test]
async fn unreachable_cbs_is_not_found() {
    let harness = TestHarness::new().await;
    Mock::given(method("POST"))
        .and(path("/cbs/kyc"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&harness.mock)
        .await;

    harness
        .server
        .post("/api/v1/subscribe/")
        .json(&json!({ "customer_number": "234774784" }))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn missing_customer_number_is_rejected() {
    let harness = TestHarness::new().await;

    let response = harness.server.post("/api/v1/subscribe/").json(&json!({})).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = harness
        .server
        .post("/api/v1/subscribe/")
        .json(&json!({ "customer_number": "   " }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let harness = TestHarness::new().await;

    harness
        .server
        .post("/api/v1/subscribe/")
        .json(&json!({ "customer_number": ["a"] }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

// ============================================================================
// KYC cache
// ============================================================================

#[tokio::test]
async fn kyc_is_fetched_once_within_ttl() {
    let harness = TestHarness::new().await;
    Mock::given(method("POST"))
        .and(path("/cbs/kyc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(common::kyc_body("234774784", "Jane Doe")),
        )
        .expect(1)
        .mount(&harness.mock)
        .await;

    for _ in 0..3 {
        harness
            .server
            .post("/api/v1/subscribe/")
            .json(&json!({ "customer_number": "234774784" }))
            .await
            .assert_status_ok();
    }

    harness.mock.verify().await;
}

#[tokio::test]
async fn kyc_is_fetched_again_after_ttl() {
    let harness = TestHarness::with_config(|config| {
        config.cache.kyc_ttl = Duration::from_millis(200);
    })
    .await;
    Mock::given(method("POST"))
        .and(path("/cbs/kyc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(common::kyc_body("234774784", "Jane Doe")),
        )
        .expect(2)
        .mount(&harness.mock)
        .await;

    let subscribe = || async {
        harness
            .server
            .post("/api/v1/subscribe/")
            .json(&json!({ "customer_number": "234774784" }))
            .await
            .assert_status_ok();
    };

    subscribe().await;
    subscribe().await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    subscribe().await;

    harness.mock.verify().await;
}
