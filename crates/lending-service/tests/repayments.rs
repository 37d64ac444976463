//! Repayment integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::json;

async fn repay(harness: &TestHarness, id: &str, amount: serde_json::Value) -> axum_test::TestResponse {
    let (name, value) = TestHarness::auth();
    harness
        .server
        .post(&format!("/api/v1/repayments/{id}"))
        .add_header(name, value)
        .json(&json!({ "amount": amount, "reference": "MPESA-REF" }))
        .await
}

#[tokio::test]
async fn partial_repayments_settle_the_loan() {
    let harness = TestHarness::new().await;
    harness.mount_approval().await;
    let loan = harness.request_loan("234774784", 500).await;
    let id = loan["applicationId"].as_str().unwrap();

    let first = repay(&harness, id, json!(200)).await;
    first.assert_status_ok();
    let first: serde_json::Value = first.json();
    assert_eq!(first["status"], "APPROVED");
    assert_eq!(first["repayments"].as_array().unwrap().len(), 1);

    let second: serde_json::Value = repay(&harness, id, json!("300.00")).await.json();
    assert_eq!(second["status"], "REPAID");

    let (name, value) = TestHarness::auth();
    let listed: serde_json::Value = harness
        .server
        .get(&format!("/api/v1/repayments/{id}/"))
        .add_header(name, value)
        .await
        .json();
    assert_eq!(listed["status"], "REPAID");
    assert_eq!(listed["repayments"].as_array().unwrap().len(), 2);
    assert_eq!(listed["repayments"][0]["reference"], "MPESA-REF");

    // A repaid loan no longer blocks a new application.
    assert_eq!(harness.request_loan("234774784", 100).await["status"], "APPROVED");
}

#[tokio::test]
async fn rejected_loan_cannot_be_repaid() {
    let harness = TestHarness::new().await;
    harness.mount_initiate().await;
    harness.mount_score(100, 1000, "No Exclusion").await;
    let loan = harness.request_loan("234774784", 500).await;

    repay(&harness, loan["applicationId"].as_str().unwrap(), json!(100))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_loan_is_not_found() {
    let harness = TestHarness::new().await;

    repay(&harness, &uuid::Uuid::new_v4().to_string(), json!(100))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn repayment_requires_a_reference() {
    let harness = TestHarness::new().await;
    harness.mount_approval().await;
    let loan = harness.request_loan("234774784", 500).await;

    let (name, value) = TestHarness::auth();
    harness
        .server
        .post(&format!(
            "/api/v1/repayments/{}",
            loan["applicationId"].as_str().unwrap()
        ))
        .add_header(name, value)
        .json(&json!({ "amount": 100 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
