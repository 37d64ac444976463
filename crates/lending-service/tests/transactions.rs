//! Transaction data integration tests.

mod common;

use std::time::Duration;

use common::{transactions_body, TestHarness};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

const TRANSACTIONS_PATH: &str = "/api/v1/transactions/234774784/";

async fn mount_transactions(harness: &TestHarness, body: String, times: Option<u64>) {
    let mock = Mock::given(method("POST"))
        .and(path("/cbs/transactions"))
        .and(header("SOAPAction", "\"getCustomerTransactions\""))
        .respond_with(ResponseTemplate::new(200).set_body_string(body));
    let mock = match times {
        Some(n) => mock.up_to_n_times(n),
        None => mock,
    };
    mock.mount(&harness.mock).await;
}

#[tokio::test]
async fn transactions_are_served_to_the_scoring_engine() {
    let harness = TestHarness::new().await;
    mount_transactions(
        &harness,
        transactions_body(&[("ACC-1", "100.00", "CREDIT"), ("ACC-1", "40.50", "DEBIT")]),
        None,
    )
    .await;

    let (name, value) = TestHarness::auth();
    let response = harness.server.post(TRANSACTIONS_PATH).add_header(name, value).await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["customerNumber"], "234774784");
    let transactions = body["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 2);
    assert_eq!(transactions[0]["accountNumber"], "ACC-1");
    assert_eq!(transactions[0]["type"], "CREDIT");
    assert_eq!(transactions[1]["customerNumber"], "234774784");
}

#[tokio::test]
async fn transactions_are_cached() {
    let harness = TestHarness::new().await;
    Mock::given(method("POST"))
        .and(path("/cbs/transactions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(transactions_body(&[("ACC-1", "100.00", "CREDIT")])),
        )
        .expect(1)
        .mount(&harness.mock)
        .await;

    for _ in 0..2 {
        let (name, value) = TestHarness::auth();
        harness
            .server
            .get(TRANSACTIONS_PATH)
            .add_header(name, value)
            .await
            .assert_status_ok();
    }

    harness.mock.verify().await;
}

#[tokio::test]
async fn stored_transactions_cover_a_cbs_outage() {
    let harness = TestHarness::with_config(|config| {
        config.cache.transactions_ttl = Duration::from_millis(100);
    })
    .await;
    mount_transactions(
        &harness,
        transactions_body(&[("ACC-1", "100.00", "CREDIT")]),
        Some(1),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/cbs/transactions"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&harness.mock)
        .await;

    let (name, value) = TestHarness::auth();
    harness
        .server
        .get(TRANSACTIONS_PATH)
        .add_header(name, value)
        .await
        .assert_status_ok();

    tokio::time::sleep(Duration::from_millis(200)).await;

    let (name, value) = TestHarness::auth();
    let response = harness.server.get(TRANSACTIONS_PATH).add_header(name, value).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["transactions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn no_transactions_is_not_found() {
    let harness = TestHarness::new().await;
    mount_transactions(&harness, transactions_body(&[]), None).await;

    let (name, value) = TestHarness::auth();
    let response = harness.server.post(TRANSACTIONS_PATH).add_header(name, value).await;

    response.assert_status_not_found();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["message"], "No transactions found");
}

#[tokio::test]
async fn transactions_require_credentials() {
    let harness = TestHarness::new().await;

    harness
        .server
        .get(TRANSACTIONS_PATH)
        .await
        .assert_status_unauthorized();
}
