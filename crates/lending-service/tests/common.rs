//! Common test utilities for lending service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderName, HeaderValue};
use axum::Router;
use axum_test::TestServer;
use chrono::Utc;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lending_core::ClientRegistration;
use lending_service::auth::basic_header;
use lending_service::config::{CbsConfig, ScoringConfig};
use lending_service::{create_router, AppState, ServiceConfig};
use lending_store::{MemoryStore, Store};

pub const USERNAME: &str = "lending_user";
pub const PASSWORD: &str = "test-password";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Stands in for both CBS and the scoring engine.
    pub mock: MockServer,
    /// The backing store.
    pub store: Arc<MemoryStore>,
}

impl TestHarness {
    /// Harness with CBS, scoring and a client registration configured.
    pub async fn new() -> Self {
        Self::build(true, |_| {}).await
    }

    /// Harness whose service was never registered with the scoring engine.
    pub async fn without_registration() -> Self {
        Self::build(false, |_| {}).await
    }

    /// Harness with adjusted configuration.
    pub async fn with_config(adjust: impl FnOnce(&mut ServiceConfig)) -> Self {
        Self::build(true, adjust).await
    }

    async fn build(registered: bool, adjust: impl FnOnce(&mut ServiceConfig)) -> Self {
        let mock = MockServer::start().await;

        let mut config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            service_username: USERNAME.into(),
            service_password: PASSWORD.into(),
            cbs: CbsConfig {
                kyc_url: Some(format!("{}/cbs/kyc", mock.uri())),
                transactions_url: Some(format!("{}/cbs/transactions", mock.uri())),
                timeout: Duration::from_secs(2),
                ..CbsConfig::default()
            },
            scoring: ScoringConfig {
                base_url: Some(mock.uri()),
                max_retries: 3,
                retry_delay: Duration::from_millis(10),
                timeout: Duration::from_secs(2),
                deadline: Duration::from_secs(5),
            },
            request_timeout: Duration::from_secs(30),
            ..ServiceConfig::default()
        };
        adjust(&mut config);

        let registration = registered.then(|| ClientRegistration {
            client_id: 1,
            url: config.transactions_callback_url(),
            name: config.service_name.clone(),
            username: USERNAME.into(),
            password: PASSWORD.into(),
            token: "client-token-1".into(),
            created_at: Utc::now(),
        });

        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone() as Arc<dyn Store>, config, registration);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            mock,
            store,
        }
    }

    /// Authorization header for the service credentials.
    pub fn auth() -> (HeaderName, HeaderValue) {
        Self::auth_as(USERNAME, PASSWORD)
    }

    /// Authorization header for arbitrary credentials.
    pub fn auth_as(username: &str, password: &str) -> (HeaderName, HeaderValue) {
        (
            header::AUTHORIZATION,
            HeaderValue::from_str(&basic_header(username, password)).unwrap(),
        )
    }

    /// Request a loan with the service credentials and return the JSON body.
    pub async fn request_loan(&self, customer_number: &str, amount: u32) -> serde_json::Value {
        let (name, value) = Self::auth();
        let response = self
            .server
            .post("/api/v1/request/")
            .add_header(name, value)
            .json(&json!({ "customer_number": customer_number, "amount": amount }))
            .await;
        response.assert_status_ok();
        response.json()
    }

    // ========================================================================
    // CBS mocks
    // ========================================================================

    /// CBS knows the customer.
    pub async fn mount_kyc(&self, customer_number: &str, name: &str) -> &Self {
        Mock::given(method("POST"))
            .and(path("/cbs/kyc"))
            .and(body_string_contains(format!(
                "<cbs:customerNumber>{customer_number}</cbs:customerNumber>"
            )))
            .respond_with(ResponseTemplate::new(200).set_body_string(kyc_body(customer_number, name)))
            .mount(&self.mock)
            .await;
        self
    }

    /// CBS has no record of any other customer.
    pub async fn mount_kyc_unknown(&self) -> &Self {
        Mock::given(method("POST"))
            .and(path("/cbs/kyc"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<Envelope><Body><CustomerResponse/></Body></Envelope>",
            ))
            .mount(&self.mock)
            .await;
        self
    }

    // ========================================================================
    // Scoring mocks
    // ========================================================================

    /// Scoring runs start and return `score-token`.
    pub async fn mount_initiate(&self) -> &Self {
        Mock::given(method("GET"))
            .and(path_regex("^/scoring/initiateQueryScore/.+$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "score-token" })))
            .mount(&self.mock)
            .await;
        self
    }

    /// The score query answers with these figures.
    pub async fn mount_score(&self, score: i64, limit: u32, exclusion: &str) -> &Self {
        Mock::given(method("GET"))
            .and(path("/scoring/queryScore/score-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "score": score,
                "limitAmount": limit,
                "exclusion": exclusion,
                "exclusionReason": ""
            })))
            .mount(&self.mock)
            .await;
        self
    }

    /// Score a loan request as approved.
    pub async fn mount_approval(&self) -> &Self {
        self.mount_initiate().await;
        self.mount_score(600, 1000, "No Exclusion").await
    }
}

/// SOAP body CBS returns for a known customer.
pub fn kyc_body(customer_number: &str, name: &str) -> String {
    format!(
        "<soap:Envelope xmlns:soap=\"http://schemas.xmlsoap.org/soap/envelope/\"><soap:Body>\
         <ns2:CustomerResponse xmlns:ns2=\"http://credable.io/cbs/customer\"><customer>\
         <customerNumber>{customer_number}</customerNumber>\
         <customerName>{name}</customerName>\
         <status>ACTIVE</status>\
         <idNumber>ID-{customer_number}</idNumber>\
         </customer></ns2:CustomerResponse></soap:Body></soap:Envelope>"
    )
}

/// SOAP body CBS returns for a transaction history.
pub fn transactions_body(records: &[(&str, &str, &str)]) -> String {
    let records: String = records
        .iter()
        .map(|(account, amount, kind)| {
            format!(
                "<transaction><accountNumber>{account}</accountNumber>\
                 <transactionDate>2024-01-05T10:00:00Z</transactionDate>\
                 <amount>{amount}</amount><transactionType>{kind}</transactionType></transaction>"
            )
        })
        .collect();
    format!("<Envelope><Body><TransactionsResponse>{records}</TransactionsResponse></Body></Envelope>")
}
