//! Core banking system SOAP client.

use std::time::Duration;

use lending_core::{CustomerKyc, CustomerTransaction};
use reqwest::Client;

use super::types::{
    build_envelope, kyc_from_record, parse_records, transaction_from_record, CUSTOMER_ELEMENT,
    KYC_NS, KYC_OPERATION, TRANSACTIONS_NS, TRANSACTIONS_OPERATION, TRANSACTION_ELEMENT,
};
use crate::config::CbsConfig;

/// Error type for CBS operations.
#[derive(Debug, thiserror::Error)]
pub enum CbsError {
    /// HTTP request failed (including timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a SOAP fault.
    #[error("SOAP fault: {0}")]
    Fault(String),

    /// Non-success status without a parsable fault.
    #[error("CBS returned HTTP {0}")]
    Status(u16),

    /// Response body is not well-formed XML.
    #[error("XML error: {0}")]
    Xml(String),

    /// Endpoint URL not configured.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// CBS SOAP client for KYC and transaction lookups.
#[derive(Debug, Clone)]
pub struct CbsClient {
    client: Client,
    kyc_url: Option<String>,
    transactions_url: Option<String>,
    username: String,
    password: String,
}

impl CbsClient {
    /// Create a new CBS client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &CbsConfig) -> Result<Self, CbsError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout.min(Duration::from_secs(5)))
            .build()?;

        Ok(Self {
            client,
            kyc_url: config.kyc_url.clone(),
            transactions_url: config.transactions_url.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Fetch identity data for a customer. `None` means CBS has no record.
    pub async fn get_customer_kyc(
        &self,
        customer_number: &str,
    ) -> Result<Option<CustomerKyc>, CbsError> {
        let url = self
            .kyc_url
            .as_deref()
            .ok_or_else(|| CbsError::Configuration("CBS_KYC_URL is not set".into()))?;

        let body = self
            .call(url, KYC_NS, KYC_OPERATION, customer_number)
            .await?;

        Ok(parse_records(&body, CUSTOMER_ELEMENT)?
            .into_iter()
            .next()
            .map(|record| kyc_from_record(record, customer_number)))
    }

    /// Fetch the transaction history of a customer.
    ///
    /// Records missing a required field are skipped. `None` means CBS
    /// returned no usable records.
    pub async fn get_customer_transactions(
        &self,
        customer_number: &str,
    ) -> Result<Option<Vec<CustomerTransaction>>, CbsError> {
        let url = self.transactions_url.as_deref().ok_or_else(|| {
            CbsError::Configuration("CBS_TRANSACTIONS_URL is not set".into())
        })?;

        let body = self
            .call(url, TRANSACTIONS_NS, TRANSACTIONS_OPERATION, customer_number)
            .await?;

        let transactions: Vec<_> = parse_records(&body, TRANSACTION_ELEMENT)?
            .into_iter()
            .filter_map(|record| match transaction_from_record(record, customer_number) {
                Ok(tx) => Some(tx),
                Err(field) => {
                    tracing::warn!(
                        customer_number = %customer_number,
                        field,
                        "Skipping CBS transaction with missing or malformed field"
                    );
                    None
                }
            })
            .collect();

        Ok((!transactions.is_empty()).then_some(transactions))
    }

    /// Post a SOAP request and return the response body.
    async fn call(
        &self,
        url: &str,
        namespace: &str,
        operation: &str,
        customer_number: &str,
    ) -> Result<String, CbsError> {
        let envelope = build_envelope(
            namespace,
            operation,
            customer_number,
            &self.username,
            &self.password,
        );

        let response = self
            .client
            .post(url)
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", format!("\"{operation}\""))
            .body(envelope)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        // Faults come back as 500 with a fault body.
        match parse_records(&body, CUSTOMER_ELEMENT) {
            Err(fault @ CbsError::Fault(_)) => Err(fault),
            _ => Err(CbsError::Status(status.as_u16())),
        }
    }
}
