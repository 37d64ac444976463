//! Customer-side records: subscriptions, KYC data and transaction history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A customer's subscription to the lending product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSubscription {
    /// CBS customer number (unique).
    pub customer_number: String,
    /// Whether the subscription is active.
    pub is_active: bool,
    /// When the customer first subscribed.
    pub subscribed_at: DateTime<Utc>,
    /// Last modification time.
    pub last_updated: DateTime<Utc>,
}

impl CustomerSubscription {
    /// Create an active subscription stamped with the current time.
    #[must_use]
    pub fn new(customer_number: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            customer_number: customer_number.into(),
            is_active: true,
            subscribed_at: now,
            last_updated: now,
        }
    }
}

/// Account status reported when CBS does not provide one.
pub const UNKNOWN_ACCOUNT_STATUS: &str = "UNKNOWN";

/// Identity data returned by the core banking system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerKyc {
    /// CBS customer number.
    pub customer_number: String,
    /// Display name.
    pub customer_name: String,
    /// Account status as reported by CBS.
    pub account_status: String,
    /// National identifier, when disclosed.
    pub id_number: Option<String>,
    /// Mobile number, when disclosed.
    pub mobile: Option<String>,
    /// Email address, when disclosed.
    pub email: Option<String>,
}

/// A single transaction from a customer's account history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerTransaction {
    /// Owner of the account.
    pub customer_number: String,
    /// Account the transaction was posted to.
    pub account_number: String,
    /// When the transaction happened.
    pub timestamp: DateTime<Utc>,
    /// Transaction amount.
    pub amount: Decimal,
    /// Transaction type as reported by CBS (e.g. `CREDIT`, `DEBIT`).
    #[serde(rename = "type")]
    pub transaction_type: String,
}
