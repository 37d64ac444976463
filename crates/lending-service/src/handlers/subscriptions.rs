//! Customer subscription handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiJson};
use crate::state::AppState;
use crate::subscription::SubscriptionOutcome;

/// Subscribe request.
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    /// CBS customer number.
    #[serde(default, deserialize_with = "super::string_or_number")]
    pub customer_number: Option<String>,
}

/// Subscription record as returned to the caller.
#[derive(Debug, Serialize)]
pub struct SubscriptionBody {
    /// CBS customer number.
    pub customer_number: String,
    /// Whether the subscription is active.
    pub is_active: bool,
    /// When the customer first subscribed.
    pub subscribed_at: String,
}

/// KYC summary returned with a subscription.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    /// Customer name from CBS.
    pub name: String,
    /// Account status from CBS.
    pub account_status: String,
    /// Whether the customer has a non-terminal loan.
    pub existing_loan: bool,
}

/// Subscribe response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeResponse {
    /// Always `SUCCESS`.
    pub status: &'static str,
    /// Human-readable summary.
    pub message: &'static str,
    /// The subscription.
    pub subscription: SubscriptionBody,
    /// KYC summary.
    pub customer_details: CustomerDetails,
}

impl From<SubscriptionOutcome> for SubscribeResponse {
    fn from(outcome: SubscriptionOutcome) -> Self {
        Self {
            status: "SUCCESS",
            message: if outcome.created {
                "Customer subscribed successfully"
            } else {
                "Customer already subscribed"
            },
            subscription: SubscriptionBody {
                customer_number: outcome.subscription.customer_number,
                is_active: outcome.subscription.is_active,
                subscribed_at: outcome.subscription.subscribed_at.to_rfc3339(),
            },
            customer_details: CustomerDetails {
                name: outcome.kyc.customer_name,
                account_status: outcome.kyc.account_status,
                existing_loan: outcome.existing_loan,
            },
        }
    }
}

/// Subscribe a customer after verifying them against CBS.
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<SubscribeRequest>,
) -> Result<Json<SubscribeResponse>, ApiError> {
    let outcome = state
        .subscriptions
        .subscribe(body.customer_number.as_deref())
        .await?;

    Ok(Json(outcome.into()))
}
