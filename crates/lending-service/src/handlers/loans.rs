//! Loan request and status handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use lending_core::{LoanStatus, LoanStatusView};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::auth::BasicAuth;
use crate::error::{ApiError, ApiJson};
use crate::state::AppState;

/// Loan request.
#[derive(Debug, Deserialize)]
pub struct LoanRequest {
    /// CBS customer number.
    #[serde(default, deserialize_with = "super::string_or_number")]
    pub customer_number: Option<String>,
    /// Requested amount, as a JSON number or decimal string.
    #[serde(default)]
    pub amount: Option<Decimal>,
}

/// Loan request response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanResponse {
    /// Outcome status: `APPROVED`, `REJECTED` or `FAILED`.
    pub status: LoanStatus,
    /// Human-readable summary.
    pub message: &'static str,
    /// Identifier for status lookups.
    pub application_id: String,
    /// Response time.
    pub timestamp: String,
}

fn outcome_message(status: LoanStatus) -> &'static str {
    match status {
        LoanStatus::Approved => "Loan application approved",
        LoanStatus::Rejected => "Loan application rejected",
        LoanStatus::Failed => "Loan application could not be scored",
        _ => "Loan application received and being processed",
    }
}

/// Request a loan. Responds once the application has been decided.
pub async fn request_loan(
    State(state): State<Arc<AppState>>,
    _auth: BasicAuth,
    ApiJson(body): ApiJson<LoanRequest>,
) -> Result<Json<LoanResponse>, ApiError> {
    let loan = state
        .orchestrator
        .submit(body.customer_number.as_deref(), body.amount)
        .await?;

    Ok(Json(LoanResponse {
        status: loan.status,
        message: outcome_message(loan.status),
        application_id: loan.application_id.to_string(),
        timestamp: Utc::now().to_rfc3339(),
    }))
}

/// Get the public status of a loan application.
pub async fn loan_status(
    State(state): State<Arc<AppState>>,
    Path(application_id): Path<String>,
) -> Result<Json<LoanStatusView>, ApiError> {
    let view = state.orchestrator.status(&application_id).await?;
    Ok(Json(view))
}
