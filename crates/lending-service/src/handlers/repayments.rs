//! Repayment handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use lending_core::{LoanApplication, LoanRepayment, LoanStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::auth::BasicAuth;
use crate::error::{ApiError, ApiJson};
use crate::state::AppState;

/// Record repayment request.
#[derive(Debug, Deserialize)]
pub struct RepaymentRequest {
    /// Amount paid.
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// External payment reference.
    #[serde(default)]
    pub reference: Option<String>,
}

/// A repayment as returned to the caller.
#[derive(Debug, Serialize)]
pub struct RepaymentBody {
    /// Repayment identifier.
    pub id: String,
    /// Amount paid.
    pub amount: Decimal,
    /// When the payment was made.
    pub paid_at: String,
    /// External payment reference.
    pub reference: String,
}

impl From<&LoanRepayment> for RepaymentBody {
    fn from(repayment: &LoanRepayment) -> Self {
        Self {
            id: repayment.id.to_string(),
            amount: repayment.amount,
            paid_at: repayment.paid_at.to_rfc3339(),
            reference: repayment.transaction_reference.clone(),
        }
    }
}

/// Repayment summary for a loan.
#[derive(Debug, Serialize)]
pub struct RepaymentsResponse {
    /// Loan identifier.
    pub application_id: String,
    /// Loan status after the operation.
    pub status: LoanStatus,
    /// Amount owed (approved amount).
    pub amount_due: Option<Decimal>,
    /// Sum of all repayments.
    pub total_repaid: Decimal,
    /// Repayments in the order they were recorded.
    pub repayments: Vec<RepaymentBody>,
}

impl RepaymentsResponse {
    fn new(loan: &LoanApplication, repayments: &[LoanRepayment]) -> Self {
        Self {
            application_id: loan.application_id.to_string(),
            status: loan.status,
            amount_due: loan.approved_amount,
            total_repaid: repayments.iter().map(|r| r.amount).sum(),
            repayments: repayments.iter().map(RepaymentBody::from).collect(),
        }
    }
}

/// Record a repayment against a loan.
pub async fn record_repayment(
    State(state): State<Arc<AppState>>,
    _auth: BasicAuth,
    Path(application_id): Path<String>,
    ApiJson(body): ApiJson<RepaymentRequest>,
) -> Result<Json<RepaymentsResponse>, ApiError> {
    let (loan, _) = state
        .orchestrator
        .record_repayment(&application_id, body.amount, body.reference.as_deref())
        .await?;
    let repayments = state.store.list_repayments(&loan.application_id).await?;

    Ok(Json(RepaymentsResponse::new(&loan, &repayments)))
}

/// List repayments recorded against a loan.
pub async fn list_repayments(
    State(state): State<Arc<AppState>>,
    _auth: BasicAuth,
    Path(application_id): Path<String>,
) -> Result<Json<RepaymentsResponse>, ApiError> {
    let (loan, repayments) = state.orchestrator.repayments(&application_id).await?;
    Ok(Json(RepaymentsResponse::new(&loan, &repayments)))
}
