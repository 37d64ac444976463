//! Transaction data handlers.
//!
//! The scoring engine calls these with the service credentials it received
//! at client registration.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use lending_core::CustomerTransaction;
use serde::Serialize;

use crate::auth::BasicAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Transaction data response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsResponse {
    /// CBS customer number.
    pub customer_number: String,
    /// Transaction history.
    pub transactions: Vec<CustomerTransaction>,
}

/// Get a customer's transaction history.
pub async fn get_transactions(
    State(state): State<Arc<AppState>>,
    auth: BasicAuth,
    Path(customer_number): Path<String>,
) -> Result<Json<TransactionsResponse>, ApiError> {
    let (transactions, source) = state.directory.transactions(&customer_number).await?;

    if transactions.is_empty() {
        return Err(ApiError::NotFound("No transactions found".into()));
    }

    tracing::debug!(
        customer_number = %customer_number,
        caller = %auth.username,
        count = transactions.len(),
        source = ?source,
        "Transactions served"
    );

    Ok(Json(TransactionsResponse {
        customer_number,
        transactions,
    }))
}
