//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{health, loans, repayments, subscriptions, transactions};
use crate::state::AppState;

/// Maximum concurrent requests for API endpoints.
///
/// Loan requests hold their slot until scoring completes.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// Every API route also accepts a trailing slash.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `POST /api/v1/subscribe` - Subscribe a customer
/// - `GET /api/v1/status/:application_id` - Loan status
///
/// ## Basic auth
/// - `POST /api/v1/request` - Request a loan
/// - `GET|POST /api/v1/transactions/:customer_number` - Transaction data (scoring callback)
/// - `GET /api/v1/repayments/:application_id` - List repayments
/// - `POST /api/v1/repayments/:application_id` - Record a repayment
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout = state.config.request_timeout;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let api_routes = Router::new()
        // Subscriptions
        .route("/subscribe", post(subscriptions::subscribe))
        .route("/subscribe/", post(subscriptions::subscribe))
        // Loans
        .route("/request", post(loans::request_loan))
        .route("/request/", post(loans::request_loan))
        .route("/status/:application_id", get(loans::loan_status))
        .route("/status/:application_id/", get(loans::loan_status))
        // Transaction data
        .route(
            "/transactions/:customer_number",
            get(transactions::get_transactions).post(transactions::get_transactions),
        )
        .route(
            "/transactions/:customer_number/",
            get(transactions::get_transactions).post(transactions::get_transactions),
        )
        // Repayments
        .route(
            "/repayments/:application_id",
            get(repayments::list_repayments).post(repayments::record_repayment),
        )
        .route(
            "/repayments/:application_id/",
            get(repayments::list_repayments).post(repayments::record_repayment),
        )
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        .nest("/api/v1", api_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
