//! Digital lending HTTP API service.
//!
//! This crate provides the HTTP API for the lending orchestrator, including:
//!
//! - Customer subscription against the core banking system (CBS)
//! - Loan requests scored by the external scoring engine
//! - Loan status lookups
//! - Transaction data for scoring engine callbacks
//! - Repayment recording
//!
//! # Authentication
//!
//! Loan requests, transaction data and repayments require HTTP Basic
//! authentication with the service credentials. The scoring engine receives
//! the same credentials when this service registers with it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Health handler has nothing to await

pub mod auth;
pub mod bootstrap;
pub mod cache;
pub mod cbs;
pub mod config;
pub mod directory;
pub mod error;
pub mod handlers;
pub mod orchestrator;
pub mod routes;
pub mod scoring;
pub mod state;
pub mod subscription;

pub use bootstrap::{register_client, BootstrapError, Registration};
pub use cache::LookupCache;
pub use cbs::{CbsClient, CbsError};
pub use config::ServiceConfig;
pub use error::ApiError;
pub use orchestrator::LoanOrchestrator;
pub use routes::create_router;
pub use scoring::{ScoringClient, ScoringError};
pub use state::AppState;
