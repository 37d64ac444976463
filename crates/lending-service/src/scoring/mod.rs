//! Scoring engine integration.
//!
//! The engine scores a customer asynchronously:
//! - `createClient` registers this service once and returns a client token
//! - `initiateQueryScore` starts a scoring run and returns a scoring token
//! - `queryScore` returns the result once it is ready

pub mod client;
pub mod types;

pub use client::{ScoringClient, ScoringError, CLIENT_TOKEN_HEADER};
pub use types::CreateClientRequest;
