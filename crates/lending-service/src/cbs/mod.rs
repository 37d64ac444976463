//! Core banking system (CBS) integration.
//!
//! CBS exposes two SOAP services:
//! - `getCustomerKYC` - identity and account status
//! - `getCustomerTransactions` - account transaction history

pub mod client;
pub mod types;

pub use client::{CbsClient, CbsError};
