//! Core types for the lending orchestrator.
//!
//! This crate holds the domain model shared by the store and the HTTP service:
//!
//! - **Identifiers**: `ApplicationId`, `RepaymentId`
//! - **Loans**: `LoanApplication`, `LoanStatus`, `LoanStatusView`, `LoanRepayment`
//! - **Customers**: `CustomerSubscription`, `CustomerKyc`, `CustomerTransaction`
//! - **Scoring**: `ClientRegistration`, `ScoreReport`, `DecisionPolicy`, `decide`
//!
//! # Money
//!
//! Amounts are `rust_decimal::Decimal` with two decimal places, matching the
//! `NUMERIC(12, 2)` columns they are stored in.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod customer;
pub mod decision;
pub mod error;
pub mod ids;
pub mod loan;
pub mod registration;

pub use customer::{CustomerKyc, CustomerSubscription, CustomerTransaction, UNKNOWN_ACCOUNT_STATUS};
pub use decision::{
    decide, ApprovalTerms, Assessment, Decision, DecisionPolicy, ScoreReport, DEFAULT_INTEREST_RATE,
    DEFAULT_MIN_SCORE, DEFAULT_TERM_DAYS, NO_EXCLUSION,
};
pub use error::{LendingError, Result};
pub use ids::{ApplicationId, IdError, RepaymentId};
pub use loan::{
    max_amount, validate_amount, validate_customer_number, LoanApplication, LoanRepayment,
    LoanStatus, LoanStatusView, ACTIVE_STATUSES, AMOUNT_DECIMAL_PLACES, MAX_CUSTOMER_NUMBER_LEN,
};
pub use registration::ClientRegistration;
