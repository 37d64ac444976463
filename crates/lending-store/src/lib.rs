//! Storage layer for the lending orchestrator.
//!
//! Two backends implement the [`Store`] trait:
//!
//! - [`PgStore`]: PostgreSQL through `sqlx`, with embedded migrations. A
//!   partial unique index on `loan_applications (customer_number)` restricted
//!   to non-terminal statuses makes "one active loan per customer" a property
//!   of the database rather than of the caller.
//! - [`MemoryStore`]: a `tokio::sync::RwLock` over plain maps, used by tests
//!   and by local runs without `DATABASE_URL`. Check-and-insert happens under
//!   a single write lock.
//!
//! # Example
//!
//! ```no_run
//! use lending_core::LoanApplication;
//! use lending_store::{MemoryStore, Store};
//! use rust_decimal::Decimal;
//!
//! # async fn example() -> lending_store::Result<()> {
//! let store = MemoryStore::new();
//! let loan = LoanApplication::new("234774784", Decimal::new(50_000, 2));
//! store.create_loan_application(&loan).await?;
//! assert!(store.has_active_loan("234774784").await?);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod postgres;
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use lending_core::{
    ApplicationId, ClientRegistration, CustomerSubscription, CustomerTransaction,
    LoanApplication, LoanRepayment,
};

/// The storage trait defining all persistence operations.
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // Loan Applications
    // =========================================================================

    /// Insert a new loan application.
    ///
    /// The check that the customer has no other non-terminal loan and the
    /// insert are one atomic step.
    ///
    /// # Errors
    ///
    /// - `StoreError::DuplicateActiveLoan` if the customer already has an active loan.
    async fn create_loan_application(&self, loan: &LoanApplication) -> Result<()>;

    /// Get a loan application by its identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_loan_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<LoanApplication>>;

    /// Persist every mutable field of a loan application in one write.
    ///
    /// A status change is checked against the stored status.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the application doesn't exist.
    /// - `StoreError::InvalidTransition` if the stored status can't move to the new one.
    async fn update_loan_application(&self, loan: &LoanApplication) -> Result<()>;

    /// Whether the customer has any loan in a non-terminal status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn has_active_loan(&self, customer_number: &str) -> Result<bool>;

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Return the customer's subscription, creating an active one if absent.
    ///
    /// The boolean is `true` when this call created the row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_or_create_subscription(
        &self,
        customer_number: &str,
    ) -> Result<(CustomerSubscription, bool)>;

    // =========================================================================
    // Client Registration
    // =========================================================================

    /// Get the scoring-engine client registration, if one was stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_client_registration(&self) -> Result<Option<ClientRegistration>>;

    /// Store the client registration, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn put_client_registration(&self, registration: &ClientRegistration) -> Result<()>;

    // =========================================================================
    // Repayments
    // =========================================================================

    /// Append a repayment and evaluate whether the loan is now fully repaid.
    ///
    /// When the total repaid reaches the approved amount the loan moves to
    /// `REPAID` with today's repayment date, in the same transaction.
    /// Returns the loan as it stands afterwards.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the application doesn't exist.
    /// - `StoreError::InvalidTransition` if the loan is not `APPROVED` or `DISBURSED`.
    async fn record_repayment(&self, repayment: &LoanRepayment) -> Result<LoanApplication>;

    /// List repayments of a loan, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_repayments(&self, application_id: &ApplicationId) -> Result<Vec<LoanRepayment>>;

    // =========================================================================
    // Customer Transactions
    // =========================================================================

    /// Replace the materialized transaction history of a customer.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn replace_customer_transactions(
        &self,
        customer_number: &str,
        transactions: &[CustomerTransaction],
    ) -> Result<()>;

    /// List the materialized transaction history of a customer, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_customer_transactions(
        &self,
        customer_number: &str,
    ) -> Result<Vec<CustomerTransaction>>;
}

/// Sum repayments and decide whether the loan is settled.
pub(crate) fn settle_if_repaid(
    loan: &mut LoanApplication,
    repayments: impl IntoIterator<Item = rust_decimal::Decimal>,
) -> Result<()> {
    let repaid: rust_decimal::Decimal = repayments.into_iter().sum();
    let owed = loan.approved_amount.unwrap_or(loan.requested_amount);

    if repaid >= owed {
        loan.transition(lending_core::LoanStatus::Repaid)
            .map_err(|_| StoreError::InvalidTransition {
                from: loan.status,
                to: lending_core::LoanStatus::Repaid,
            })?;
        loan.repayment_date = Some(chrono::Utc::now().date_naive());
    }
    Ok(())
}

/// Reject repayments against loans that were never granted or are closed.
pub(crate) fn ensure_repayable(loan: &LoanApplication) -> Result<()> {
    if loan.status.can_transition_to(lending_core::LoanStatus::Repaid) {
        Ok(())
    } else {
        Err(StoreError::InvalidTransition {
            from: loan.status,
            to: lending_core::LoanStatus::Repaid,
        })
    }
}
