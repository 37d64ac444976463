//! Error types for the lending domain.

use crate::ids::IdError;
use crate::loan::LoanStatus;

/// Result type for lending operations.
pub type Result<T> = std::result::Result<T, LendingError>;

/// Errors surfaced by the orchestration core.
///
/// Failures of the external adapters never appear here directly: they are
/// folded into a retry or into a `FAILED` loan before reaching a caller.
#[derive(Debug, thiserror::Error)]
pub enum LendingError {
    /// Request input is missing or malformed.
    #[error("validation error: {0}")]
    Validation(String),

    /// The customer already has a loan in a non-terminal status.
    #[error("customer {customer_number} has an active loan application")]
    DuplicateActiveLoan {
        /// The customer holding the active loan.
        customer_number: String,
    },

    /// The core banking system has no data for the customer.
    #[error("customer not found: {customer_number}")]
    CustomerNotFound {
        /// The customer that was looked up.
        customer_number: String,
    },

    /// No loan application exists with this identifier.
    #[error("loan application not found: {application_id}")]
    LoanNotFound {
        /// The identifier that was looked up.
        application_id: String,
    },

    /// This service has not been registered with the scoring engine.
    #[error("scoring engine client registration is not configured")]
    ScoringNotConfigured,

    /// The scoring engine refused or failed to start a scoring run.
    #[error("scoring initiation failed for customer {customer_number}")]
    ScoringInitiation {
        /// The customer being scored.
        customer_number: String,
    },

    /// A status change the loan state machine does not allow.
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: LoanStatus,
        /// Requested status.
        to: LoanStatus,
    },

    /// Persistence failure.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<IdError> for LendingError {
    fn from(err: IdError) -> Self {
        Self::Validation(err.to_string())
    }
}
