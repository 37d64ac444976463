//! Error types for lending storage.

use lending_core::{LendingError, LoanStatus};

use crate::schema::entity;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// A stored row could not be mapped to a domain value.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// The customer already holds a loan in a non-terminal status.
    #[error("customer {customer_number} has an active loan application")]
    DuplicateActiveLoan {
        /// The customer holding the active loan.
        customer_number: String,
    },

    /// The stored status does not allow the requested change.
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// Stored status.
        from: LoanStatus,
        /// Requested status.
        to: LoanStatus,
    },
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<StoreError> for LendingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound {
                entity: entity::LOAN_APPLICATION,
                id,
            } => Self::LoanNotFound { application_id: id },
            StoreError::DuplicateActiveLoan { customer_number } => {
                Self::DuplicateActiveLoan { customer_number }
            }
            StoreError::InvalidTransition { from, to } => Self::InvalidTransition { from, to },
            other @ (StoreError::NotFound { .. }
            | StoreError::Database(_)
            | StoreError::Serialization(_)) => Self::Storage(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_loan_maps_to_loan_not_found() {
        let err = StoreError::NotFound {
            entity: entity::LOAN_APPLICATION,
            id: "abc".into(),
        };
        assert!(matches!(
            LendingError::from(err),
            LendingError::LoanNotFound { application_id } if application_id == "abc"
        ));
    }

    #[test]
    fn database_failure_maps_to_storage() {
        let err = StoreError::Database("connection reset".into());
        assert!(matches!(LendingError::from(err), LendingError::Storage(_)));
    }
}
