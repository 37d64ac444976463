//! Table, index and entity names used by the storage backends.
//!
//! The DDL itself lives in `migrations/`; these names must stay in sync with it.

/// PostgreSQL table names.
pub mod table {
    /// Loan applications, keyed by `application_id`.
    pub const LOAN_APPLICATIONS: &str = "loan_applications";

    /// Customer subscriptions, keyed by `customer_number`.
    pub const CUSTOMER_SUBSCRIPTIONS: &str = "customer_subscriptions";

    /// The single scoring-engine client registration.
    pub const CLIENT_REGISTRATIONS: &str = "client_registrations";

    /// Repayments, keyed by ULID, indexed by `application_id`.
    pub const LOAN_REPAYMENTS: &str = "loan_repayments";

    /// Materialized CBS transactions, indexed by `customer_number`.
    pub const CUSTOMER_TRANSACTIONS: &str = "customer_transactions";
}

/// Partial unique index enforcing one non-terminal loan per customer.
pub const ACTIVE_LOAN_PER_CUSTOMER_INDEX: &str = "loan_applications_one_active_per_customer";

/// Entity names reported in `StoreError::NotFound`.
pub mod entity {
    /// A loan application.
    pub const LOAN_APPLICATION: &str = "loan application";
}

/// Returns all table names, children before parents.
#[must_use]
pub fn all_tables() -> Vec<&'static str> {
    vec![
        table::LOAN_REPAYMENTS,
        table::LOAN_APPLICATIONS,
        table::CUSTOMER_SUBSCRIPTIONS,
        table::CLIENT_REGISTRATIONS,
        table::CUSTOMER_TRANSACTIONS,
    ]
}
