//! Customer onboarding.

use std::sync::Arc;

use lending_core::{validate_customer_number, CustomerKyc, CustomerSubscription, LendingError};
use lending_store::Store;

use crate::directory::CustomerDirectory;

/// Result of a subscription request.
#[derive(Debug, Clone)]
pub struct SubscriptionOutcome {
    /// The customer's subscription (new or existing).
    pub subscription: CustomerSubscription,
    /// Whether this request created it.
    pub created: bool,
    /// KYC data the subscription was verified against.
    pub kyc: CustomerKyc,
    /// Whether the customer currently has a non-terminal loan.
    pub existing_loan: bool,
}

/// Verifies customers against CBS and records their subscription.
#[derive(Clone)]
pub struct SubscriptionManager {
    directory: CustomerDirectory,
    store: Arc<dyn Store>,
}

impl SubscriptionManager {
    /// Create a new subscription manager.
    #[must_use]
    pub fn new(directory: CustomerDirectory, store: Arc<dyn Store>) -> Self {
        Self { directory, store }
    }

    /// Subscribe a customer. Subscribing twice returns the existing record.
    ///
    /// # Errors
    ///
    /// - `LendingError::Validation` if the customer number is missing or malformed.
    /// - `LendingError::CustomerNotFound` if KYC data cannot be obtained.
    /// - `LendingError::Storage` on persistence failure.
    pub async fn subscribe(
        &self,
        customer_number: Option<&str>,
    ) -> Result<SubscriptionOutcome, LendingError> {
        let customer_number = validate_customer_number(customer_number)?;

        let kyc = self.directory.kyc(&customer_number).await.ok_or_else(|| {
            LendingError::CustomerNotFound {
                customer_number: customer_number.clone(),
            }
        })?;

        let (subscription, created) = self
            .store
            .get_or_create_subscription(&customer_number)
            .await?;

        let existing_loan = self.store.has_active_loan(&customer_number).await?;

        if created {
            tracing::info!(customer_number = %customer_number, "Customer subscribed");
        } else {
            tracing::debug!(customer_number = %customer_number, "Customer already subscribed");
        }

        Ok(SubscriptionOutcome {
            subscription,
            created,
            kyc,
            existing_loan,
        })
    }
}
