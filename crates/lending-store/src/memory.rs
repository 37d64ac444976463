//! In-memory storage backend.
//!
//! All tables sit behind one `tokio::sync::RwLock`, so every compound
//! operation (check-then-insert, append-then-settle) runs under a single
//! write guard.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use lending_core::{
    ApplicationId, ClientRegistration, CustomerSubscription, CustomerTransaction,
    LoanApplication, LoanRepayment,
};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::schema::entity;
use crate::{ensure_repayable, settle_if_repaid, Store};

#[derive(Debug, Default)]
struct Tables {
    loans: HashMap<ApplicationId, LoanApplication>,
    subscriptions: HashMap<String, CustomerSubscription>,
    registration: Option<ClientRegistration>,
    repayments: Vec<LoanRepayment>,
    transactions: HashMap<String, Vec<CustomerTransaction>>,
}

/// Store backed by process memory. Cloning shares the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(application_id: &ApplicationId) -> StoreError {
    StoreError::NotFound {
        entity: entity::LOAN_APPLICATION,
        id: application_id.to_string(),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_loan_application(&self, loan: &LoanApplication) -> Result<()> {
        let mut tables = self.tables.write().await;

        let occupied = tables
            .loans
            .values()
            .any(|l| l.customer_number == loan.customer_number && l.status.is_active());
        if occupied && loan.status.is_active() {
            return Err(StoreError::DuplicateActiveLoan {
                customer_number: loan.customer_number.clone(),
            });
        }

        tables.loans.insert(loan.application_id, loan.clone());
        Ok(())
    }

    async fn get_loan_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<LoanApplication>> {
        Ok(self.tables.read().await.loans.get(application_id).cloned())
    }

    async fn update_loan_application(&self, loan: &LoanApplication) -> Result<()> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .loans
            .get_mut(&loan.application_id)
            .ok_or_else(|| not_found(&loan.application_id))?;

        if stored.status != loan.status && !stored.status.can_transition_to(loan.status) {
            return Err(StoreError::InvalidTransition {
                from: stored.status,
                to: loan.status,
            });
        }

        *stored = loan.clone();
        Ok(())
    }

    async fn has_active_loan(&self, customer_number: &str) -> Result<bool> {
        Ok(self
            .tables
            .read()
            .await
            .loans
            .values()
            .any(|l| l.customer_number == customer_number && l.status.is_active()))
    }

    async fn get_or_create_subscription(
        &self,
        customer_number: &str,
    ) -> Result<(CustomerSubscription, bool)> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.subscriptions.get(customer_number) {
            return Ok((existing.clone(), false));
        }

        let subscription = CustomerSubscription::new(customer_number);
        tables
            .subscriptions
            .insert(customer_number.to_string(), subscription.clone());
        Ok((subscription, true))
    }

    async fn get_client_registration(&self) -> Result<Option<ClientRegistration>> {
        Ok(self.tables.read().await.registration.clone())
    }

    async fn put_client_registration(&self, registration: &ClientRegistration) -> Result<()> {
        self.tables.write().await.registration = Some(registration.clone());
        Ok(())
    }

    async fn record_repayment(&self, repayment: &LoanRepayment) -> Result<LoanApplication> {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let loan = tables
            .loans
            .get_mut(&repayment.application_id)
            .ok_or_else(|| not_found(&repayment.application_id))?;
        ensure_repayable(loan)?;

        tables.repayments.push(repayment.clone());
        let paid = tables
            .repayments
            .iter()
            .filter(|r| r.application_id == repayment.application_id)
            .map(|r| r.amount);

        let mut updated = loan.clone();
        settle_if_repaid(&mut updated, paid)?;
        updated.updated_at = Utc::now();
        *loan = updated.clone();
        Ok(updated)
    }

    async fn list_repayments(&self, application_id: &ApplicationId) -> Result<Vec<LoanRepayment>> {
        let tables = self.tables.read().await;
        let mut repayments: Vec<_> = tables
            .repayments
            .iter()
            .filter(|r| &r.application_id == application_id)
            .cloned()
            .collect();
        repayments.sort_by_key(|r| r.paid_at);
        Ok(repayments)
    }

    async fn replace_customer_transactions(
        &self,
        customer_number: &str,
        transactions: &[CustomerTransaction],
    ) -> Result<()> {
        self.tables
            .write()
            .await
            .transactions
            .insert(customer_number.to_string(), transactions.to_vec());
        Ok(())
    }

    async fn list_customer_transactions(
        &self,
        customer_number: &str,
    ) -> Result<Vec<CustomerTransaction>> {
        let tables = self.tables.read().await;
        let mut transactions = tables
            .transactions
            .get(customer_number)
            .cloned()
            .unwrap_or_default();
        transactions.sort_by_key(|t| t.timestamp);
        Ok(transactions)
    }
}
