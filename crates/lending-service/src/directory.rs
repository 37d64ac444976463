//! Customer data lookups: cache first, then CBS.
//!
//! CBS failures are logged and reported as "no data". Callers cannot tell a
//! timeout from an unknown customer, and do not need to.

use std::sync::Arc;

use lending_core::{CustomerKyc, CustomerTransaction};
use lending_store::Store;
use tracing::{debug, warn};

use crate::cache::LookupCache;
use crate::cbs::CbsClient;

/// Where a transaction history was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionSource {
    /// Lookup cache.
    Cache,
    /// Live CBS call.
    Cbs,
    /// Last set materialized in the store.
    Store,
}

/// Front for customer KYC and transaction data.
#[derive(Clone)]
pub struct CustomerDirectory {
    cbs: Option<Arc<CbsClient>>,
    cache: Arc<LookupCache>,
    store: Arc<dyn Store>,
}

impl CustomerDirectory {
    /// Create a new directory.
    #[must_use]
    pub fn new(
        cbs: Option<Arc<CbsClient>>,
        cache: Arc<LookupCache>,
        store: Arc<dyn Store>,
    ) -> Self {
        Self { cbs, cache, store }
    }

    /// KYC data for a customer, or `None` if CBS has none or cannot be reached.
    pub async fn kyc(&self, customer_number: &str) -> Option<CustomerKyc> {
        if let Some(kyc) = self.cache.kyc.get(&customer_number.to_string()).await {
            debug!(customer_number = %customer_number, "KYC cache hit");
            return Some(kyc);
        }

        let cbs = self.cbs.as_ref()?;
        match cbs.get_customer_kyc(customer_number).await {
            Ok(Some(kyc)) => {
                self.cache
                    .kyc
                    .insert(customer_number.to_string(), kyc.clone())
                    .await;
                Some(kyc)
            }
            Ok(None) => {
                debug!(customer_number = %customer_number, "CBS has no KYC record");
                None
            }
            Err(e) => {
                warn!(customer_number = %customer_number, error = %e, "CBS KYC lookup failed");
                None
            }
        }
    }

    /// Transaction history for a customer.
    ///
    /// Fresh CBS data replaces the materialized copy in the store. When CBS
    /// yields nothing the materialized copy is served instead. An empty list
    /// means no data anywhere.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub async fn transactions(
        &self,
        customer_number: &str,
    ) -> lending_store::Result<(Vec<CustomerTransaction>, TransactionSource)> {
        let key = customer_number.to_string();

        if let Some(transactions) = self.cache.transactions.get(&key).await {
            debug!(customer_number = %customer_number, "Transactions cache hit");
            return Ok((transactions, TransactionSource::Cache));
        }

        if let Some(transactions) = self.fetch_transactions(customer_number).await {
            self.store
                .replace_customer_transactions(customer_number, &transactions)
                .await?;
            self.cache.transactions.insert(key, transactions.clone()).await;
            return Ok((transactions, TransactionSource::Cbs));
        }

        let stored = self.store.list_customer_transactions(customer_number).await?;
        Ok((stored, TransactionSource::Store))
    }

    async fn fetch_transactions(&self, customer_number: &str) -> Option<Vec<CustomerTransaction>> {
        let cbs = self.cbs.as_ref()?;
        match cbs.get_customer_transactions(customer_number).await {
            Ok(found) => found,
            Err(e) => {
                warn!(
                    customer_number = %customer_number,
                    error = %e,
                    "CBS transaction lookup failed"
                );
                None
            }
        }
    }
}
