//! Time-bounded lookup caches.
//!
//! Entries are never invalidated on write; they only age out. A loan status
//! read within the TTL of a previous read may therefore show the status as it
//! was before the decision was persisted.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use lending_core::{ApplicationId, CustomerKyc, CustomerTransaction, LoanStatusView};
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::config::CacheConfig;

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// A map whose entries expire a fixed time after insertion.
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, Entry<V>>>,
    ttl: Duration,
    max_entries: usize,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty cache.
    #[must_use]
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Get a live entry.
    pub async fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| e.inserted_at.elapsed() < self.ttl)
            .map(|e| e.value.clone())
    }

    /// Insert or replace an entry, restarting its TTL.
    pub async fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.write().await;

        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            let ttl = self.ttl;
            entries.retain(|_, e| e.inserted_at.elapsed() < ttl);

            if entries.len() >= self.max_entries {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, e)| e.inserted_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// The caches shared by the subscription manager, the customer directory and
/// the loan orchestrator.
pub struct LookupCache {
    /// KYC records by customer number.
    pub kyc: TtlCache<String, CustomerKyc>,
    /// Transaction histories by customer number.
    pub transactions: TtlCache<String, Vec<CustomerTransaction>>,
    /// Loan status projections by application id.
    pub loan_status: TtlCache<ApplicationId, LoanStatusView>,
}

impl LookupCache {
    /// Build the caches from configuration.
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            kyc: TtlCache::new(config.kyc_ttl, config.max_entries),
            transactions: TtlCache::new(config.transactions_ttl, config.max_entries),
            loan_status: TtlCache::new(config.loan_status_ttl, config.max_entries),
        }
    }
}
