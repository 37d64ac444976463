//! Application state.

use std::sync::Arc;

use lending_core::ClientRegistration;
use lending_store::Store;

use crate::cache::LookupCache;
use crate::cbs::CbsClient;
use crate::config::ServiceConfig;
use crate::directory::CustomerDirectory;
use crate::orchestrator::{LoanOrchestrator, RetryPolicy};
use crate::scoring::ScoringClient;
use crate::subscription::SubscriptionManager;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// KYC and transaction lookups.
    pub directory: CustomerDirectory,

    /// Customer onboarding.
    pub subscriptions: SubscriptionManager,

    /// Loan workflow.
    pub orchestrator: LoanOrchestrator,
}

impl AppState {
    /// Create a new application state.
    ///
    /// `registration` is the scoring engine client registration loaded at
    /// start-up. Without it loan requests fail with "scoring not configured".
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        config: ServiceConfig,
        registration: Option<ClientRegistration>,
    ) -> Self {
        let cache = Arc::new(LookupCache::new(&config.cache));

        // Create CBS client if either endpoint is configured
        let cbs = if config.cbs.kyc_url.is_some() || config.cbs.transactions_url.is_some() {
            match CbsClient::new(&config.cbs) {
                Ok(client) => {
                    tracing::info!(
                        kyc_url = ?config.cbs.kyc_url,
                        transactions_url = ?config.cbs.transactions_url,
                        "CBS integration enabled"
                    );
                    Some(Arc::new(client))
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create CBS client");
                    None
                }
            }
        } else {
            None
        };

        if cbs.is_none() {
            tracing::warn!("CBS not configured - customers cannot be verified");
        }

        // Create scoring client if configured
        let scoring = config.scoring.base_url.as_ref().and_then(|url| {
            match ScoringClient::new(&config.scoring) {
                Ok(client) => {
                    tracing::info!(scoring_url = %url, "Scoring integration enabled");
                    Some(Arc::new(client))
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create scoring client");
                    None
                }
            }
        });

        if scoring.is_none() {
            tracing::warn!("Scoring engine not configured - loan requests will fail");
        }

        match &registration {
            Some(reg) => tracing::info!(client_id = reg.client_id, "Scoring client registration loaded"),
            None => tracing::warn!(
                "No scoring client registration - run `lending-service register-client`"
            ),
        }

        let directory = CustomerDirectory::new(cbs, cache.clone(), store.clone());
        let subscriptions = SubscriptionManager::new(directory.clone(), store.clone());
        let orchestrator = LoanOrchestrator::new(
            store.clone(),
            scoring,
            registration,
            config.policy.clone(),
            RetryPolicy::from(&config.scoring),
            cache,
        );

        Self {
            store,
            config,
            directory,
            subscriptions,
            orchestrator,
        }
    }

    /// Check if loan requests can be scored.
    #[must_use]
    pub fn has_scoring(&self) -> bool {
        self.orchestrator.is_scoring_configured()
    }
}
