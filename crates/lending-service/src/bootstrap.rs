//! One-time registration of this service with the scoring engine.

use lending_core::ClientRegistration;
use lending_store::{Store, StoreError};

use crate::config::ServiceConfig;
use crate::scoring::{CreateClientRequest, ScoringClient, ScoringError};

/// Errors from the registration bootstrap.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// The registration could not be read or stored.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The scoring engine refused or could not be reached.
    #[error("scoring engine error: {0}")]
    Scoring(#[from] ScoringError),
}

/// Result of [`register_client`].
#[derive(Debug)]
pub enum Registration {
    /// A registration was already stored; nothing was sent.
    Existing(ClientRegistration),
    /// The scoring engine issued a new registration, now stored.
    Created(ClientRegistration),
}

/// Register with the scoring engine unless a registration is already stored.
///
/// The engine is given the transaction callback URL and the service
/// credentials it must present when calling back.
pub async fn register_client(
    store: &dyn Store,
    scoring: &ScoringClient,
    config: &ServiceConfig,
) -> Result<Registration, BootstrapError> {
    if let Some(existing) = store.get_client_registration().await? {
        tracing::warn!(
            client_id = existing.client_id,
            "Client registration already exists - not registering again"
        );
        return Ok(Registration::Existing(existing));
    }

    let request = CreateClientRequest {
        url: config.transactions_callback_url(),
        name: config.service_name.clone(),
        username: config.service_username.clone(),
        password: config.service_password.clone(),
    };

    let registration = scoring.register_client(&request).await?;
    store.put_client_registration(&registration).await?;

    tracing::info!(
        client_id = registration.client_id,
        callback_url = %registration.url,
        "Registered with scoring engine"
    );
    Ok(Registration::Created(registration))
}
