//! Scoring engine HTTP client.

use lending_core::{ClientRegistration, ScoreReport};
use reqwest::{Client, StatusCode};

use super::types::{CreateClientRequest, CreateClientResponse, InitiateResponse, ScoringErrorResponse};
use crate::config::ScoringConfig;

/// Header carrying the registration token on scoring calls.
pub const CLIENT_TOKEN_HEADER: &str = "client-token";

/// Error type for scoring engine operations.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    /// HTTP request failed (including timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Scoring engine returned an error.
    #[error("Scoring API error: {status} - {error}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message.
        error: String,
    },

    /// Base URL not configured.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Scoring engine client.
#[derive(Debug, Clone)]
pub struct ScoringClient {
    client: Client,
    base_url: String,
}

impl ScoringClient {
    /// Create a new scoring client.
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL is configured or the HTTP client cannot be built.
    pub fn new(config: &ScoringConfig) -> Result<Self, ScoringError> {
        let base_url = config
            .base_url
            .as_deref()
            .ok_or_else(|| ScoringError::Configuration("SCORING_BASE_URL is not set".into()))?;

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Register this service with the scoring engine.
    pub async fn register_client(
        &self,
        request: &CreateClientRequest,
    ) -> Result<ClientRegistration, ScoringError> {
        let url = format!("{}/client/createClient", self.base_url);

        let response = self.client.post(&url).json(request).send().await?;

        Self::handle_response::<CreateClientResponse>(response)
            .await
            .map(Into::into)
    }

    /// Start a scoring run for a customer. `None` means the engine declined.
    pub async fn initiate_scoring(
        &self,
        customer_number: &str,
        client_token: &str,
    ) -> Result<Option<String>, ScoringError> {
        let url = format!("{}/scoring/initiateQueryScore/{customer_number}", self.base_url);

        let response = self
            .client
            .get(&url)
            .header(CLIENT_TOKEN_HEADER, client_token)
            .send()
            .await?;

        let body = Self::handle_response::<InitiateResponse>(response).await?;
        Ok(body.token.filter(|t| !t.trim().is_empty()))
    }

    /// Fetch the result of a scoring run. `None` means no result yet.
    pub async fn query_score(
        &self,
        token: &str,
        client_token: &str,
    ) -> Result<Option<ScoreReport>, ScoringError> {
        let url = format!("{}/scoring/queryScore/{token}", self.base_url);

        let response = self
            .client
            .get(&url)
            .header(CLIENT_TOKEN_HEADER, client_token)
            .send()
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let report = Self::handle_response::<Option<ScoreReport>>(response).await?;
        Ok(report.filter(|r| *r != ScoreReport::default()))
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ScoringError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let error = response
            .json::<ScoringErrorResponse>()
            .await
            .ok()
            .and_then(|body| body.error)
            .unwrap_or_else(|| format!("HTTP {status}"));

        Err(ScoringError::Api {
            status: status.as_u16(),
            error,
        })
    }
}
