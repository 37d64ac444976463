//! Scoring engine API types.

use chrono::Utc;
use lending_core::ClientRegistration;
use serde::{Deserialize, Serialize};

/// Request body of `POST /client/createClient`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateClientRequest {
    /// Callback URL for transaction data.
    pub url: String,
    /// Service name.
    pub name: String,
    /// Basic-auth username for callbacks.
    pub username: String,
    /// Basic-auth password for callbacks.
    pub password: String,
}

/// Response of `POST /client/createClient`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateClientResponse {
    /// Assigned client id.
    pub id: i64,
    /// Registered callback URL.
    pub url: String,
    /// Registered name.
    pub name: String,
    /// Registered username.
    pub username: String,
    /// Registered password.
    pub password: String,
    /// Token to send as `client-token`.
    pub token: String,
}

impl From<CreateClientResponse> for ClientRegistration {
    fn from(response: CreateClientResponse) -> Self {
        Self {
            client_id: response.id,
            url: response.url,
            name: response.name,
            username: response.username,
            password: response.password,
            token: response.token,
            created_at: Utc::now(),
        }
    }
}

/// Response of `GET /scoring/initiateQueryScore/{customer}`.
#[derive(Debug, Clone, Deserialize)]
pub struct InitiateResponse {
    /// Scoring token, absent when the engine declined.
    #[serde(default)]
    pub token: Option<String>,
}

/// Error body returned by the scoring engine.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringErrorResponse {
    /// Error message.
    #[serde(default, alias = "message")]
    pub error: Option<String>,
}
