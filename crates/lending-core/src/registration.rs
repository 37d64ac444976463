//! This service's identity as registered with the scoring engine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registration returned by the scoring engine's `createClient` call.
///
/// Created once by the `register-client` bootstrap command and injected into
/// the orchestrator at start-up.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRegistration {
    /// Client id assigned by the scoring engine.
    pub client_id: i64,
    /// Callback URL the engine uses to fetch transaction data.
    pub url: String,
    /// Registered service name.
    pub name: String,
    /// Basic-auth username the engine presents on callbacks.
    pub username: String,
    /// Basic-auth password the engine presents on callbacks.
    pub password: String,
    /// Token sent as `client-token` on scoring calls.
    pub token: String,
    /// When the registration was stored.
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for ClientRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRegistration")
            .field("client_id", &self.client_id)
            .field("url", &self.url)
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("token", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}
