//! Authentication extractors.
//!
//! Protected endpoints use HTTP Basic authentication with the service
//! credentials. The scoring engine received the same credentials at client
//! registration and presents them when it calls back for transaction data.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::ApiError;
use crate::state::AppState;

/// A caller that presented the service's Basic-auth credentials.
#[derive(Debug, Clone)]
pub struct BasicAuth {
    /// The authenticated username.
    pub username: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for BasicAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let (username, password) = decode_basic(header).ok_or(ApiError::Unauthorized)?;

        if state.config.service_password.is_empty() {
            tracing::warn!("SERVICE_PASSWORD is not set - rejecting authenticated request");
            return Err(ApiError::Unauthorized);
        }

        // Both comparisons always run.
        let user_ok = constant_time_eq(&username, &state.config.service_username);
        let pass_ok = constant_time_eq(&password, &state.config.service_password);

        if !(user_ok & pass_ok) {
            tracing::debug!(username = %username, "Basic auth rejected");
            return Err(ApiError::Unauthorized);
        }

        Ok(BasicAuth { username })
    }
}

/// Decode an `Authorization: Basic ...` header into username and password.
fn decode_basic(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;

    Some((username.to_string(), password.to_string()))
}

/// Constant-time string comparison.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// Build an `Authorization` header value for the given credentials.
#[must_use]
pub fn basic_header(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}
