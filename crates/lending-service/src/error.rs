//! API error types and responses.

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use lending_core::LendingError;
use serde::Serialize;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The customer already has a non-terminal loan.
    #[error("customer {customer_number} has an active loan application")]
    DuplicateActiveLoan {
        /// The customer holding the active loan.
        customer_number: String,
    },

    /// A dependency this operation needs is not configured.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error.
    #[error("external service error: {0}")]
    ExternalService(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::DuplicateActiveLoan { customer_number } => (
                StatusCode::BAD_REQUEST,
                "duplicate_active_loan",
                "Customer has an active loan application".to_string(),
                Some(serde_json::json!({ "customer_number": customer_number })),
            ),
            Self::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg.clone(),
                None,
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            Self::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                "external_service_error",
                msg.clone(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        if matches!(self, Self::Unauthorized) {
            return (
                status,
                [(header::WWW_AUTHENTICATE, r#"Basic realm="lending""#)],
                Json(body),
            )
                .into_response();
        }

        (status, Json(body)).into_response()
    }
}

impl From<LendingError> for ApiError {
    fn from(err: LendingError) -> Self {
        match err {
            LendingError::Validation(msg) => Self::BadRequest(msg),
            LendingError::DuplicateActiveLoan { customer_number } => {
                Self::DuplicateActiveLoan { customer_number }
            }
            LendingError::CustomerNotFound { .. } => {
                Self::NotFound("Customer not found in CBS".into())
            }
            LendingError::LoanNotFound { .. } => {
                Self::NotFound("Loan application not found".into())
            }
            LendingError::ScoringNotConfigured => {
                Self::ServiceUnavailable("Scoring engine is not configured".into())
            }
            LendingError::ScoringInitiation { .. } => {
                Self::ExternalService("Failed to initiate scoring".into())
            }
            err @ LendingError::InvalidTransition { .. } => Self::BadRequest(err.to_string()),
            LendingError::Storage(msg) => Self::Internal(msg),
        }
    }
}

impl From<lending_store::StoreError> for ApiError {
    fn from(err: lending_store::StoreError) -> Self {
        LendingError::from(err).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// JSON body extractor whose rejection is a 400 in the service's error format.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use lending_core::LoanStatus;

    fn status_of(err: LendingError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn lending_errors_map_to_documented_statuses() {
        assert_eq!(
            status_of(LendingError::Validation("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(LendingError::DuplicateActiveLoan {
                customer_number: "1".into()
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(LendingError::CustomerNotFound {
                customer_number: "1".into()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(LendingError::LoanNotFound {
                application_id: "1".into()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(LendingError::ScoringNotConfigured),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(LendingError::ScoringInitiation {
                customer_number: "1".into()
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(LendingError::InvalidTransition {
                from: LoanStatus::Rejected,
                to: LoanStatus::Repaid
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(LendingError::Storage("disk full".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unauthorized_carries_challenge() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }
}
