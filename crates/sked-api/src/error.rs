//! API error handling
//!
//! Every failure leaves the API as a JSON `ApiError` body with a stable
//! machine-readable code.

use crate::auth::AuthError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn validation(details: impl Into<String>) -> Self {
        Self::new("VALIDATION", "Request validation failed").with_details(details)
    }

    pub fn unauthorized() -> Self {
        Self::new("UNAUTHORIZED", "User is not authorized")
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    DuplicateEmail(String),
    BadCredentials,
    InvalidActivationLink,
    Unauthorized,
    ServiceUnavailable(String),
    Internal(String),
    Database(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::Validation(details) => {
                (StatusCode::BAD_REQUEST, ApiError::validation(details))
            }
            AppError::DuplicateEmail(email) => (
                StatusCode::BAD_REQUEST,
                ApiError::new(
                    "DUPLICATE_EMAIL",
                    format!("User with email {email} already exists"),
                ),
            ),
            AppError::BadCredentials => (
                StatusCode::BAD_REQUEST,
                ApiError::new("BAD_CREDENTIALS", "Invalid email or password"),
            ),
            AppError::InvalidActivationLink => (
                StatusCode::BAD_REQUEST,
                ApiError::new("INVALID_ACTIVATION_LINK", "Invalid activation link"),
            ),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, ApiError::unauthorized()),
            AppError::ServiceUnavailable(msg) => {
                error!(error = %msg, "Service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ApiError::new("SERVICE_UNAVAILABLE", "Service temporarily unavailable"),
                )
            }
            AppError::Internal(msg) => {
                error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, ApiError::internal_error())
            }
            AppError::Database(msg) => {
                error!(error = %msg, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::new("DATABASE_ERROR", "Database operation failed"),
                )
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(msg) => AppError::Validation(msg),
            AuthError::DuplicateEmail(email) => AppError::DuplicateEmail(email),
            AuthError::BadCredentials => AppError::BadCredentials,
            AuthError::InvalidActivationLink => AppError::InvalidActivationLink,
            AuthError::Unauthorized => AppError::Unauthorized,
            err @ AuthError::Timeout(_) => AppError::ServiceUnavailable(err.to_string()),
            AuthError::Store(e) => AppError::Database(e.to_string()),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sked_core::StoreError;
    use std::time::Duration;

    fn status_of(err: AuthError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn test_auth_error_status_mapping() {
        assert_eq!(
            status_of(AuthError::Validation("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AuthError::DuplicateEmail("a@x.com".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(AuthError::BadCredentials), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(AuthError::InvalidActivationLink),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(AuthError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(AuthError::Timeout(Duration::from_secs(5))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(AuthError::Store(StoreError::DatabaseError("down".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_api_error_omits_empty_details() {
        let json = serde_json::to_value(ApiError::unauthorized()).unwrap();
        assert_eq!(json["code"], "UNAUTHORIZED");
        assert!(json.get("details").is_none());
    }
}
