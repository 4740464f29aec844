//! Access guard for protected routes
//!
//! Extracts the bearer access token from the Authorization header and
//! validates it with the token issuer held in application state. On success
//! the decoded `SessionPayload` is attached to the request extensions, where
//! handlers read it with `Extension<SessionPayload>`.
//!
//! The session store is never consulted: access tokens stay valid until they
//! expire.

use super::jwt::TokenError;
use crate::audit::{audit_log, AuditEvent};
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use thiserror::Error;

/// Access guard rejections
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("Missing Authorization header")]
    MissingAuthHeader,

    #[error("Invalid Authorization header format")]
    InvalidAuthHeader,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] TokenError),
}

impl IntoResponse for GuardError {
    fn into_response(self) -> Response {
        let message = match self {
            GuardError::MissingAuthHeader => "Missing Authorization header",
            GuardError::InvalidAuthHeader => "Invalid Authorization header format",
            GuardError::InvalidToken(_) => "Invalid or expired token",
        };

        (
            StatusCode::UNAUTHORIZED,
            Json(ApiError::new("UNAUTHORIZED", message)),
        )
            .into_response()
    }
}

/// Extract the token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, GuardError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(GuardError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| GuardError::InvalidAuthHeader)?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or(GuardError::InvalidAuthHeader)?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(GuardError::InvalidAuthHeader);
    }

    Ok(token)
}

/// Middleware requiring a valid access token
///
/// # Usage
///
/// ```ignore
/// let protected = Router::new()
///     .route("/api/users", get(list_users))
///     .route_layer(middleware::from_fn_with_state(state.clone(), access_guard));
/// ```
pub async fn access_guard(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, GuardError> {
    let path = request.uri().path().to_string();

    let validated = bearer_token(request.headers()).and_then(|token| {
        state
            .auth
            .tokens()
            .validate_access_token(token)
            .map_err(GuardError::from)
    });

    let payload = match validated {
        Ok(payload) => payload,
        Err(e) => {
            audit_log(&AuditEvent::InvalidToken {
                path,
                reason: e.to_string(),
            });
            return Err(e);
        }
    };

    request.extensions_mut().insert(payload);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extracted() {
        let standard = headers("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&standard).unwrap(), "abc.def.ghi");

        let lowercase = headers("bearer abc");
        assert_eq!(bearer_token(&lowercase).unwrap(), "abc");
    }

    #[test]
    fn test_missing_header() {
        let empty = HeaderMap::new();
        let result = bearer_token(&empty);
        assert!(matches!(result, Err(GuardError::MissingAuthHeader)));
    }

    #[test]
    fn test_malformed_header() {
        for value in ["abc.def.ghi", "Basic dXNlcjpwYXNz", "Bearer ", "Bearer"] {
            let map = headers(value);
            let result = bearer_token(&map);
            assert!(
                matches!(result, Err(GuardError::InvalidAuthHeader)),
                "accepted {value:?}"
            );
        }
    }

    #[test]
    fn test_rejection_status() {
        let response = GuardError::MissingAuthHeader.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
