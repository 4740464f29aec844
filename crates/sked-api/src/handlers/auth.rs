//! Authentication API handlers
//!
//! Register, login and refresh return the access token in the body and put
//! the refresh token in the `refreshToken` cookie. Logout and refresh read
//! the refresh token back from that cookie.

use crate::auth::{cookie, AuthResponse, LoginRequest, RegisterRequest};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use sked_core::SessionPayload;
use std::sync::Arc;
use utoipa::ToSchema;

/// Logout response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LogoutResponse {
    pub message: String,
}

/// Attach the refresh token cookie to an auth response
fn with_refresh_cookie(
    state: &AppState,
    response: AuthResponse,
) -> Result<impl IntoResponse, AppError> {
    let cookie = state
        .cookie
        .set(&response.auth.refresh_token)
        .ok_or_else(|| AppError::Internal("refresh token is not a valid cookie value".into()))?;

    Ok(([(header::SET_COOKIE, cookie)], Json(response)))
}

/// Register a new account
///
/// Creates an inactive account, mails its activation link, and opens the
/// first session.
#[utoipa::path(
    post,
    path = "/api/registration",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created, refresh token cookie set", body = AuthResponse),
        (status = 400, description = "Invalid input or email already registered", body = crate::error::ApiError),
        (status = 503, description = "Store unavailable", body = crate::error::ApiError),
    )
)]
pub async fn registration_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    let response = state.auth.register(request).await?;
    with_refresh_cookie(&state, response)
}

/// Login with email and password
///
/// Any earlier session of the account stops refreshing.
#[utoipa::path(
    post,
    path = "/api/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful, refresh token cookie set", body = AuthResponse),
        (status = 400, description = "Invalid email or password", body = crate::error::ApiError),
        (status = 503, description = "Store unavailable", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    let response = state.auth.login(request).await?;
    with_refresh_cookie(&state, response)
}

/// Logout
///
/// Revokes the session behind the refresh token cookie and clears the
/// cookie. Succeeds without a cookie too.
#[utoipa::path(
    post,
    path = "/api/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out, cookie cleared", body = LogoutResponse),
        (status = 503, description = "Store unavailable", body = crate::error::ApiError),
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let refresh_token = cookie::refresh_token(&headers);
    state.auth.logout(refresh_token.as_deref()).await?;

    Ok((
        [(header::SET_COOKIE, state.cookie.clear())],
        Json(LogoutResponse {
            message: "Logged out successfully".to_string(),
        }),
    ))
}

/// Activate an account from its mailed link
#[utoipa::path(
    get,
    path = "/api/activate/{link}",
    tag = "auth",
    params(
        ("link" = String, Path, description = "Activation link minted at registration")
    ),
    responses(
        (status = 303, description = "Activated, redirect to the client"),
        (status = 400, description = "Unknown activation link", body = crate::error::ApiError),
    )
)]
pub async fn activate_handler(
    State(state): State<Arc<AppState>>,
    Path(link): Path<String>,
) -> Result<Redirect, AppError> {
    state.auth.activate(&link).await?;
    Ok(Redirect::to(&state.config.mail.client_url))
}

/// Rotate the refresh token
///
/// The presented refresh token stops working once this succeeds.
#[utoipa::path(
    get,
    path = "/api/refresh",
    tag = "auth",
    responses(
        (status = 200, description = "New token pair, rotated cookie set", body = AuthResponse),
        (status = 401, description = "Missing, invalid, expired or superseded refresh token", body = crate::error::ApiError),
    )
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let refresh_token = cookie::refresh_token(&headers);
    let response = state.auth.refresh(refresh_token.as_deref()).await?;
    with_refresh_cookie(&state, response)
}

/// Identity carried by the presented access token
#[utoipa::path(
    get,
    path = "/api/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Session payload", body = SessionPayload),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ApiError),
    )
)]
pub async fn me_handler(Extension(payload): Extension<SessionPayload>) -> Json<SessionPayload> {
    Json(payload)
}
