//! OpenAPI document
//!
//! Generated with utoipa and served as JSON at `/api-docs/openapi.json`.
//! New endpoints need a `#[utoipa::path]` annotation on the handler and an
//! entry in `paths(...)` below.

use crate::auth::{AuthResponse, LoginRequest, RegisterRequest};
use crate::error::ApiError;
use crate::handlers::{auth::LogoutResponse, health::HealthResponse, health::ReadinessResponse};
use axum::Json;
use sked_core::{SessionPayload, TokenPair, UserPublic};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// sked API document
#[derive(OpenApi)]
#[openapi(
    info(
        title = "sked Accounts API",
        description = r#"
Account registration, email activation, and session management.

The access token is returned in the response body and must be sent back as
`Authorization: Bearer <token>` on protected endpoints. The refresh token
travels only in the httpOnly `refreshToken` cookie and is rotated on every
refresh.
"#,
    ),
    tags(
        (name = "health", description = "Liveness and readiness"),
        (name = "auth", description = "Registration, activation, login, logout, refresh"),
        (name = "users", description = "Account listing")
    ),
    modifiers(&SecurityAddon),
    components(
        schemas(
            ApiError,
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            TokenPair,
            UserPublic,
            SessionPayload,
            LogoutResponse,
            HealthResponse,
            ReadinessResponse,
        )
    ),
    paths(
        crate::handlers::health::health_check,
        crate::handlers::health::readiness_check,
        crate::handlers::auth::registration_handler,
        crate::handlers::auth::login_handler,
        crate::handlers::auth::logout_handler,
        crate::handlers::auth::activate_handler,
        crate::handlers::auth::refresh_handler,
        crate::handlers::auth::me_handler,
        crate::handlers::users::list_users_handler,
    )
)]
pub struct ApiDoc;

/// Registers the bearer scheme referenced by protected paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Serve the OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_valid() {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_string_pretty(&spec).unwrap();

        assert!(json.contains("sked Accounts API"));
        assert!(json.contains("/api/registration"));
        assert!(json.contains("/api/login"));
        assert!(json.contains("/api/logout"));
        assert!(json.contains("/api/activate/{link}"));
        assert!(json.contains("/api/refresh"));
        assert!(json.contains("/api/users"));
        assert!(json.contains("/health"));
    }

    #[test]
    fn test_openapi_contains_schemas() {
        let json = serde_json::to_string(&ApiDoc::openapi()).unwrap();

        assert!(json.contains("AuthResponse"));
        assert!(json.contains("UserPublic"));
        assert!(json.contains("ApiError"));
        assert!(json.contains("bearer_auth"));
    }
}
