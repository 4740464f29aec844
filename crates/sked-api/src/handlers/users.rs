//! User listing handler

use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, Json};
use sked_core::UserPublic;
use std::sync::Arc;

/// List all accounts
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Public view of every account", body = [UserPublic]),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ApiError),
    )
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserPublic>>, AppError> {
    Ok(Json(state.auth.list_users().await?))
}
