//! API route definitions

use crate::auth::access_guard;
use crate::handlers::{auth, users};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Create `/api` routes
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (refresh and logout authenticate through the cookie)
    let public_routes = Router::new()
        .route("/registration", post(auth::registration_handler))
        .route("/login", post(auth::login_handler))
        .route("/logout", post(auth::logout_handler))
        .route("/activate/:link", get(auth::activate_handler))
        .route("/refresh", get(auth::refresh_handler));

    // Protected routes (bearer access token required)
    let protected_routes = Router::new()
        .route("/users", get(users::list_users_handler))
        .route("/me", get(auth::me_handler))
        .route_layer(middleware::from_fn_with_state(state, access_guard));

    Router::new().merge(public_routes).merge(protected_routes)
}
