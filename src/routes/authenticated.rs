use crate::{AppState, handlers::users};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router
///
/// Caller-scoped endpoints. `create_router` wraps this router in
/// `auth_middleware`, so every handler here sees a resolved, active `AuthUser`.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users/me", get(users::get_me).put(users::update_me))
        .route("/api/users/me/verify-email-complete", post(users::verify_email_complete))
}

/// Token Router
///
/// Needs a valid token but no local account yet: this is where the account
/// gets created.
pub fn token_routes() -> Router<AppState> {
    Router::new().route("/api/users", post(users::create_user))
}
