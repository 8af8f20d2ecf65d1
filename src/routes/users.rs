//! User profile routes

use axum::{
    routing::{get, put},
    Router,
};

use crate::handlers::users;
use crate::state::AppState;

/// Create user routes
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users/me", put(users::update_profile))
        .route("/api/users/:id", get(users::get_user))
}
