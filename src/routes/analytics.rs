//! Analytics routes

use axum::{routing::get, Router};

use crate::handlers::analytics;
use crate::state::AppState;

/// Create analytics routes
pub fn analytics_routes() -> Router<AppState> {
    Router::new().route("/api/analytics", get(analytics::get_analytics))
}
