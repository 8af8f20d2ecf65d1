//! Item routes

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::handlers::items;
use crate::state::AppState;

/// Create item routes
pub fn item_routes() -> Router<AppState> {
    Router::new()
        .route("/api/items", post(items::create_item))
        .route("/api/items", get(items::list_items))
        .route("/api/items/:id", get(items::get_item))
        .route("/api/items/:id", put(items::update_item))
        .route("/api/items/:id", delete(items::delete_item))
        .route("/api/items/:id/candidates", get(items::get_candidates))
}
