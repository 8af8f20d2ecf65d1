//! Notification routes

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handlers::notifications;
use crate::state::AppState;

/// Create notification routes
pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", get(notifications::list_notifications))
        .route(
            "/api/notifications/unread-count",
            get(notifications::unread_count),
        )
        .route(
            "/api/notifications/read-all",
            put(notifications::mark_all_read),
        )
        .route("/api/notifications/:id/read", put(notifications::mark_read))
        .route(
            "/api/admin/notifications",
            post(notifications::admin_send_notification),
        )
}
