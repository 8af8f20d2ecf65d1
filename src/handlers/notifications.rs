//! Notification HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use super::{AdminUser, AuthenticatedUser};
use crate::error::ApiError;
use crate::models::PaginatedResponse;
use crate::notifications::{AdminNotificationRequest, Notification, NotificationFilters};
use crate::state::AppState;

/// GET /api/notifications - The caller's notifications, newest first
pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(filters): Query<NotificationFilters>,
) -> Result<Json<PaginatedResponse<Notification>>, ApiError> {
    let notifications = state
        .notification_service
        .list_notifications(user.user_id, filters)
        .await?;

    Ok(Json(notifications))
}

/// GET /api/notifications/unread-count - Badge count for the caller
pub async fn unread_count(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let count = state.notification_service.unread_count(user.user_id).await?;

    Ok(Json(UnreadCountResponse { count }))
}

/// PUT /api/notifications/:id/read - Mark one notification read (recipient only)
pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Notification>, ApiError> {
    let notification = state
        .notification_service
        .mark_read(notification_id, user.user_id)
        .await?;

    Ok(Json(notification))
}

/// PUT /api/notifications/read-all - Mark every unread notification read
pub async fn mark_all_read(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<MarkAllReadResponse>, ApiError> {
    let updated = state.notification_service.mark_all_read(user.user_id).await?;

    Ok(Json(MarkAllReadResponse { updated }))
}

/// POST /api/admin/notifications - Send a notification to a user (admin only)
pub async fn admin_send_notification(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(req): Json<AdminNotificationRequest>,
) -> Result<(StatusCode, Json<Notification>), ApiError> {
    req.validate()?;
    req.validate_type().map_err(ApiError::ValidationError)?;

    let notification = state
        .notification_service
        .notify(
            req.user_id,
            req.notification_type,
            &req.title,
            &req.message,
            None,
            None,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(notification)))
}

#[derive(Serialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}

#[derive(Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}
