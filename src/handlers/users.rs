//! User profile HTTP handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::models::{UpdateProfileRequest, UserResponse};
use crate::state::AppState;

/// GET /api/users/:id - Public profile
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.user_service.get_user(user_id).await?;

    Ok(Json(user))
}

/// PUT /api/users/me - Update the caller's profile
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let updated = state.user_service.update_profile(user.user_id, req).await?;

    Ok(Json(updated))
}
