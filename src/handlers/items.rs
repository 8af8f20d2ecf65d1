//! Item HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::items::{CreateItemRequest, Item, ItemFilters, UpdateItemRequest};
use crate::models::{PaginatedResponse, PaginationParams};
use crate::state::AppState;

/// POST /api/items - List a new item
pub async fn create_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    let item = state.item_service.create_item(user.user_id, req).await?;

    Ok((StatusCode::CREATED, Json(item)))
}

/// GET /api/items - Browse items with filters
pub async fn list_items(
    State(state): State<AppState>,
    Query(filters): Query<ItemFilters>,
) -> Result<Json<PaginatedResponse<Item>>, ApiError> {
    let items = state.item_service.list_items(filters).await?;

    Ok(Json(items))
}

/// GET /api/items/:id - Fetch a single item
pub async fn get_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<Item>, ApiError> {
    let item = state.item_service.get_item(item_id).await?;

    Ok(Json(item))
}

/// PUT /api/items/:id - Edit an item's descriptive fields (owner only)
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(item_id): Path<Uuid>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<Item>, ApiError> {
    let item = state
        .item_service
        .update_item(item_id, user.user_id, req)
        .await?;

    Ok(Json(item))
}

/// DELETE /api/items/:id - Withdraw a listing (owner only)
pub async fn delete_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(item_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.item_service.remove_item(item_id, user.user_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/items/:id/candidates - Swipe feed for one of the caller's items
pub async fn get_candidates(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(item_id): Path<Uuid>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<Item>>, ApiError> {
    let candidates = state
        .item_service
        .get_candidates(item_id, user.user_id, pagination)
        .await?;

    Ok(Json(candidates))
}
