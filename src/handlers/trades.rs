//! Trade HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::models::PaginatedResponse;
use crate::state::AppState;
use crate::trades::{ProposeTradeRequest, ProposeTradeResponse, Trade, TradeFilters};

/// POST /api/trades - Propose a trade (may settle a mutual match)
pub async fn propose_trade(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<ProposeTradeRequest>,
) -> Result<(StatusCode, Json<ProposeTradeResponse>), ApiError> {
    let outcome = state.trade_service.propose_trade(user.user_id, req).await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

/// GET /api/trades - The caller's trades, filterable by side and status
pub async fn list_trades(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(filters): Query<TradeFilters>,
) -> Result<Json<PaginatedResponse<Trade>>, ApiError> {
    let trades = state.trade_service.list_trades(user.user_id, filters).await?;

    Ok(Json(trades))
}

/// GET /api/trades/:id - Fetch a single trade (parties only)
pub async fn get_trade(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(trade_id): Path<Uuid>,
) -> Result<Json<Trade>, ApiError> {
    let trade = state.trade_service.get_trade(trade_id, user.user_id).await?;

    Ok(Json(trade))
}

/// PUT /api/trades/:id/accept - Accept a pending proposal (responder only)
pub async fn accept_trade(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(trade_id): Path<Uuid>,
) -> Result<Json<Trade>, ApiError> {
    let trade = state
        .trade_service
        .accept_trade(trade_id, user.user_id)
        .await?;

    Ok(Json(trade))
}

/// PUT /api/trades/:id/reject - Decline a pending proposal (responder only)
pub async fn reject_trade(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(trade_id): Path<Uuid>,
) -> Result<Json<Trade>, ApiError> {
    let trade = state
        .trade_service
        .reject_trade(trade_id, user.user_id)
        .await?;

    Ok(Json(trade))
}

/// PUT /api/trades/:id/complete - Confirm the swap happened (either party)
pub async fn complete_trade(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(trade_id): Path<Uuid>,
) -> Result<Json<Trade>, ApiError> {
    let trade = state
        .trade_service
        .complete_trade(trade_id, user.user_id)
        .await?;

    Ok(Json(trade))
}
