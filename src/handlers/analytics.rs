//! Analytics HTTP handlers

use axum::{extract::State, Json};

use super::AdminUser;
use crate::error::ApiError;
use crate::services::PlatformSummary;
use crate::state::AppState;

/// GET /api/analytics - Platform-wide counters (admin only)
pub async fn get_analytics(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<PlatformSummary>, ApiError> {
    let summary = state.analytics_service.platform_summary().await?;

    Ok(Json(summary))
}
