//! Authentication HTTP handlers

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};
use validator::Validate;

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::middleware::client_ip;
use crate::models::{
    AuthTokensResponse, LoginRequest, RefreshTokenRequest, RegisterRequest, UserResponse,
};
use crate::state::AppState;

/// Client context recorded on the session row
fn request_meta(headers: &HeaderMap) -> (Option<String>, Option<String>) {
    let ip = client_ip(headers);
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    (ip, user_agent)
}

/// POST /api/auth/register - Create an account and issue tokens
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthTokensResponse>), ApiError> {
    req.validate()?;

    let (ip, user_agent) = request_meta(&headers);
    let tokens = state.auth_service.register(req, None, ip, user_agent).await?;

    Ok((StatusCode::CREATED, Json(tokens)))
}

/// POST /api/auth/login - Verify credentials and issue tokens
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthTokensResponse>, ApiError> {
    let (ip, user_agent) = request_meta(&headers);
    let tokens = state.auth_service.login(req, None, ip, user_agent).await?;

    Ok(Json(tokens))
}

/// POST /api/auth/refresh - Rotate the refresh token and mint a new pair
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<Json<AuthTokensResponse>, ApiError> {
    let tokens = state.auth_service.refresh_tokens(&req.refresh_token).await?;

    Ok(Json(tokens))
}

/// POST /api/auth/logout - Revoke current session
pub async fn logout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<StatusCode, ApiError> {
    state.auth_service.revoke_session(&user.jti).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/auth/logout-all - Revoke every session for the caller
pub async fn logout_all(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<LogoutAllResponse>, ApiError> {
    let revoked_count = state.auth_service.revoke_all_sessions(user.user_id).await?;

    Ok(Json(LogoutAllResponse {
        revoked_sessions: revoked_count,
    }))
}

/// GET /api/auth/me - Get current authenticated user
pub async fn get_current_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.auth_service.get_user_by_id(user.user_id).await?;

    Ok(Json(user.into()))
}

#[derive(Debug, serde::Serialize)]
pub struct LogoutAllResponse {
    pub revoked_sessions: u64,
}
