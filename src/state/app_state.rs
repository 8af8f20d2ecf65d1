//! Application state shared across handlers

use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::AuthService;
use crate::items::ItemService;
use crate::notifications::NotificationService;
use crate::services::{AnalyticsService, UserService};
use crate::trades::TradeService;

use axum::extract::FromRef;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
    pub item_service: Arc<ItemService>,
    pub trade_service: Arc<TradeService>,
    pub notification_service: Arc<NotificationService>,
    pub analytics_service: Arc<AnalyticsService>,
}

impl AppState {
    pub fn new(
        db_pool: PgPool,
        auth_service: Arc<AuthService>,
        user_service: Arc<UserService>,
        item_service: Arc<ItemService>,
        trade_service: Arc<TradeService>,
        notification_service: Arc<NotificationService>,
        analytics_service: Arc<AnalyticsService>,
    ) -> Self {
        Self {
            db_pool,
            auth_service,
            user_service,
            item_service,
            trade_service,
            notification_service,
            analytics_service,
        }
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}

impl FromRef<AppState> for Arc<UserService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.user_service.clone()
    }
}

impl FromRef<AppState> for Arc<ItemService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.item_service.clone()
    }
}

impl FromRef<AppState> for Arc<TradeService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.trade_service.clone()
    }
}

impl FromRef<AppState> for Arc<NotificationService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.notification_service.clone()
    }
}

impl FromRef<AppState> for Arc<AnalyticsService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.analytics_service.clone()
    }
}
