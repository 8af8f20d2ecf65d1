//! Platform analytics service

use serde::Serialize;
use sqlx::PgPool;

use crate::error::ApiError;

/// Platform-wide totals
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct PlatformSummary {
    pub total_users: i64,
    pub total_items: i64,
    pub available_items: i64,
    pub total_trades: i64,
    /// Trades that reached `accepted` or `completed`
    pub matched_trades: i64,
    pub completed_trades: i64,
}

#[derive(Clone)]
pub struct AnalyticsService {
    db_pool: PgPool,
}

impl AnalyticsService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// One-shot snapshot of platform totals
    pub async fn platform_summary(&self) -> Result<PlatformSummary, ApiError> {
        let summary: PlatformSummary = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS total_users,
                (SELECT COUNT(*) FROM items) AS total_items,
                (SELECT COUNT(*) FROM items WHERE status = 'available') AS available_items,
                (SELECT COUNT(*) FROM trades) AS total_trades,
                (SELECT COUNT(*) FROM trades WHERE status IN ('accepted', 'completed')) AS matched_trades,
                (SELECT COUNT(*) FROM trades WHERE status = 'completed') AS completed_trades
            "#,
        )
        .fetch_one(&self.db_pool)
        .await?;

        Ok(summary)
    }
}
