//! Notification service layer

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::PaginatedResponse;
use crate::notifications::model::{Notification, NotificationFilters, NotificationType};

/// Insert a notification inside an existing transaction.
///
/// Workflow code calls this directly so notifications commit or roll back
/// together with the status changes they describe.
pub async fn insert_notification(
    conn: &mut PgConnection,
    user_id: Uuid,
    notification_type: NotificationType,
    title: &str,
    message: &str,
    related_item_id: Option<Uuid>,
    related_trade_id: Option<Uuid>,
) -> Result<Notification, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO notifications (id, user_id, notification_type, title, message, related_item_id, related_trade_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(notification_type)
    .bind(title)
    .bind(message)
    .bind(related_item_id)
    .bind(related_trade_id)
    .fetch_one(conn)
    .await
}

#[derive(Clone)]
pub struct NotificationService {
    db_pool: PgPool,
}

impl NotificationService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Create and store a notification outside any workflow transaction.
    pub async fn notify(
        &self,
        user_id: Uuid,
        notification_type: NotificationType,
        title: &str,
        message: &str,
        related_item_id: Option<Uuid>,
        related_trade_id: Option<Uuid>,
    ) -> Result<Notification, ApiError> {
        let recipient: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await?;
        if recipient.is_none() {
            return Err(ApiError::NotFound("Recipient not found".to_string()));
        }

        let mut conn = self.db_pool.acquire().await?;
        let notification = insert_notification(
            &mut conn,
            user_id,
            notification_type,
            title,
            message,
            related_item_id,
            related_trade_id,
        )
        .await?;

        Ok(notification)
    }

    pub async fn list_notifications(
        &self,
        user_id: Uuid,
        filters: NotificationFilters,
    ) -> Result<PaginatedResponse<Notification>, ApiError> {
        let page = filters.page.unwrap_or(1).max(1);
        let limit = filters.limit.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * limit;

        let mut query_builder = sqlx::QueryBuilder::new("SELECT * FROM notifications WHERE user_id = ");
        let mut count_builder =
            sqlx::QueryBuilder::new("SELECT COUNT(*) FROM notifications WHERE user_id = ");

        query_builder.push_bind(user_id);
        count_builder.push_bind(user_id);

        if filters.unread_only.unwrap_or(false) {
            query_builder.push(" AND read = FALSE");
            count_builder.push(" AND read = FALSE");
        }

        let total_count: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.db_pool)
            .await?;

        query_builder.push(" ORDER BY created_at DESC LIMIT ");
        query_builder.push_bind(limit);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(offset);

        let notifications = query_builder
            .build_query_as::<Notification>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(PaginatedResponse {
            data: notifications,
            total: total_count,
            page,
            limit,
        })
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64, ApiError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read = FALSE")
                .bind(user_id)
                .fetch_one(&self.db_pool)
                .await?;

        Ok(count)
    }

    /// Mark one notification read. Recipient only; already-read is a no-op.
    pub async fn mark_read(
        &self,
        notification_id: Uuid,
        caller_id: Uuid,
    ) -> Result<Notification, ApiError> {
        let notification: Notification =
            sqlx::query_as("SELECT * FROM notifications WHERE id = $1")
                .bind(notification_id)
                .fetch_optional(&self.db_pool)
                .await?
                .ok_or(ApiError::NotFound("Notification not found".to_string()))?;

        if notification.user_id != caller_id {
            return Err(ApiError::Forbidden(
                "Only the recipient can mark a notification read".to_string(),
            ));
        }

        if notification.read {
            return Ok(notification);
        }

        let updated: Notification = sqlx::query_as(
            "UPDATE notifications SET read = TRUE WHERE id = $1 RETURNING *",
        )
        .bind(notification_id)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(updated)
    }

    /// Mark everything unread as read. Returns how many rows flipped.
    pub async fn mark_all_read(&self, caller_id: Uuid) -> Result<u64, ApiError> {
        let rows_affected =
            sqlx::query("UPDATE notifications SET read = TRUE WHERE user_id = $1 AND read = FALSE")
                .bind(caller_id)
                .execute(&self.db_pool)
                .await?
                .rows_affected();

        Ok(rows_affected)
    }
}
