//! Notification models and data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A notification delivered to exactly one user
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    /// Monotonic; set once by the recipient, never reverts
    pub read: bool,
    pub related_item_id: Option<Uuid>,
    pub related_trade_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Why a notification was sent
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "notification_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    /// Two proposals closed into a mutual match
    Match,
    /// Proposal lifecycle events (proposed, accepted, declined, completed)
    Trade,
    /// Housekeeping the platform did on the user's behalf
    System,
    /// Sent by an administrator
    Admin,
}

/// Query parameters for listing notifications
#[derive(Debug, Deserialize)]
pub struct NotificationFilters {
    pub unread_only: Option<bool>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}

/// Request DTO for the admin broadcast endpoint
#[derive(Debug, Deserialize, Validate)]
pub struct AdminNotificationRequest {
    pub user_id: Uuid,

    #[serde(rename = "type")]
    pub notification_type: NotificationType,

    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 2000, message = "Message must be 1-2000 characters"))]
    pub message: String,
}

impl AdminNotificationRequest {
    /// Workflow types are reserved for the trade engine.
    pub fn validate_type(&self) -> Result<(), String> {
        match self.notification_type {
            NotificationType::System | NotificationType::Admin => Ok(()),
            NotificationType::Match | NotificationType::Trade => {
                Err("Admin notifications must use type 'system' or 'admin'".to_string())
            }
        }
    }
}
