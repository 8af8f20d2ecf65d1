//! Item models and data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub use super::lifecycle::ItemStatus;

/// A listed item
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub condition: ItemCondition,
    pub category: String,
    /// Ordered image URIs; binary storage and delivery are external
    pub images: Vec<String>,
    pub owner_id: Uuid,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Physical condition of a listed item
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "item_condition", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ItemCondition {
    New,
    LikeNew,
    Excellent,
    VeryGood,
    Good,
    Fair,
    Poor,
}

/// Request DTO for listing a new item
#[derive(Debug, Deserialize, Validate)]
pub struct CreateItemRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 2000, message = "Description must be 1-2000 characters"))]
    pub description: String,

    pub condition: ItemCondition,

    #[validate(length(min = 1, max = 50, message = "Category must be 1-50 characters"))]
    pub category: String,

    pub images: Vec<String>,
}

impl CreateItemRequest {
    /// Validate the image list against the configured maximum.
    ///
    /// The bound is config-driven, so it lives here instead of in the
    /// derive attributes.
    pub fn validate_images(&self, max_images: usize) -> Result<(), String> {
        validate_image_count(&self.images, max_images)
    }
}

/// Image count bounds, shared by create and update paths.
pub fn validate_image_count(images: &[String], max_images: usize) -> Result<(), String> {
    if images.is_empty() {
        return Err("At least one image is required".to_string());
    }
    if images.len() > max_images {
        return Err(format!("At most {} images are allowed", max_images));
    }
    Ok(())
}

/// Request DTO for editing an item's descriptive fields.
///
/// Status is deliberately absent; only the trade workflow and the delete
/// endpoint move items through the lifecycle.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateItemRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 2000, message = "Description must be 1-2000 characters"))]
    pub description: Option<String>,

    pub condition: Option<ItemCondition>,

    #[validate(length(min = 1, max = 50, message = "Category must be 1-50 characters"))]
    pub category: Option<String>,

    pub images: Option<Vec<String>>,
}

/// Query parameters for listing items
#[derive(Debug, Deserialize)]
pub struct ItemFilters {
    pub status: Option<ItemStatus>,
    pub category: Option<String>,
    pub owner_id: Option<Uuid>,
    /// Case-insensitive substring match on name and description
    pub search: Option<String>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}
