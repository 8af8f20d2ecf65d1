//! Item service layer - listing management and the swipe candidate feed

use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::items::lifecycle::{self, ItemStatus};
use crate::items::model::{CreateItemRequest, Item, ItemFilters, UpdateItemRequest};
use crate::models::{PaginatedResponse, PaginationParams};
use crate::services::UserService;

#[derive(Clone)]
pub struct ItemService {
    db_pool: PgPool,
    max_images: usize,
}

impl ItemService {
    pub fn new(db_pool: PgPool, max_images: usize) -> Self {
        Self {
            db_pool,
            max_images,
        }
    }

    /// List a new item. The owner's listing stats update in the same
    /// transaction as the insert.
    pub async fn create_item(
        &self,
        owner_id: Uuid,
        request: CreateItemRequest,
    ) -> Result<Item, ApiError> {
        request.validate()?;
        request
            .validate_images(self.max_images)
            .map_err(ApiError::ValidationError)?;

        let mut tx = self.db_pool.begin().await?;

        let item = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (id, name, description, condition, category, images, owner_id, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.name.trim())
        .bind(request.description.trim())
        .bind(request.condition)
        .bind(request.category.trim())
        .bind(&request.images)
        .bind(owner_id)
        .bind(ItemStatus::Available)
        .fetch_one(&mut *tx)
        .await?;

        UserService::record_listing(&mut tx, owner_id).await?;

        tx.commit().await?;

        tracing::info!(item_id = %item.id, owner_id = %owner_id, "Item listed");

        Ok(item)
    }

    pub async fn get_item(&self, item_id: Uuid) -> Result<Item, ApiError> {
        sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1")
            .bind(item_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or(ApiError::NotFound("Item not found".to_string()))
    }

    pub async fn list_items(&self, filters: ItemFilters) -> Result<PaginatedResponse<Item>, ApiError> {
        let page = filters.page.unwrap_or(1).max(1);
        let limit = filters.limit.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * limit;

        let mut query_builder = sqlx::QueryBuilder::new("SELECT * FROM items WHERE 1=1");
        let mut count_builder = sqlx::QueryBuilder::new("SELECT COUNT(*) FROM items WHERE 1=1");

        if let Some(status) = filters.status {
            query_builder.push(" AND status = ");
            query_builder.push_bind(status);
            count_builder.push(" AND status = ");
            count_builder.push_bind(status);
        }

        if let Some(owner_id) = filters.owner_id {
            query_builder.push(" AND owner_id = ");
            query_builder.push_bind(owner_id);
            count_builder.push(" AND owner_id = ");
            count_builder.push_bind(owner_id);
        }

        if let Some(category) = &filters.category {
            query_builder.push(" AND category = ");
            query_builder.push_bind(category.clone());
            count_builder.push(" AND category = ");
            count_builder.push_bind(category.clone());
        }

        if let Some(search) = &filters.search {
            let pattern = format!("%{}%", search);
            query_builder.push(" AND (name ILIKE ");
            query_builder.push_bind(pattern.clone());
            query_builder.push(" OR description ILIKE ");
            query_builder.push_bind(pattern.clone());
            query_builder.push(")");
            count_builder.push(" AND (name ILIKE ");
            count_builder.push_bind(pattern.clone());
            count_builder.push(" OR description ILIKE ");
            count_builder.push_bind(pattern);
            count_builder.push(")");
        }

        let total_count: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.db_pool)
            .await?;

        query_builder.push(" ORDER BY created_at DESC LIMIT ");
        query_builder.push_bind(limit);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(offset);

        let items = query_builder
            .build_query_as::<Item>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(PaginatedResponse {
            data: items,
            total: total_count,
            page,
            limit,
        })
    }

    /// Edit an item's descriptive fields. Owner only, and only while the
    /// item is still available; the lifecycle is never touched here.
    pub async fn update_item(
        &self,
        item_id: Uuid,
        caller_id: Uuid,
        request: UpdateItemRequest,
    ) -> Result<Item, ApiError> {
        request.validate()?;
        if let Some(images) = &request.images {
            super::model::validate_image_count(images, self.max_images)
                .map_err(ApiError::ValidationError)?;
        }

        let mut tx = self.db_pool.begin().await?;

        let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1 FOR UPDATE")
            .bind(item_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ApiError::NotFound("Item not found".to_string()))?;

        if item.owner_id != caller_id {
            return Err(ApiError::Forbidden(
                "Only the owner can edit an item".to_string(),
            ));
        }

        if item.status != ItemStatus::Available {
            return Err(ApiError::InvalidState(format!(
                "Only available items can be edited (current status: {})",
                item.status.as_str()
            )));
        }

        let updated = sqlx::query_as::<_, Item>(
            r#"
            UPDATE items
            SET name = COALESCE($1, name),
                description = COALESCE($2, description),
                condition = COALESCE($3, condition),
                category = COALESCE($4, category),
                images = COALESCE($5, images),
                updated_at = NOW()
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(request.name)
        .bind(request.description)
        .bind(request.condition)
        .bind(request.category)
        .bind(request.images)
        .bind(item_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// Withdraw a listing. Owner only; available items only.
    pub async fn remove_item(&self, item_id: Uuid, caller_id: Uuid) -> Result<(), ApiError> {
        let item = self.get_item(item_id).await?;

        if item.owner_id != caller_id {
            return Err(ApiError::Forbidden(
                "Only the owner can remove an item".to_string(),
            ));
        }

        let mut conn = self.db_pool.acquire().await?;
        let removed =
            lifecycle::transition(&mut conn, item_id, ItemStatus::Available, ItemStatus::Removed)
                .await?;

        if !removed {
            return Err(ApiError::InvalidState(format!(
                "Only available items can be removed (current status: {})",
                item.status.as_str()
            )));
        }

        tracing::info!(item_id = %item_id, "Item removed");

        Ok(())
    }

    /// Candidate feed for the swipe flow: other users' available items,
    /// minus the ones this item already has a live proposal against.
    /// Inbound proposals surface through notifications, not the feed; a
    /// direct propose against one still settles as a match.
    pub async fn get_candidates(
        &self,
        item_id: Uuid,
        caller_id: Uuid,
        pagination: PaginationParams,
    ) -> Result<PaginatedResponse<Item>, ApiError> {
        let source = self.get_item(item_id).await?;

        if source.owner_id != caller_id {
            return Err(ApiError::Forbidden(
                "Only the owner can browse candidates for an item".to_string(),
            ));
        }

        let page = pagination.page.unwrap_or(1).max(1);
        let limit = pagination.limit.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * limit;

        let total_count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM items i
            WHERE i.status = 'available'
              AND i.owner_id <> $1
              AND NOT EXISTS (
                  SELECT 1 FROM trades t
                  WHERE t.offered_item_id = $2
                    AND t.requested_item_id = i.id
                    AND t.status = 'pending'
              )
            "#,
        )
        .bind(caller_id)
        .bind(item_id)
        .fetch_one(&self.db_pool)
        .await?;

        let candidates = sqlx::query_as::<_, Item>(
            r#"
            SELECT i.*
            FROM items i
            WHERE i.status = 'available'
              AND i.owner_id <> $1
              AND NOT EXISTS (
                  SELECT 1 FROM trades t
                  WHERE t.offered_item_id = $2
                    AND t.requested_item_id = i.id
                    AND t.status = 'pending'
              )
            ORDER BY i.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(caller_id)
        .bind(item_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(PaginatedResponse {
            data: candidates,
            total: total_count,
            page,
            limit,
        })
    }
}
