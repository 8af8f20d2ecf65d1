//! User profile and stats service

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::models::{UpdateProfileRequest, User, UserResponse};

// ============================================================================
// XP awards
// ============================================================================

/// XP awarded for listing an item
const XP_PER_LISTING: i32 = 10;

/// XP awarded to each party when a trade is accepted or matched
const XP_PER_TRADE: i32 = 25;

#[derive(Clone)]
pub struct UserService {
    db_pool: PgPool,
}

impl UserService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Fetch a user's public profile
    pub async fn get_user(&self, user_id: Uuid) -> Result<UserResponse, ApiError> {
        let user: User = sqlx::query_as(
            r#"
            SELECT id, name, email, password_hash, avatar, bio, role,
                   trades_count, listings_count, xp, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or(ApiError::NotFound("User not found".to_string()))?;

        Ok(user.into())
    }

    /// Update the caller's own profile. Email, role, and stats are not
    /// editable through this path.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<UserResponse, ApiError> {
        request.validate()?;

        let user: User = sqlx::query_as(
            r#"
            UPDATE users
            SET name = COALESCE($1, name),
                avatar = COALESCE($2, avatar),
                bio = COALESCE($3, bio),
                updated_at = NOW()
            WHERE id = $4
            RETURNING id, name, email, password_hash, avatar, bio, role,
                      trades_count, listings_count, xp, created_at, updated_at
            "#,
        )
        .bind(request.name)
        .bind(request.avatar)
        .bind(request.bio)
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or(ApiError::NotFound("User not found".to_string()))?;

        Ok(user.into())
    }

    /// Bump listing stats inside the caller's transaction.
    pub async fn record_listing(conn: &mut PgConnection, user_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET listings_count = listings_count + 1, xp = xp + $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(XP_PER_LISTING)
        .bind(user_id)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Bump trade stats inside the caller's transaction. Called once per
    /// party per settled trade.
    pub async fn record_trade(conn: &mut PgConnection, user_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET trades_count = trades_count + 1, xp = xp + $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(XP_PER_TRADE)
        .bind(user_id)
        .execute(conn)
        .await?;

        Ok(())
    }
}
