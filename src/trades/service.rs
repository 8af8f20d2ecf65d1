//! Trade service layer - proposal, matching, and settlement workflow
//!
//! Every operation runs inside a single transaction. Both item rows are
//! locked `FOR UPDATE` in ascending id order before any trade row is
//! written, so concurrent reciprocal proposals serialize on the pair and
//! the match evaluation can never double-fire. Item and trade status
//! changes are conditional UPDATEs checked via `rows_affected`.

use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::ApiError;
use crate::items::lifecycle::{self, ItemStatus};
use crate::items::Item;
use crate::models::PaginatedResponse;
use crate::notifications::{insert_notification, NotificationType};
use crate::services::UserService;
use crate::trades::model::{
    ProposeTradeRequest, ProposeTradeResponse, Trade, TradeFilters, TradeRole, TradeStatus,
};

#[derive(Clone)]
pub struct TradeService {
    db_pool: PgPool,
    /// Pending proposals expire after this many days; 0 disables expiry
    expiry_days: i64,
}

impl TradeService {
    pub fn new(db_pool: PgPool, expiry_days: i64) -> Self {
        Self {
            db_pool,
            expiry_days,
        }
    }

    /// Propose trading `offered_item_id` for `requested_item_id`.
    ///
    /// Re-proposing an already-live pair returns the existing proposal
    /// unchanged. A live reverse proposal turns both into an accepted
    /// match in the same transaction.
    pub async fn propose_trade(
        &self,
        initiator_id: Uuid,
        request: ProposeTradeRequest,
    ) -> Result<ProposeTradeResponse, ApiError> {
        request.validate().map_err(ApiError::ValidationError)?;

        let mut tx = self.db_pool.begin().await?;

        let (offered, requested) =
            lock_item_pair(&mut tx, request.offered_item_id, request.requested_item_id).await?;
        let offered = offered.ok_or(ApiError::NotFound("Offered item not found".to_string()))?;
        let requested =
            requested.ok_or(ApiError::NotFound("Requested item not found".to_string()))?;

        if offered.owner_id != initiator_id {
            return Err(ApiError::Forbidden(
                "Only the owner of the offered item can propose a trade".to_string(),
            ));
        }
        if requested.owner_id == initiator_id {
            return Err(ApiError::ValidationError(
                "Cannot propose a trade against your own item".to_string(),
            ));
        }

        // Double-fired swipe: hand back the live proposal instead of erroring.
        let existing: Option<Trade> = sqlx::query_as(
            r#"
            SELECT * FROM trades
            WHERE offered_item_id = $1 AND requested_item_id = $2 AND status = 'pending'
            "#,
        )
        .bind(offered.id)
        .bind(requested.id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(trade) = existing {
            return Ok(ProposeTradeResponse {
                trade,
                matched: false,
            });
        }

        // A live reverse proposal means both sides said yes.
        let reciprocal: Option<Trade> = sqlx::query_as(
            r#"
            SELECT * FROM trades
            WHERE offered_item_id = $1 AND requested_item_id = $2 AND status = 'pending'
            "#,
        )
        .bind(requested.id)
        .bind(offered.id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(reciprocal) = reciprocal {
            let trade = settle_match(&mut tx, &offered, &requested, &reciprocal).await?;
            tx.commit().await?;

            tracing::info!(
                trade_id = %trade.id,
                reciprocal_id = %reciprocal.id,
                "Mutual match settled"
            );

            return Ok(ProposeTradeResponse {
                trade,
                matched: true,
            });
        }

        // Plain proposal: both sides must still be open.
        if offered.status != ItemStatus::Available {
            return Err(ApiError::InvalidState(format!(
                "Offered item is not available (current status: {})",
                offered.status.as_str()
            )));
        }
        if requested.status != ItemStatus::Available {
            return Err(ApiError::InvalidState(format!(
                "Requested item is not available (current status: {})",
                requested.status.as_str()
            )));
        }

        let trade: Trade = sqlx::query_as(
            r#"
            INSERT INTO trades (id, offered_item_id, requested_item_id, initiated_by, responded_by, status, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(offered.id)
        .bind(requested.id)
        .bind(initiator_id)
        .bind(requested.owner_id)
        .bind(TradeStatus::Pending)
        .bind(self.proposal_expiry())
        .fetch_one(&mut *tx)
        .await?;

        let claimed = lifecycle::transition(
            &mut tx,
            offered.id,
            ItemStatus::Available,
            ItemStatus::Pending,
        )
        .await?;
        if !claimed {
            return Err(ApiError::InternalError(
                "Offered item changed state mid-transaction".to_string(),
            ));
        }

        insert_notification(
            &mut tx,
            requested.owner_id,
            NotificationType::Trade,
            "New trade proposal",
            &format!(
                "Someone offered their {} for your {}",
                offered.name, requested.name
            ),
            Some(requested.id),
            Some(trade.id),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            trade_id = %trade.id,
            offered_item_id = %offered.id,
            requested_item_id = %requested.id,
            "Trade proposed"
        );

        Ok(ProposeTradeResponse {
            trade,
            matched: false,
        })
    }

    /// Accept a pending proposal. Responder only.
    pub async fn accept_trade(&self, trade_id: Uuid, caller_id: Uuid) -> Result<Trade, ApiError> {
        let mut tx = self.db_pool.begin().await?;

        // Read without locking; the item pair lock below is the real gate
        // and the status flip re-checks under it.
        let trade: Trade = sqlx::query_as("SELECT * FROM trades WHERE id = $1")
            .bind(trade_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ApiError::NotFound("Trade not found".to_string()))?;

        if trade.status != TradeStatus::Pending {
            return Err(ApiError::InvalidState(format!(
                "Trade is not pending (current status: {})",
                trade.status.as_str()
            )));
        }
        if trade.responded_by != caller_id {
            return Err(ApiError::Forbidden(
                "Only the responder can accept a trade".to_string(),
            ));
        }

        let (offered, requested) =
            lock_item_pair(&mut tx, trade.offered_item_id, trade.requested_item_id).await?;
        let offered = offered.ok_or(ApiError::NotFound("Offered item not found".to_string()))?;
        let requested =
            requested.ok_or(ApiError::NotFound("Requested item not found".to_string()))?;

        let accepted: Trade = sqlx::query_as(
            r#"
            UPDATE trades
            SET status = 'accepted', updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(trade_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ApiError::InvalidState(
            "Trade is no longer pending".to_string(),
        ))?;

        // The offered item has been pending since the proposal was made.
        let offered_done = lifecycle::transition(
            &mut tx,
            offered.id,
            ItemStatus::Pending,
            ItemStatus::Traded,
        )
        .await?;
        if !offered_done {
            return Err(ApiError::InternalError(
                "Offered item changed state mid-transaction".to_string(),
            ));
        }

        // The requested item stayed in circulation; it may have been removed
        // or consumed by another match in the meantime.
        let claimed = lifecycle::transition(
            &mut tx,
            requested.id,
            ItemStatus::Available,
            ItemStatus::Pending,
        )
        .await?;
        if !claimed {
            return Err(ApiError::InvalidState(format!(
                "Requested item is no longer available (current status: {})",
                requested.status.as_str()
            )));
        }
        let requested_done = lifecycle::transition(
            &mut tx,
            requested.id,
            ItemStatus::Pending,
            ItemStatus::Traded,
        )
        .await?;
        if !requested_done {
            return Err(ApiError::InternalError(
                "Requested item changed state mid-transaction".to_string(),
            ));
        }

        UserService::record_trade(&mut tx, accepted.initiated_by).await?;
        UserService::record_trade(&mut tx, accepted.responded_by).await?;

        insert_notification(
            &mut tx,
            accepted.initiated_by,
            NotificationType::Trade,
            "Trade accepted",
            &format!(
                "Your offer of {} for {} was accepted",
                offered.name, requested.name
            ),
            Some(offered.id),
            Some(accepted.id),
        )
        .await?;

        cascade_reject(&mut tx, &[offered.id, requested.id], &[accepted.id]).await?;

        tx.commit().await?;

        tracing::info!(trade_id = %accepted.id, "Trade accepted");

        Ok(accepted)
    }

    /// Reject a pending proposal and release the offered item. Responder only.
    pub async fn reject_trade(&self, trade_id: Uuid, caller_id: Uuid) -> Result<Trade, ApiError> {
        let mut tx = self.db_pool.begin().await?;

        let trade: Trade = sqlx::query_as("SELECT * FROM trades WHERE id = $1")
            .bind(trade_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ApiError::NotFound("Trade not found".to_string()))?;

        if trade.status != TradeStatus::Pending {
            return Err(ApiError::InvalidState(format!(
                "Trade is not pending (current status: {})",
                trade.status.as_str()
            )));
        }
        if trade.responded_by != caller_id {
            return Err(ApiError::Forbidden(
                "Only the responder can reject a trade".to_string(),
            ));
        }

        let (offered, requested) =
            lock_item_pair(&mut tx, trade.offered_item_id, trade.requested_item_id).await?;
        let offered = offered.ok_or(ApiError::NotFound("Offered item not found".to_string()))?;
        let requested =
            requested.ok_or(ApiError::NotFound("Requested item not found".to_string()))?;

        let rejected: Trade = sqlx::query_as(
            r#"
            UPDATE trades
            SET status = 'rejected', updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(trade_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ApiError::InvalidState(
            "Trade is no longer pending".to_string(),
        ))?;

        // The offered item goes back into circulation; the requested item
        // was never taken out of it.
        lifecycle::release(&mut tx, offered.id).await?;

        insert_notification(
            &mut tx,
            rejected.initiated_by,
            NotificationType::Trade,
            "Trade declined",
            &format!(
                "Your offer of {} for {} was declined",
                offered.name, requested.name
            ),
            Some(offered.id),
            Some(rejected.id),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(trade_id = %rejected.id, "Trade rejected");

        Ok(rejected)
    }

    /// Confirm the physical swap happened. Either party may call this once
    /// the trade is accepted; a matched twin completes alongside.
    pub async fn complete_trade(&self, trade_id: Uuid, caller_id: Uuid) -> Result<Trade, ApiError> {
        let mut tx = self.db_pool.begin().await?;

        let trade: Trade = sqlx::query_as("SELECT * FROM trades WHERE id = $1")
            .bind(trade_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ApiError::NotFound("Trade not found".to_string()))?;

        if trade.initiated_by != caller_id && trade.responded_by != caller_id {
            return Err(ApiError::Forbidden(
                "Only a party to the trade can complete it".to_string(),
            ));
        }
        if trade.status != TradeStatus::Accepted {
            return Err(ApiError::InvalidState(format!(
                "Only accepted trades can be completed (current status: {})",
                trade.status.as_str()
            )));
        }

        lock_item_pair(&mut tx, trade.offered_item_id, trade.requested_item_id).await?;

        let completed: Trade = sqlx::query_as(
            r#"
            UPDATE trades
            SET status = 'completed', updated_at = NOW()
            WHERE id = $1 AND status = 'accepted'
            RETURNING *
            "#,
        )
        .bind(trade_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ApiError::InvalidState(
            "Trade is no longer accepted".to_string(),
        ))?;

        // A mutual match leaves an accepted twin on the reverse pair.
        sqlx::query(
            r#"
            UPDATE trades
            SET status = 'completed', updated_at = NOW()
            WHERE offered_item_id = $1 AND requested_item_id = $2 AND status = 'accepted'
            "#,
        )
        .bind(completed.requested_item_id)
        .bind(completed.offered_item_id)
        .execute(&mut *tx)
        .await?;

        let other_party = if caller_id == completed.initiated_by {
            completed.responded_by
        } else {
            completed.initiated_by
        };
        insert_notification(
            &mut tx,
            other_party,
            NotificationType::Trade,
            "Trade completed",
            "Your trade partner confirmed the swap",
            None,
            Some(completed.id),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(trade_id = %completed.id, "Trade completed");

        Ok(completed)
    }

    /// Fetch a single trade. Parties only.
    pub async fn get_trade(&self, trade_id: Uuid, caller_id: Uuid) -> Result<Trade, ApiError> {
        let trade: Trade = sqlx::query_as("SELECT * FROM trades WHERE id = $1")
            .bind(trade_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or(ApiError::NotFound("Trade not found".to_string()))?;

        if trade.initiated_by != caller_id && trade.responded_by != caller_id {
            return Err(ApiError::Forbidden(
                "Only a party to the trade can view it".to_string(),
            ));
        }

        Ok(trade)
    }

    /// List the caller's trades, optionally narrowed by side and status.
    pub async fn list_trades(
        &self,
        caller_id: Uuid,
        filters: TradeFilters,
    ) -> Result<PaginatedResponse<Trade>, ApiError> {
        let page = filters.page.unwrap_or(1).max(1);
        let limit = filters.limit.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * limit;

        let base = match filters.role {
            Some(TradeRole::Initiator) => "SELECT * FROM trades WHERE initiated_by = ",
            Some(TradeRole::Responder) => "SELECT * FROM trades WHERE responded_by = ",
            None => "SELECT * FROM trades WHERE (initiated_by = ",
        };
        let count_base = match filters.role {
            Some(TradeRole::Initiator) => "SELECT COUNT(*) FROM trades WHERE initiated_by = ",
            Some(TradeRole::Responder) => "SELECT COUNT(*) FROM trades WHERE responded_by = ",
            None => "SELECT COUNT(*) FROM trades WHERE (initiated_by = ",
        };

        let mut query_builder = sqlx::QueryBuilder::new(base);
        let mut count_builder = sqlx::QueryBuilder::new(count_base);

        query_builder.push_bind(caller_id);
        count_builder.push_bind(caller_id);

        if filters.role.is_none() {
            query_builder.push(" OR responded_by = ");
            query_builder.push_bind(caller_id);
            query_builder.push(")");
            count_builder.push(" OR responded_by = ");
            count_builder.push_bind(caller_id);
            count_builder.push(")");
        }

        if let Some(status) = filters.status {
            query_builder.push(" AND status = ");
            query_builder.push_bind(status);
            count_builder.push(" AND status = ");
            count_builder.push_bind(status);
        }

        let total_count: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.db_pool)
            .await?;

        query_builder.push(" ORDER BY created_at DESC LIMIT ");
        query_builder.push_bind(limit);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(offset);

        let trades = query_builder
            .build_query_as::<Trade>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(PaginatedResponse {
            data: trades,
            total: total_count,
            page,
            limit,
        })
    }

    /// Sweep overdue pending proposals to `rejected` and release their
    /// offered items. Returns the number of proposals expired.
    ///
    /// Each proposal settles in its own transaction under the item pair
    /// lock, same discipline as the request paths, so a sweep can never
    /// race an accept into a half-settled state.
    pub async fn expire_overdue_proposals(&self) -> Result<u64, ApiError> {
        let overdue: Vec<Trade> = sqlx::query_as(
            r#"
            SELECT * FROM trades
            WHERE status = 'pending' AND expires_at IS NOT NULL AND expires_at < NOW()
            "#,
        )
        .fetch_all(&self.db_pool)
        .await?;

        let mut expired = 0u64;
        for trade in overdue {
            match self.expire_one(&trade).await {
                Ok(true) => expired += 1,
                // Settled by a request between the scan and the lock
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(trade_id = %trade.id, error = %e, "Failed to expire trade proposal");
                }
            }
        }

        if expired > 0 {
            tracing::info!(count = expired, "Expired overdue trade proposals");
        }

        Ok(expired)
    }

    async fn expire_one(&self, trade: &Trade) -> Result<bool, ApiError> {
        let mut tx = self.db_pool.begin().await?;

        let (_, requested) =
            lock_item_pair(&mut tx, trade.offered_item_id, trade.requested_item_id).await?;

        let expired: Option<Trade> = sqlx::query_as(
            r#"
            UPDATE trades
            SET status = 'rejected', updated_at = NOW()
            WHERE id = $1 AND status = 'pending' AND expires_at < NOW()
            RETURNING *
            "#,
        )
        .bind(trade.id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(expired) = expired else {
            return Ok(false);
        };

        lifecycle::release(&mut tx, expired.offered_item_id).await?;

        let requested_name = requested
            .map(|i| i.name)
            .unwrap_or_else(|| "an item".to_string());
        insert_notification(
            &mut tx,
            expired.initiated_by,
            NotificationType::System,
            "Trade proposal expired",
            &format!(
                "Your offer for {} expired without a response",
                requested_name
            ),
            Some(expired.offered_item_id),
            Some(expired.id),
        )
        .await?;

        tx.commit().await?;

        Ok(true)
    }

    fn proposal_expiry(&self) -> Option<DateTime<Utc>> {
        if self.expiry_days <= 0 {
            None
        } else {
            Some(Utc::now() + Duration::days(self.expiry_days))
        }
    }
}

/// Lock both items of a pair `FOR UPDATE` in ascending id order.
///
/// The consistent lock order is what serializes concurrent reciprocal
/// proposals; every workflow entry point goes through here before writing
/// anything. Returns the rows in (offered, requested) order.
async fn lock_item_pair(
    tx: &mut Transaction<'_, Postgres>,
    offered_item_id: Uuid,
    requested_item_id: Uuid,
) -> Result<(Option<Item>, Option<Item>), sqlx::Error> {
    let (first, second) = if offered_item_id < requested_item_id {
        (offered_item_id, requested_item_id)
    } else {
        (requested_item_id, offered_item_id)
    };

    let first_row: Option<Item> = sqlx::query_as("SELECT * FROM items WHERE id = $1 FOR UPDATE")
        .bind(first)
        .fetch_optional(&mut **tx)
        .await?;
    let second_row: Option<Item> = sqlx::query_as("SELECT * FROM items WHERE id = $1 FOR UPDATE")
        .bind(second)
        .fetch_optional(&mut **tx)
        .await?;

    if first == offered_item_id {
        Ok((first_row, second_row))
    } else {
        Ok((second_row, first_row))
    }
}

/// Settle a mutual match inside the caller's transaction.
///
/// The reciprocal proposal flips to accepted, the new proposal is recorded
/// already accepted, both items become traded, stats and a match
/// notification land for each party, and every other live proposal touching
/// either item is cascade-rejected.
async fn settle_match(
    tx: &mut Transaction<'_, Postgres>,
    offered: &Item,
    requested: &Item,
    reciprocal: &Trade,
) -> Result<Trade, ApiError> {
    // Claim the offered item; the requested item is already pending by
    // virtue of the reciprocal proposal.
    let claimed = lifecycle::transition(
        &mut *tx,
        offered.id,
        ItemStatus::Available,
        ItemStatus::Pending,
    )
    .await?;
    if !claimed {
        return Err(ApiError::InvalidState(format!(
            "Offered item is not available (current status: {})",
            offered.status.as_str()
        )));
    }

    let flipped = sqlx::query(
        r#"
        UPDATE trades
        SET status = 'accepted', updated_at = NOW()
        WHERE id = $1 AND status = 'pending'
        "#,
    )
    .bind(reciprocal.id)
    .execute(&mut **tx)
    .await?
    .rows_affected();
    if flipped == 0 {
        return Err(ApiError::Conflict(
            "Reciprocal proposal was settled concurrently".to_string(),
        ));
    }

    let trade: Trade = sqlx::query_as(
        r#"
        INSERT INTO trades (id, offered_item_id, requested_item_id, initiated_by, responded_by, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(offered.id)
    .bind(requested.id)
    .bind(offered.owner_id)
    .bind(requested.owner_id)
    .bind(TradeStatus::Accepted)
    .fetch_one(&mut **tx)
    .await?;

    // Both items leave circulation.
    let offered_done =
        lifecycle::transition(&mut *tx, offered.id, ItemStatus::Pending, ItemStatus::Traded)
            .await?;
    let requested_done = lifecycle::transition(
        &mut *tx,
        requested.id,
        ItemStatus::Pending,
        ItemStatus::Traded,
    )
    .await?;
    if !offered_done || !requested_done {
        return Err(ApiError::InternalError(
            "Matched items changed state mid-transaction".to_string(),
        ));
    }

    UserService::record_trade(&mut *tx, offered.owner_id).await?;
    UserService::record_trade(&mut *tx, requested.owner_id).await?;

    insert_notification(
        &mut *tx,
        offered.owner_id,
        NotificationType::Match,
        "It's a match!",
        &format!("Your {} matched with {}", offered.name, requested.name),
        Some(offered.id),
        Some(trade.id),
    )
    .await?;
    insert_notification(
        &mut *tx,
        requested.owner_id,
        NotificationType::Match,
        "It's a match!",
        &format!("Your {} matched with {}", requested.name, offered.name),
        Some(requested.id),
        Some(reciprocal.id),
    )
    .await?;

    cascade_reject(tx, &[offered.id, requested.id], &[reciprocal.id, trade.id]).await?;

    Ok(trade)
}

/// Reject every other pending proposal that references one of the settled
/// items, release their offered items, and tell their initiators.
async fn cascade_reject(
    tx: &mut Transaction<'_, Postgres>,
    item_ids: &[Uuid],
    exclude_trade_ids: &[Uuid],
) -> Result<(), ApiError> {
    let stale: Vec<Trade> = sqlx::query_as(
        r#"
        UPDATE trades
        SET status = 'rejected', updated_at = NOW()
        WHERE status = 'pending'
          AND id <> ALL($2)
          AND (offered_item_id = ANY($1) OR requested_item_id = ANY($1))
        RETURNING *
        "#,
    )
    .bind(item_ids)
    .bind(exclude_trade_ids)
    .fetch_all(&mut **tx)
    .await?;

    for trade in stale {
        lifecycle::release(&mut *tx, trade.offered_item_id).await?;
        insert_notification(
            &mut *tx,
            trade.initiated_by,
            NotificationType::System,
            "Trade proposal closed",
            "An item in your proposal was traded to someone else",
            Some(trade.offered_item_id),
            Some(trade.id),
        )
        .await?;
        tracing::debug!(trade_id = %trade.id, "Cascade-rejected stale proposal");
    }

    Ok(())
}
