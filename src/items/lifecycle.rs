//! Item lifecycle state machine
//!
//! Items move `available -> pending -> traded`, or `available -> removed`,
//! with `pending -> available` as the release path when a proposal dies.
//! `traded` and `removed` are terminal. Every transition executes as a
//! conditional UPDATE checked via `rows_affected`, never read-then-write,
//! so two requests can never both consume the same item.

use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;

/// Item lifecycle states
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "item_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Listed and open to proposals
    Available,
    /// Offered in a live trade proposal
    Pending,
    /// Consumed by an accepted trade
    Traded,
    /// Withdrawn by the owner
    Removed,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Available => "available",
            ItemStatus::Pending => "pending",
            ItemStatus::Traded => "traded",
            ItemStatus::Removed => "removed",
        }
    }

    /// Whether `self -> to` is a legal lifecycle transition.
    pub fn can_transition(self, to: ItemStatus) -> bool {
        use ItemStatus::*;
        matches!(
            (self, to),
            (Available, Pending) | (Available, Removed) | (Pending, Traded) | (Pending, Available)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ItemStatus::Traded | ItemStatus::Removed)
    }
}

/// Atomically move an item from `from` to `to`.
///
/// Returns `true` when this call performed the transition and `false` when
/// the item no longer carries status `from` (or does not exist). Callers
/// decide whether a failed swap is an error or a benign no-op.
pub async fn transition(
    conn: &mut PgConnection,
    item_id: Uuid,
    from: ItemStatus,
    to: ItemStatus,
) -> Result<bool, sqlx::Error> {
    debug_assert!(from.can_transition(to), "illegal item transition");

    let rows_affected = sqlx::query(
        r#"
        UPDATE items
        SET status = $1, updated_at = NOW()
        WHERE id = $2 AND status = $3
        "#,
    )
    .bind(to)
    .bind(item_id)
    .bind(from)
    .execute(conn)
    .await?
    .rows_affected();

    Ok(rows_affected == 1)
}

/// Release an item back to `available` after its proposal ends.
///
/// No-op when the item already left `pending`.
pub async fn release(conn: &mut PgConnection, item_id: Uuid) -> Result<(), sqlx::Error> {
    let _ = transition(conn, item_id, ItemStatus::Pending, ItemStatus::Available).await?;
    Ok(())
}
