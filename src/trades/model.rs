//! Trade models and data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A trade proposal between two items
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Trade {
    pub id: Uuid,
    pub offered_item_id: Uuid,
    pub requested_item_id: Uuid,
    /// Owner of the offered item
    pub initiated_by: Uuid,
    /// Owner of the requested item
    pub responded_by: Uuid,
    pub status: TradeStatus,
    /// Pending proposals past this instant are swept to `rejected`
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Trade proposal states
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "trade_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    /// Proposed, awaiting the other side
    Pending,
    /// Matched or accepted; the items have changed hands
    Accepted,
    /// Declined, expired, or displaced by a match
    Rejected,
    /// Both parties confirmed the swap
    Completed,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Pending => "pending",
            TradeStatus::Accepted => "accepted",
            TradeStatus::Rejected => "rejected",
            TradeStatus::Completed => "completed",
        }
    }
}

/// Request DTO for proposing a trade
#[derive(Debug, Deserialize)]
pub struct ProposeTradeRequest {
    pub offered_item_id: Uuid,
    pub requested_item_id: Uuid,
}

impl ProposeTradeRequest {
    /// Validate request
    pub fn validate(&self) -> Result<(), String> {
        if self.offered_item_id == self.requested_item_id {
            return Err("An item cannot be traded for itself".to_string());
        }
        Ok(())
    }
}

/// Propose outcome: the created (or already-live) trade plus whether it
/// closed a mutual match.
#[derive(Debug, Serialize)]
pub struct ProposeTradeResponse {
    pub trade: Trade,
    pub matched: bool,
}

/// Which side of a trade the caller is on
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TradeRole {
    Initiator,
    Responder,
}

/// Query parameters for listing the caller's trades
#[derive(Debug, Deserialize)]
pub struct TradeFilters {
    pub status: Option<TradeStatus>,
    pub role: Option<TradeRole>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}
