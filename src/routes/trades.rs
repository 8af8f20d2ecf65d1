//! Trade routes

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handlers::trades;
use crate::state::AppState;

/// Create trade routes
pub fn trade_routes() -> Router<AppState> {
    Router::new()
        .route("/api/trades", post(trades::propose_trade))
        .route("/api/trades", get(trades::list_trades))
        .route("/api/trades/:id", get(trades::get_trade))
        .route("/api/trades/:id/accept", put(trades::accept_trade))
        .route("/api/trades/:id/reject", put(trades::reject_trade))
        .route("/api/trades/:id/complete", put(trades::complete_trade))
}
