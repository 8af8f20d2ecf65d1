//! Background job for trade proposal expiry

use std::time::Duration;

use super::TradeService;

/// Periodically sweep overdue pending proposals to `rejected`.
///
/// Runs forever; spawned from main. An interval of zero disables the sweep
/// (proposals then only settle through explicit responses).
pub async fn expiry_sweeper(trade_service: TradeService, interval_seconds: u64) {
    if interval_seconds == 0 {
        tracing::info!("Trade expiry sweeper disabled");
        return;
    }

    tracing::info!(interval_seconds, "Starting trade expiry sweeper");

    loop {
        tokio::time::sleep(Duration::from_secs(interval_seconds)).await;

        if let Err(e) = trade_service.expire_overdue_proposals().await {
            tracing::error!("Error expiring trade proposals: {}", e);
        }
    }
}
