//! Route definitions for the TradeLoop API

mod analytics;
mod auth;
mod items;
mod notifications;
mod trades;
mod users;

pub use analytics::analytics_routes;
pub use auth::auth_routes;
pub use items::item_routes;
pub use notifications::notification_routes;
pub use trades::trade_routes;
pub use users::user_routes;
