//! API handlers for the TradeLoop backend

pub mod analytics;
pub mod auth;
pub mod items;
pub mod notifications;
pub mod trades;
pub mod users;

pub use analytics::get_analytics;
pub use auth::*;
pub use items::*;
pub use notifications::*;
pub use trades::*;
pub use users::{get_user, update_profile};

// Re-export auth extractors from middleware for handler use
pub use crate::middleware::auth::{AdminUser, AuthenticatedUser};
