//! Cross-domain services

pub mod analytics;
pub mod users;

pub use analytics::{AnalyticsService, PlatformSummary};
pub use users::UserService;
