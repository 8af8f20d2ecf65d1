pub mod model;
pub mod service;
pub mod sweeper;

pub use model::*;
pub use service::TradeService;
pub use sweeper::expiry_sweeper;
