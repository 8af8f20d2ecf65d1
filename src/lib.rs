//! TradeLoop Backend Library
//!
//! This library exports the core modules for the TradeLoop backend server.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod items;
pub mod middleware;
pub mod models;
pub mod notifications;
pub mod routes;
pub mod services;
pub mod state;
pub mod trades;
