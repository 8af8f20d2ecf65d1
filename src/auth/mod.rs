//! Authentication module for TradeLoop
//!
//! Provides email/password authentication with JWT sessions.
//! - bcrypt password hashing
//! - JWT access/refresh token generation and validation
//! - Session management with rotating refresh tokens

mod jwt;
mod password;
mod service;

pub use jwt::{generate_access_token, generate_refresh_token, verify_token, Claims};
pub use service::{AuthError, AuthService};
