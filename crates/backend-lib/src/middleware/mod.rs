// crates/backend-lib/src/middleware/mod.rs

//! Middleware for the registration API.

pub mod auth;
pub mod rate_limit;

pub use auth::require_admin;
pub use rate_limit::{rate_limit, RateLimiter};
