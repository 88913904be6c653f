// ============================
// crates/backend-lib/src/handlers/mod.rs
// ============================
//! HTTP handlers. Thin adapters over the auth service and the store.

pub mod admin;
pub mod health;
pub mod registrations;
