// ============================
// atithi-backend/src/auth/mod.rs
// ============================
//! Authentication module: password hashing, tokens and the auth service.

pub mod password;
pub mod token;
pub mod token_generator;
mod service;
mod service_impl;

pub use password::{
    validate_password_strength, verify_password, PasswordError, PasswordRequirements,
    PasswordScheme, MAX_PASSWORD_BYTES, MIN_PASSWORD_LENGTH,
};
pub use service::{AuthError, AuthService};
pub use service_impl::{DefaultAuth, ProvisioningPolicy};
pub use token::{Claims, TokenIssuer};
