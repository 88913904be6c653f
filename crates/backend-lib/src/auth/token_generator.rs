// ============================
// crates/backend-lib/src/auth/token_generator.rs
// ============================
//! Random secret generation.
//!
//! Used for the token signing secret when none is configured and for the
//! decoy password that keeps failed logins for unknown users as slow as
//! failed logins for known ones.
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;

/// Default secret size in bytes (32 bytes = 256 bits of entropy)
const DEFAULT_SECRET_BYTES: usize = 32;

/// Generate a random URL-safe secret with 256 bits of entropy
pub fn generate_secret() -> String {
    generate_secret_with_size(DEFAULT_SECRET_BYTES)
}

/// Generate a random secret of `bytes` bytes, base64 URL-safe encoded
/// without padding
pub fn generate_secret_with_size(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}
