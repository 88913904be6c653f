// ============================
// atithi-backend/src/auth/password.rs
// ============================
//! Password hashing and verification.
//!
//! New hashes use the configured scheme. Verification reads the scheme off
//! the stored hash, so data files mixing bcrypt (`$2b$...`) and PHC strings
//! (`$scrypt$...`, `$argon2id$...`) keep working after a scheme change.
use argon2::Argon2;
use rand::RngCore;
use scrypt::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use scrypt::{Params, Scrypt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// bcrypt only reads the first 72 bytes of its input
pub const MAX_PASSWORD_BYTES: usize = 72;

const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;
const SALT_BYTES: usize = 16;

/// Hashing failures
#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("bcrypt error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),

    #[error("password hash error: {0}")]
    Phc(String),
}

impl From<scrypt::password_hash::Error> for PasswordError {
    fn from(e: scrypt::password_hash::Error) -> Self {
        PasswordError::Phc(e.to_string())
    }
}

/// Algorithm used for new password hashes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "lowercase")]
pub enum PasswordScheme {
    Bcrypt { cost: u32 },
    Scrypt { log_n: u8 },
}

impl Default for PasswordScheme {
    fn default() -> Self {
        PasswordScheme::Bcrypt { cost: 10 }
    }
}

impl PasswordScheme {
    /// Check the work factor is one the hashing crates accept
    pub fn validate(&self) -> Result<(), String> {
        match *self {
            PasswordScheme::Bcrypt { cost } if !(4..=31).contains(&cost) => {
                Err(format!("bcrypt cost must be within 4..=31, got {cost}"))
            },
            PasswordScheme::Scrypt { log_n } if !(10..=20).contains(&log_n) => {
                Err(format!("scrypt log_n must be within 10..=20, got {log_n}"))
            },
            _ => Ok(()),
        }
    }

    /// Hash a password with a fresh random salt. CPU bound; call from a
    /// blocking context.
    pub fn hash(&self, plain: &str) -> Result<String, PasswordError> {
        match *self {
            PasswordScheme::Bcrypt { cost } => Ok(bcrypt::hash(plain, cost)?),
            PasswordScheme::Scrypt { log_n } => {
                let params = Params::new(log_n, SCRYPT_R, SCRYPT_P, Params::RECOMMENDED_LEN)
                    .map_err(|e| PasswordError::Phc(e.to_string()))?;

                let mut salt = [0u8; SALT_BYTES];
                rand::rng().fill_bytes(&mut salt);
                let salt = SaltString::encode_b64(&salt)?;

                let hash = Scrypt
                    .hash_password_customized(plain.as_bytes(), None, None, params, &salt)?
                    .to_string();
                Ok(hash)
            },
        }
    }
}

/// Verify a password against a stored hash of any supported scheme.
///
/// Malformed or unknown hashes never verify.
pub fn verify_password(hash: &str, plain: &str) -> bool {
    if is_bcrypt_hash(hash) {
        return bcrypt::verify(plain, hash).unwrap_or(false);
    }

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    let argon2 = Argon2::default();
    let verifiers: [&dyn PasswordVerifier; 2] = [&Scrypt, &argon2];
    parsed_hash.verify_password(&verifiers, plain).is_ok()
}

fn is_bcrypt_hash(hash: &str) -> bool {
    ["$2a$", "$2b$", "$2x$", "$2y$"]
        .iter()
        .any(|prefix| hash.starts_with(prefix))
}

/// Password complexity requirements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordRequirements {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_special: bool,
}

impl Default for PasswordRequirements {
    fn default() -> Self {
        Self {
            min_length: MIN_PASSWORD_LENGTH,
            require_uppercase: false,
            require_lowercase: false,
            require_digit: true,
            require_special: false,
        }
    }
}

impl PasswordRequirements {
    /// Human readable summary, used in weak password errors
    pub fn describe(&self) -> String {
        let mut parts = vec![format!("at least {} characters", self.min_length)];
        if self.require_uppercase {
            parts.push("an uppercase letter".to_string());
        }
        if self.require_lowercase {
            parts.push("a lowercase letter".to_string());
        }
        if self.require_digit {
            parts.push("a digit".to_string());
        }
        if self.require_special {
            parts.push("a special character".to_string());
        }
        format!("Password must contain {}", parts.join(", "))
    }
}

/// Check if a password meets the complexity requirements
pub fn validate_password_strength(password: &str, requirements: &PasswordRequirements) -> bool {
    if password.chars().count() < requirements.min_length {
        return false;
    }

    if requirements.require_uppercase && !password.chars().any(char::is_uppercase) {
        return false;
    }

    if requirements.require_lowercase && !password.chars().any(char::is_lowercase) {
        return false;
    }

    if requirements.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }

    if requirements.require_special && !password.chars().any(|c| !c.is_alphanumeric()) {
        return false;
    }

    true
}
