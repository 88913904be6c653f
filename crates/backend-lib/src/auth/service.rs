use async_trait::async_trait;
use atithi_common::{AdminProfile, LoginResponse};
use thiserror::Error;

use super::Claims;
use crate::storage::StorageError;

/// Authentication and authorization failures.
///
/// `InvalidCredentials` covers both an unknown username and a wrong
/// password so callers cannot tell them apart.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Forbidden")]
    Forbidden,

    #[error("Username already exists: {0}")]
    DuplicateUsername(String),

    #[error("{0}")]
    WeakPassword(String),

    #[error("No admin accounts configured")]
    NoAdminsConfigured,

    #[error("Storage failure: {0}")]
    Storage(StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for AuthError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::DuplicateUsername(username) => AuthError::DuplicateUsername(username),
            other => AuthError::Storage(other),
        }
    }
}

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Check a username/password pair and mint a token for the account
    async fn authenticate(&self, username: &str, password: &str)
        -> Result<LoginResponse, AuthError>;

    /// Decode a presented token. Stateless: no store lookup.
    fn verify_token(&self, token: &str) -> Result<Claims, AuthError>;

    /// Admit only admin claims
    fn authorize(&self, claims: &Claims) -> Result<(), AuthError>;

    /// Create an admin, subject to the provisioning policy
    async fn provision_admin(
        &self,
        username: &str,
        password: &str,
        provisioning_key: Option<&str>,
    ) -> Result<AdminProfile, AuthError>;
}
