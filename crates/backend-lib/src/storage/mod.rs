// ============================
// atithi-backend/src/storage/mod.rs
// ============================
//! Credential store abstraction with file, in-memory, SQLite and (feature
//! gated) PostgreSQL variants.
//!
//! Every variant holds the same two collections: admin accounts keyed by a
//! unique username, and tourist registrations keyed by id. The auth service
//! and the HTTP handlers only ever see `Arc<dyn CredentialStore>`.

mod file;
mod memory;
#[cfg(feature = "postgres")]
mod postgres;
mod sql;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;
pub use sql::SqlStore;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use atithi_common::{AdminProfile, RegistrationRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{StorageBackend, StorageSettings};

/// Errors raised by a backing store
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Admin username already exists: {0}")]
    DuplicateUsername(String),

    #[error("Registration id already exists: {0}")]
    DuplicateRegistration(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Storage backend not available: {0}")]
    Unsupported(String),
}

/// A stored admin account
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdminAccount {
    pub id: String,
    pub username: String,
    /// Salted one-way hash (bcrypt or PHC string)
    pub password_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl AdminAccount {
    /// Build a fresh account with a generated id
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: format!("admin_{}", uuid::Uuid::new_v4().simple()),
            username: username.into(),
            password_hash: password_hash.into(),
            created_at: Some(Utc::now()),
        }
    }

    /// The projection that is safe to return to clients
    pub fn profile(&self) -> AdminProfile {
        AdminProfile {
            id: self.id.clone(),
            username: self.username.clone(),
        }
    }
}

// Keep hashes out of logs.
impl fmt::Debug for AdminAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminAccount")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// On-disk layout shared by the file store and memory snapshots
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct DataDocument {
    #[serde(default)]
    pub registrations: Vec<RegistrationRecord>,
    #[serde(default)]
    pub admins: Vec<AdminAccount>,
}

impl DataDocument {
    fn insert_admin(&mut self, account: AdminAccount) -> Result<(), StorageError> {
        if self.admins.iter().any(|a| a.username == account.username) {
            return Err(StorageError::DuplicateUsername(account.username));
        }
        self.admins.push(account);
        Ok(())
    }

    fn insert_registration(&mut self, record: RegistrationRecord) -> Result<(), StorageError> {
        if self.registrations.iter().any(|r| r.id == record.id) {
            return Err(StorageError::DuplicateRegistration(record.id));
        }
        self.registrations.push(record);
        Ok(())
    }

    fn delete_registration(&mut self, id: &str) -> bool {
        match self.registrations.iter().position(|r| r.id == id) {
            Some(index) => {
                self.registrations.remove(index);
                true
            },
            None => false,
        }
    }
}

/// Trait for credential store backends
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up an admin by exact username. A miss is `Ok(None)`.
    async fn find_admin_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AdminAccount>, StorageError>;

    /// Insert a new admin; fails with `DuplicateUsername` without mutating anything
    async fn insert_admin(&self, account: AdminAccount) -> Result<(), StorageError>;

    /// Number of admin accounts
    async fn count_admins(&self) -> Result<usize, StorageError>;

    /// All registrations in insertion order
    async fn list_registrations(&self) -> Result<Vec<RegistrationRecord>, StorageError>;

    /// Look up one registration by id
    async fn find_registration(
        &self,
        id: &str,
    ) -> Result<Option<RegistrationRecord>, StorageError> {
        let records = self.list_registrations().await?;
        Ok(records.into_iter().find(|r| r.id == id))
    }

    /// Registrations belonging to one hashed identity
    async fn find_registrations_by_id_hash(
        &self,
        id_hash: &str,
    ) -> Result<Vec<RegistrationRecord>, StorageError> {
        let records = self.list_registrations().await?;
        Ok(records.into_iter().filter(|r| r.id_hash == id_hash).collect())
    }

    /// Persist a registration
    async fn insert_registration(&self, record: RegistrationRecord) -> Result<(), StorageError>;

    /// Remove one registration, returning whether it existed
    async fn delete_registration(&self, id: &str) -> Result<bool, StorageError>;

    /// Remove every registration
    async fn delete_all_registrations(&self) -> Result<(), StorageError>;
}

/// Open the store variant selected in the settings
pub async fn open_store(
    settings: &StorageSettings,
) -> Result<Arc<dyn CredentialStore>, StorageError> {
    let store: Arc<dyn CredentialStore> = match settings.backend {
        StorageBackend::File => Arc::new(JsonFileStore::open(&settings.path).await?),
        StorageBackend::Memory => match &settings.snapshot {
            Some(snapshot) => Arc::new(MemoryStore::load_snapshot(snapshot).await?),
            None => Arc::new(MemoryStore::new()),
        },
        StorageBackend::Sqlite => {
            Arc::new(SqlStore::connect(&settings.database_url, settings.max_connections).await?)
        },
        #[cfg(feature = "postgres")]
        StorageBackend::Postgres => {
            Arc::new(PgStore::connect(&settings.database_url, settings.max_connections).await?)
        },
        #[cfg(not(feature = "postgres"))]
        StorageBackend::Postgres => {
            return Err(StorageError::Unsupported(
                "built without the `postgres` feature".to_string(),
            ));
        },
    };

    tracing::info!(backend = ?settings.backend, "Credential store opened");
    Ok(store)
}
