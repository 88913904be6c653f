//! In-memory store, scoped to the process that constructs it.
use std::path::Path;

use async_trait::async_trait;
use atithi_common::RegistrationRecord;
use parking_lot::RwLock;

use super::{AdminAccount, CredentialStore, DataDocument, StorageError};

/// Volatile store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<DataDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing document
    pub fn from_document(document: DataDocument) -> Self {
        Self {
            data: RwLock::new(document),
        }
    }

    /// Seed from a JSON snapshot in the file store layout
    pub async fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        let document: DataDocument = serde_json::from_str(&content)?;
        tracing::info!(
            registrations = document.registrations.len(),
            admins = document.admins.len(),
            "Loaded memory store snapshot"
        );
        Ok(Self::from_document(document))
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_admin_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AdminAccount>, StorageError> {
        Ok(self
            .data
            .read()
            .admins
            .iter()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn insert_admin(&self, account: AdminAccount) -> Result<(), StorageError> {
        self.data.write().insert_admin(account)
    }

    async fn count_admins(&self) -> Result<usize, StorageError> {
        Ok(self.data.read().admins.len())
    }

    async fn list_registrations(&self) -> Result<Vec<RegistrationRecord>, StorageError> {
        Ok(self.data.read().registrations.clone())
    }

    async fn insert_registration(&self, record: RegistrationRecord) -> Result<(), StorageError> {
        self.data.write().insert_registration(record)
    }

    async fn delete_registration(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.data.write().delete_registration(id))
    }

    async fn delete_all_registrations(&self) -> Result<(), StorageError> {
        self.data.write().registrations.clear();
        Ok(())
    }
}
