//! Flat-file implementation: one pretty-printed JSON document.
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use atithi_common::RegistrationRecord;
use tokio::fs as tokio_fs;
use tokio::sync::Mutex;

use super::{AdminAccount, CredentialStore, DataDocument, StorageError};

/// JSON file backed store.
///
/// The document is cached in memory behind an async mutex. A mutation is
/// applied to a copy, flushed to a temp file that is then renamed over the
/// data file, and only committed to the cache once the flush succeeded, so a
/// failed write leaves both the file and the cache at the previous state.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    data: Mutex<DataDocument>,
}

impl JsonFileStore {
    /// Open the data file, bootstrapping an empty document when it is missing
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        let data = if tokio_fs::try_exists(&path).await? {
            let content = tokio_fs::read_to_string(&path).await?;
            serde_json::from_str(&content)?
        } else {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio_fs::create_dir_all(parent).await?;
            }
            let empty = DataDocument::default();
            write_document(&path, &empty).await?;
            tracing::info!(path = %path.display(), "Created initial data file");
            empty
        };

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Location of the backing document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to a copy of the document and persist it
    async fn mutate<T>(
        &self,
        change: impl FnOnce(&mut DataDocument) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let mut guard = self.data.lock().await;
        let mut next = guard.clone();
        let result = change(&mut next)?;

        if let Err(e) = write_document(&self.path, &next).await {
            tracing::error!(path = %self.path.display(), error = %e, "Failed to write data file");
            return Err(e);
        }

        *guard = next;
        Ok(result)
    }
}

async fn write_document(path: &Path, document: &DataDocument) -> Result<(), StorageError> {
    let json = serde_json::to_string_pretty(document)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio_fs::write(&tmp, json).await?;
    tokio_fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl CredentialStore for JsonFileStore {
    async fn find_admin_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AdminAccount>, StorageError> {
        let data = self.data.lock().await;
        Ok(data.admins.iter().find(|a| a.username == username).cloned())
    }

    async fn insert_admin(&self, account: AdminAccount) -> Result<(), StorageError> {
        self.mutate(|doc| doc.insert_admin(account)).await
    }

    async fn count_admins(&self) -> Result<usize, StorageError> {
        Ok(self.data.lock().await.admins.len())
    }

    async fn list_registrations(&self) -> Result<Vec<RegistrationRecord>, StorageError> {
        Ok(self.data.lock().await.registrations.clone())
    }

    async fn insert_registration(&self, record: RegistrationRecord) -> Result<(), StorageError> {
        self.mutate(|doc| doc.insert_registration(record)).await
    }

    async fn delete_registration(&self, id: &str) -> Result<bool, StorageError> {
        // Skip the rewrite when nothing matches
        {
            let data = self.data.lock().await;
            if !data.registrations.iter().any(|r| r.id == id) {
                return Ok(false);
            }
        }
        self.mutate(|doc| Ok(doc.delete_registration(id))).await
    }

    async fn delete_all_registrations(&self) -> Result<(), StorageError> {
        self.mutate(|doc| {
            doc.registrations.clear();
            Ok(())
        })
        .await
    }
}
