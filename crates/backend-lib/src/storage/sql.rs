//! Relational store over a SQLite pool.
//!
//! The schema mirrors the hosted Postgres tables: `admins` with a unique
//! username column and `registrations` keyed by id. Timestamps are stored as
//! RFC 3339 text. Statements use numbered placeholders so the Postgres store
//! can share them.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use atithi_common::RegistrationRecord;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use super::{AdminAccount, CredentialStore, StorageError};

const CREATE_ADMINS: &str = r#"
    CREATE TABLE IF NOT EXISTS admins (
        id TEXT PRIMARY KEY,
        username TEXT UNIQUE NOT NULL,
        password_hash TEXT NOT NULL,
        created_at TEXT
    )
"#;

const CREATE_REGISTRATIONS: &str = r#"
    CREATE TABLE IF NOT EXISTS registrations (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT UNIQUE NOT NULL,
        name TEXT NOT NULL,
        id_hash TEXT NOT NULL,
        days INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        expires_at TEXT NOT NULL
    )
"#;

pub(super) const CREATE_ID_HASH_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_registrations_id_hash ON registrations (id_hash)";

pub(super) const SELECT_ADMIN: &str =
    "SELECT id, username, password_hash, created_at FROM admins WHERE username = $1";

pub(super) const INSERT_ADMIN: &str =
    "INSERT INTO admins (id, username, password_hash, created_at) VALUES ($1, $2, $3, $4)";

pub(super) const COUNT_ADMINS: &str = "SELECT COUNT(*) AS count FROM admins";

pub(super) const SELECT_REGISTRATIONS: &str =
    "SELECT id, name, id_hash, days, created_at, expires_at FROM registrations ORDER BY seq";

pub(super) const SELECT_REGISTRATION: &str =
    "SELECT id, name, id_hash, days, created_at, expires_at FROM registrations WHERE id = $1";

pub(super) const SELECT_REGISTRATIONS_BY_HASH: &str =
    "SELECT id, name, id_hash, days, created_at, expires_at \
     FROM registrations WHERE id_hash = $1 ORDER BY seq";

pub(super) const INSERT_REGISTRATION: &str = "INSERT INTO registrations \
     (id, name, id_hash, days, created_at, expires_at) VALUES ($1, $2, $3, $4, $5, $6)";

pub(super) const DELETE_REGISTRATION: &str = "DELETE FROM registrations WHERE id = $1";

pub(super) const DELETE_ALL_REGISTRATIONS: &str = "DELETE FROM registrations";

/// SQLite backed store
#[derive(Debug, Clone)]
pub struct SqlStore {
    pool: SqlitePool,
}

impl SqlStore {
    /// Connect (creating the database file if needed) and ensure the schema
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let in_memory = is_in_memory(url);

        let mut pool_options = SqlitePoolOptions::new();
        if in_memory {
            // Every connection would see its own empty database
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else {
            create_parent_dir(options.get_filename()).await?;
            pool_options = pool_options.max_connections(max_connections);
        }
        let pool = pool_options.connect_with(options).await?;

        let store = Self { pool };
        store.init_schema().await?;
        tracing::info!(url, in_memory, "Database connected");
        Ok(store)
    }

    /// Create the tables if they are missing
    pub async fn init_schema(&self) -> Result<(), StorageError> {
        for statement in [CREATE_ADMINS, CREATE_REGISTRATIONS, CREATE_ID_HASH_INDEX] {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

async fn create_parent_dir(filename: &Path) -> Result<(), StorageError> {
    if let Some(parent) = filename.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

pub(super) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt(format!("invalid timestamp {value:?}: {e}")))
}

fn admin_from_row(row: &SqliteRow) -> Result<AdminAccount, StorageError> {
    let created_at = row
        .try_get::<Option<String>, _>("created_at")?
        .map(|s| parse_timestamp(&s))
        .transpose()?;

    Ok(AdminAccount {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        created_at,
    })
}

fn registration_from_row(row: &SqliteRow) -> Result<RegistrationRecord, StorageError> {
    let days: i64 = row.try_get("days")?;
    let days = u32::try_from(days)
        .map_err(|_| StorageError::Corrupt(format!("invalid days value {days}")))?;

    Ok(RegistrationRecord {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        id_hash: row.try_get("id_hash")?,
        days,
        created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
        expires_at: parse_timestamp(&row.try_get::<String, _>("expires_at")?)?,
    })
}

pub(super) fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl CredentialStore for SqlStore {
    async fn find_admin_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AdminAccount>, StorageError> {
        let row = sqlx::query(SELECT_ADMIN)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(admin_from_row).transpose()
    }

    async fn insert_admin(&self, account: AdminAccount) -> Result<(), StorageError> {
        let result = sqlx::query(INSERT_ADMIN)
            .bind(&account.id)
            .bind(&account.username)
            .bind(&account.password_hash)
            .bind(account.created_at.map(|dt| dt.to_rfc3339()))
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                Err(StorageError::DuplicateUsername(account.username))
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn count_admins(&self) -> Result<usize, StorageError> {
        let row = sqlx::query(COUNT_ADMINS).fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn list_registrations(&self) -> Result<Vec<RegistrationRecord>, StorageError> {
        let rows = sqlx::query(SELECT_REGISTRATIONS)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(registration_from_row).collect()
    }

    async fn find_registration(
        &self,
        id: &str,
    ) -> Result<Option<RegistrationRecord>, StorageError> {
        let row = sqlx::query(SELECT_REGISTRATION)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(registration_from_row).transpose()
    }

    async fn find_registrations_by_id_hash(
        &self,
        id_hash: &str,
    ) -> Result<Vec<RegistrationRecord>, StorageError> {
        let rows = sqlx::query(SELECT_REGISTRATIONS_BY_HASH)
            .bind(id_hash)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(registration_from_row).collect()
    }

    async fn insert_registration(&self, record: RegistrationRecord) -> Result<(), StorageError> {
        let result = sqlx::query(INSERT_REGISTRATION)
            .bind(&record.id)
            .bind(&record.name)
            .bind(&record.id_hash)
            .bind(i64::from(record.days))
            .bind(record.created_at.to_rfc3339())
            .bind(record.expires_at.to_rfc3339())
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StorageError::DuplicateRegistration(record.id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_registration(&self, id: &str) -> Result<bool, StorageError> {
        let result = sqlx::query(DELETE_REGISTRATION)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all_registrations(&self) -> Result<(), StorageError> {
        sqlx::query(DELETE_ALL_REGISTRATIONS)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
