//! Relational store over a PostgreSQL pool, for hosted deployments.
//!
//! Same tables and statements as the SQLite store; only the DDL differs.

use async_trait::async_trait;
use atithi_common::RegistrationRecord;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use super::sql::{
    is_unique_violation, parse_timestamp, COUNT_ADMINS, CREATE_ID_HASH_INDEX,
    DELETE_ALL_REGISTRATIONS, DELETE_REGISTRATION, INSERT_ADMIN, INSERT_REGISTRATION,
    SELECT_ADMIN, SELECT_REGISTRATION, SELECT_REGISTRATIONS, SELECT_REGISTRATIONS_BY_HASH,
};
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
        seq BIGSERIAL PRIMARY KEY,
        id TEXT UNIQUE NOT NULL,
        name TEXT NOT NULL,
        id_hash TEXT NOT NULL,
        days BIGINT NOT NULL,
        created_at TEXT NOT NULL,
        expires_at TEXT NOT NULL
    )
"#;

/// PostgreSQL backed store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and ensure the schema
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        tracing::info!(backend = "postgres", "Database connected");
        Ok(store)
    }

    pub async fn init_schema(&self) -> Result<(), StorageError> {
        for statement in [CREATE_ADMINS, CREATE_REGISTRATIONS, CREATE_ID_HASH_INDEX] {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn admin_from_row(row: &PgRow) -> Result<AdminAccount, StorageError> {
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

fn registration_from_row(row: &PgRow) -> Result<RegistrationRecord, StorageError> {
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

#[async_trait]
impl CredentialStore for PgStore {
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
