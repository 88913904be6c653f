//! Credential store contract, run against every variant
use std::path::PathBuf;

use atithi_backend::config::{StorageBackend, StorageSettings};
use atithi_backend::storage::{
    open_store, AdminAccount, CredentialStore, DataDocument, JsonFileStore, MemoryStore,
    SqlStore, StorageError,
};
use atithi_common::RegistrationRecord;
use chrono::{Duration, TimeZone, Utc};
use tempfile::tempdir;

fn record(id: &str, id_hash: &str) -> RegistrationRecord {
    let created = Utc.with_ymd_and_hms(2025, 1, 10, 9, 30, 0).unwrap();
    RegistrationRecord {
        id: id.to_string(),
        name: format!("Tourist {id}"),
        id_hash: id_hash.to_string(),
        days: 4,
        created_at: created,
        expires_at: created + Duration::days(4),
    }
}

async fn exercise_store(store: &dyn CredentialStore) {
    // Admins
    assert_eq!(store.count_admins().await.unwrap(), 0);
    assert!(store.find_admin_by_username("admin").await.unwrap().is_none());

    let admin = AdminAccount::new("admin", "$2b$04$hash");
    store.insert_admin(admin.clone()).await.unwrap();
    assert_eq!(
        store.find_admin_by_username("admin").await.unwrap(),
        Some(admin.clone())
    );
    assert!(store.find_admin_by_username("ADMIN").await.unwrap().is_none());

    let duplicate = AdminAccount::new("admin", "$2b$04$other");
    assert!(matches!(
        store.insert_admin(duplicate).await,
        Err(StorageError::DuplicateUsername(_))
    ));
    assert_eq!(store.count_admins().await.unwrap(), 1);
    assert_eq!(
        store
            .find_admin_by_username("admin")
            .await
            .unwrap()
            .unwrap()
            .password_hash,
        "$2b$04$hash"
    );

    // Registrations
    let hash_a = "a".repeat(64);
    let hash_b = "b".repeat(64);
    for (id, hash) in [("r1", &hash_a), ("r2", &hash_b), ("r3", &hash_a)] {
        store.insert_registration(record(id, hash)).await.unwrap();
    }
    assert!(matches!(
        store.insert_registration(record("r1", &hash_b)).await,
        Err(StorageError::DuplicateRegistration(_))
    ));

    let ids: Vec<String> = store
        .list_registrations()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, ["r1", "r2", "r3"]);

    assert_eq!(
        store.find_registration("r2").await.unwrap(),
        Some(record("r2", &hash_b))
    );
    assert!(store.find_registration("missing").await.unwrap().is_none());

    let by_hash: Vec<String> = store
        .find_registrations_by_id_hash(&hash_a)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(by_hash, ["r1", "r3"]);

    assert!(store.delete_registration("r2").await.unwrap());
    assert!(!store.delete_registration("r2").await.unwrap());
    assert_eq!(store.list_registrations().await.unwrap().len(), 2);

    store.delete_all_registrations().await.unwrap();
    assert!(store.list_registrations().await.unwrap().is_empty());
    assert_eq!(store.count_admins().await.unwrap(), 1);
}

#[tokio::test]
async fn test_memory_store_contract() {
    exercise_store(&MemoryStore::new()).await;
}

#[tokio::test]
async fn test_file_store_contract() {
    let dir = tempdir().unwrap();
    let store = JsonFileStore::open(dir.path().join("data.json")).await.unwrap();
    exercise_store(&store).await;
}

#[tokio::test]
async fn test_sqlite_store_contract() {
    let store = SqlStore::connect("sqlite::memory:", 1).await.unwrap();
    exercise_store(&store).await;
}

#[tokio::test]
async fn test_sqlite_memory_pool_shares_one_database() {
    let store = SqlStore::connect("sqlite::memory:", 5).await.unwrap();
    store
        .insert_admin(AdminAccount::new("admin", "$2b$04$hash"))
        .await
        .unwrap();

    let counts = tokio::join!(
        store.count_admins(),
        store.count_admins(),
        store.count_admins(),
        store.count_admins(),
        store.count_admins(),
        store.count_admins(),
        store.count_admins(),
        store.count_admins(),
    );
    for count in [
        counts.0, counts.1, counts.2, counts.3, counts.4, counts.5, counts.6, counts.7,
    ] {
        assert_eq!(count.unwrap(), 1);
    }
}

#[tokio::test]
async fn test_sqlite_creates_missing_directories() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("nested").join("data").join("atithi.db");
    let url = format!("sqlite://{}", db.display());

    let store = SqlStore::connect(&url, 2).await.unwrap();
    assert_eq!(store.count_admins().await.unwrap(), 0);
    assert!(db.exists());
}

#[tokio::test]
async fn test_sqlite_store_persists_to_file() {
    let dir = tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("atithi.db").display());

    {
        let store = SqlStore::connect(&url, 2).await.unwrap();
        store
            .insert_admin(AdminAccount::new("admin", "$2b$04$hash"))
            .await
            .unwrap();
        store
            .insert_registration(record("r1", &"c".repeat(64)))
            .await
            .unwrap();
    }

    let reopened = SqlStore::connect(&url, 2).await.unwrap();
    assert_eq!(reopened.count_admins().await.unwrap(), 1);
    assert_eq!(
        reopened.find_registration("r1").await.unwrap(),
        Some(record("r1", &"c".repeat(64)))
    );
}

#[tokio::test]
async fn test_file_store_bootstraps_missing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("data.json");

    JsonFileStore::open(&path).await.unwrap();

    let content: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(content["registrations"], serde_json::json!([]));
    assert_eq!(content["admins"], serde_json::json!([]));
}

#[tokio::test]
async fn test_file_store_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.json");

    {
        let store = JsonFileStore::open(&path).await.unwrap();
        store
            .insert_admin(AdminAccount::new("admin", "$2b$04$hash"))
            .await
            .unwrap();
        store
            .insert_registration(record("r1", &"d".repeat(64)))
            .await
            .unwrap();
    }

    let reopened = JsonFileStore::open(&path).await.unwrap();
    assert_eq!(reopened.count_admins().await.unwrap(), 1);
    assert_eq!(reopened.list_registrations().await.unwrap().len(), 1);
    assert!(!path.with_extension("json.tmp").exists());
}

#[tokio::test]
async fn test_file_layout_uses_camel_case() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.json");
    let store = JsonFileStore::open(&path).await.unwrap();
    store
        .insert_admin(AdminAccount::new("admin", "$2b$04$hash"))
        .await
        .unwrap();
    store
        .insert_registration(record("r1", &"e".repeat(64)))
        .await
        .unwrap();

    let content: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(content["admins"][0]["passwordHash"], "$2b$04$hash");
    assert_eq!(content["registrations"][0]["idHash"], "e".repeat(64));
    assert!(content["registrations"][0]["expiresAt"].is_string());
}

#[tokio::test]
async fn test_file_store_reads_legacy_documents() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.json");
    // Older files have admins without createdAt and may lack arrays entirely
    std::fs::write(
        &path,
        r#"{"admins":[{"id":"1","username":"admin","passwordHash":"$2b$10$abc"}]}"#,
    )
    .unwrap();

    let store = JsonFileStore::open(&path).await.unwrap();
    let admin = store.find_admin_by_username("admin").await.unwrap().unwrap();
    assert_eq!(admin.id, "1");
    assert!(admin.created_at.is_none());
    assert!(store.list_registrations().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_file_store_reads_fractional_days() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.json");
    std::fs::write(
        &path,
        format!(
            r#"{{"registrations":[{{"id":"1735689600000","name":"Asha","idHash":"{}","days":2.5,
                "createdAt":"2025-01-01T00:00:00.000Z","expiresAt":"2025-01-03T12:00:00.000Z"}}],
                "admins":[]}}"#,
            "a".repeat(64)
        ),
    )
    .unwrap();

    let store = JsonFileStore::open(&path).await.unwrap();
    let record = store.find_registration("1735689600000").await.unwrap().unwrap();
    assert_eq!(record.days, 3);
    assert_eq!(
        record.expires_at,
        Utc.with_ymd_and_hms(2025, 1, 3, 12, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn test_corrupt_file_fails_to_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(matches!(
        JsonFileStore::open(&path).await,
        Err(StorageError::Json(_))
    ));
}

#[tokio::test]
async fn test_failed_write_keeps_previous_state() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.json");
    let store = JsonFileStore::open(&path).await.unwrap();
    store
        .insert_registration(record("r1", &"f".repeat(64)))
        .await
        .unwrap();

    // A directory squatting on the temp path makes the next write fail
    std::fs::create_dir(dir.path().join("data.json.tmp")).unwrap();

    assert!(store
        .insert_registration(record("r2", &"f".repeat(64)))
        .await
        .is_err());
    assert_eq!(store.list_registrations().await.unwrap().len(), 1);

    let on_disk: DataDocument =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk.registrations.len(), 1);
}

#[tokio::test]
async fn test_memory_store_snapshot() {
    let dir = tempdir().unwrap();
    let snapshot = dir.path().join("snapshot.json");
    let document = DataDocument {
        registrations: vec![record("r1", &"a".repeat(64))],
        admins: vec![AdminAccount::new("admin", "$2b$04$hash")],
    };
    std::fs::write(&snapshot, serde_json::to_string(&document).unwrap()).unwrap();

    let store = MemoryStore::load_snapshot(&snapshot).await.unwrap();
    assert_eq!(store.count_admins().await.unwrap(), 1);
    assert_eq!(store.list_registrations().await.unwrap().len(), 1);

    // Changes stay in memory
    store.delete_all_registrations().await.unwrap();
    let on_disk: DataDocument =
        serde_json::from_str(&std::fs::read_to_string(&snapshot).unwrap()).unwrap();
    assert_eq!(on_disk.registrations.len(), 1);
}

#[tokio::test]
async fn test_open_store_selects_backend() {
    let dir = tempdir().unwrap();
    let settings = StorageSettings {
        backend: StorageBackend::File,
        path: dir.path().join("data.json"),
        snapshot: None,
        database_url: "sqlite::memory:".to_string(),
        max_connections: 1,
    };

    let store = open_store(&settings).await.unwrap();
    store
        .insert_admin(AdminAccount::new("admin", "$2b$04$hash"))
        .await
        .unwrap();
    assert!(settings.path.exists());

    let memory = open_store(&StorageSettings {
        backend: StorageBackend::Memory,
        ..settings.clone()
    })
    .await
    .unwrap();
    assert_eq!(memory.count_admins().await.unwrap(), 0);

    let sqlite = open_store(&StorageSettings {
        backend: StorageBackend::Sqlite,
        path: PathBuf::from("unused.json"),
        ..settings
    })
    .await
    .unwrap();
    assert_eq!(sqlite.count_admins().await.unwrap(), 0);
}

#[cfg(not(feature = "postgres"))]
#[tokio::test]
async fn test_postgres_backend_needs_feature() {
    let settings = StorageSettings {
        backend: StorageBackend::Postgres,
        path: PathBuf::from("unused.json"),
        snapshot: None,
        database_url: "postgres://localhost/atithi".to_string(),
        max_connections: 1,
    };
    assert!(matches!(
        open_store(&settings).await,
        Err(StorageError::Unsupported(_))
    ));
}

/// Runs against an empty database named by `ATITHI_TEST_DATABASE_URL`
#[cfg(feature = "postgres")]
#[tokio::test]
async fn test_postgres_store_contract() {
    let Ok(url) = std::env::var("ATITHI_TEST_DATABASE_URL") else {
        return;
    };
    let store = atithi_backend::storage::PgStore::connect(&url, 2).await.unwrap();
    exercise_store(&store).await;
}
