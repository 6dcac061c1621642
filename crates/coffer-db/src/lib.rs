//! database layer for coffer.
//!
//! this crate provides persistent storage for:
//! - Users and groups
//! - Vaults and their credential links
//! - Credential envelopes and the three payload tables
//! - Permission assignments
//!
//! all access goes through a [`UnitOfWork`], which pairs one database
//! transaction with the blob writes made under it.

#![warn(missing_docs)]

mod blob;
mod entity;
mod error;
mod migration;
mod payload;
mod unit_of_work;

pub use blob::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use error::Error;
pub use payload::{FileRecord, FlagSetRecord, IntegrityReport, PasswordRecord, TotpRecord};
pub use unit_of_work::UnitOfWork;

use std::sync::Arc;

use sea_orm::{ConnectionTrait, Database as SeaOrmDatabase, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use coffer_types::Config;

/// result type for database operations.
pub type Result<T> = std::result::Result<T, Error>;

/// the coffer store: a database connection plus the blob store for files.
#[derive(Clone)]
pub struct CofferDb {
    conn: DatabaseConnection,
    blobs: Arc<dyn BlobStore>,
}

impl CofferDb {
    /// connect, open the blob directory and run migrations.
    pub async fn new(config: &Config) -> Result<Self> {
        let url = Self::build_connection_url(&config.database)?;
        let conn: DatabaseConnection = SeaOrmDatabase::connect(&url)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        let blobs = FsBlobStore::open(&config.storage.file_store_path).await?;
        let db = Self {
            conn,
            blobs: Arc::new(blobs),
        };

        // enable WAL mode for sqlite if configured
        if config.database.db_type == "sqlite" && config.database.sqlite.write_ahead_log {
            db.enable_wal_mode().await?;
        }

        db.migrate().await?;
        Ok(db)
    }

    /// create an in-memory sqlite database with an in-memory blob store.
    pub async fn new_in_memory() -> Result<Self> {
        Self::new_in_memory_with_blobs(Arc::new(MemoryBlobStore::new())).await
    }

    /// create an in-memory sqlite database over the given blob store.
    pub async fn new_in_memory_with_blobs(blobs: Arc<dyn BlobStore>) -> Result<Self> {
        let conn: DatabaseConnection = SeaOrmDatabase::connect("sqlite::memory:")
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        let db = Self { conn, blobs };
        db.migrate().await?;
        Ok(db)
    }

    /// enable write-ahead logging mode for sqlite.
    ///
    /// must be called before any writes.
    async fn enable_wal_mode(&self) -> Result<()> {
        self.conn
            .execute_unprepared("PRAGMA journal_mode=WAL")
            .await
            .map_err(|e| Error::Connection(format!("failed to enable WAL mode: {}", e)))?;
        tracing::info!("sqlite WAL mode enabled");
        Ok(())
    }

    /// get the current sqlite journal mode.
    #[cfg(test)]
    async fn get_journal_mode(&self) -> Result<String> {
        use sea_orm::FromQueryResult;

        #[derive(FromQueryResult)]
        struct JournalMode {
            journal_mode: String,
        }

        let row = self
            .conn
            .query_one(sea_orm::Statement::from_string(
                sea_orm::DatabaseBackend::Sqlite,
                "PRAGMA journal_mode".to_string(),
            ))
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        match row {
            Some(row) => Ok(JournalMode::from_query_result(&row, "")?.journal_mode),
            None => Ok(String::new()),
        }
    }

    /// build a sea-orm compatible connection url from config.
    fn build_connection_url(config: &coffer_types::DatabaseConfig) -> Result<String> {
        match config.db_type.as_str() {
            "sqlite" => {
                let path = if config.connection_string.starts_with("sqlite:") {
                    config.connection_string.clone()
                } else {
                    format!("sqlite:{}", config.connection_string)
                };
                // add ?mode=rwc to create file if it doesn't exist
                if path.contains('?') {
                    Ok(path)
                } else {
                    Ok(format!("{}?mode=rwc", path))
                }
            }
            "postgres" | "postgresql" => Ok(config.connection_string.clone()),
            other => Err(Error::InvalidData(format!(
                "unsupported database type: {}",
                other
            ))),
        }
    }

    /// run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        migration::Migrator::up(&self.conn, None)
            .await
            .map_err(|e| Error::Migration(e.to_string()))?;
        Ok(())
    }

    /// ping the database to verify connectivity.
    pub async fn ping(&self) -> Result<()> {
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        Ok(())
    }

    /// open a unit of work.
    ///
    /// no other query may run on this handle while the unit is open; an
    /// in-memory database has a single connection.
    pub async fn begin(&self) -> Result<UnitOfWork> {
        UnitOfWork::begin(&self.conn, Arc::clone(&self.blobs)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coffer_types::{
        Credential, CredentialKind, FeatureFlag, Identity, Permission, PermissionAssignment,
        Resource, User, Vault,
    };

    async fn setup_test_db() -> (CofferDb, Arc<MemoryBlobStore>) {
        let blobs = Arc::new(MemoryBlobStore::new());
        let db = CofferDb::new_in_memory_with_blobs(blobs.clone())
            .await
            .unwrap();
        (db, blobs)
    }

    async fn create_file_credential(uow: &UnitOfWork, data: &[u8]) -> Credential {
        let blob_key = uow.put_blob(data).await.unwrap();
        let record = uow
            .create_file(&FileRecord {
                id: 0,
                blob_key,
                file_name: "key.pem".to_string(),
                expires_at: None,
            })
            .await
            .unwrap();
        uow.create_credential(&Credential::new(
            "key".to_string(),
            String::new(),
            CredentialKind::File,
            record.id,
        ))
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let (db, _) = setup_test_db().await;
        db.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_user_crud() {
        let (db, _) = setup_test_db().await;
        let uow = db.begin().await.unwrap();

        let user = uow.create_user(&User::new("alice".to_string())).await.unwrap();
        assert!(user.id.0 > 0);

        let by_pid = uow.get_user_by_pid(&user.pid).await.unwrap().unwrap();
        assert_eq!(by_pid.id, user.id);

        let by_name = uow.get_user_by_name("alice").await.unwrap().unwrap();
        assert_eq!(by_name.pid, user.pid);

        assert!(uow.get_user_by_name("bob").await.unwrap().is_none());
        uow.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let (db, _) = setup_test_db().await;
        let uow = db.begin().await.unwrap();

        uow.create_user(&User::new("alice".to_string())).await.unwrap();
        let result = uow.create_user(&User::new("alice".to_string())).await;
        assert!(
            matches!(result, Err(Error::AlreadyExists(_))),
            "duplicate username should be rejected"
        );
    }

    #[tokio::test]
    async fn test_rollback_discards_rows_and_written_blobs() {
        let (db, blobs) = setup_test_db().await;

        let uow = db.begin().await.unwrap();
        let credential = create_file_credential(&uow, b"ciphertext").await;
        assert_eq!(blobs.len(), 1);
        uow.rollback().await.unwrap();

        assert!(blobs.is_empty(), "blob written in the unit should be gone");
        let uow = db.begin().await.unwrap();
        assert!(
            uow.get_credential_by_pid(&credential.pid)
                .await
                .unwrap()
                .is_none()
        );
        assert!(uow.integrity_report().await.unwrap().is_clean());
    }

    #[tokio::test]
    async fn test_commit_deletes_retired_blobs() {
        let (db, blobs) = setup_test_db().await;

        let uow = db.begin().await.unwrap();
        let credential = create_file_credential(&uow, b"ciphertext").await;
        uow.commit().await.unwrap();
        assert_eq!(blobs.len(), 1);

        let uow = db.begin().await.unwrap();
        uow.delete_credential(&credential).await.unwrap();
        // still there until commit
        assert_eq!(blobs.len(), 1);
        uow.commit().await.unwrap();
        assert!(blobs.is_empty());
    }

    #[tokio::test]
    async fn test_rolled_back_delete_keeps_blob() {
        let (db, blobs) = setup_test_db().await;

        let uow = db.begin().await.unwrap();
        let credential = create_file_credential(&uow, b"ciphertext").await;
        uow.commit().await.unwrap();

        let uow = db.begin().await.unwrap();
        uow.delete_credential(&credential).await.unwrap();
        uow.rollback().await.unwrap();

        assert_eq!(blobs.len(), 1);
        let uow = db.begin().await.unwrap();
        assert!(uow.get_credential(credential.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_finish_commits_ok_and_rolls_back_err() {
        let (db, _) = setup_test_db().await;

        let uow = db.begin().await.unwrap();
        let result: Result<User> =
            async { uow.create_user(&User::new("kept".to_string())).await }.await;
        uow.finish(result).await.unwrap();

        let uow = db.begin().await.unwrap();
        let result: Result<()> = async {
            uow.create_user(&User::new("dropped".to_string())).await?;
            Err(Error::InvalidData("boom".to_string()))
        }
        .await;
        assert!(uow.finish(result).await.is_err());

        let uow = db.begin().await.unwrap();
        assert!(uow.get_user_by_name("kept").await.unwrap().is_some());
        assert!(uow.get_user_by_name("dropped").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_credential_removes_every_dependent_row() {
        let (db, _) = setup_test_db().await;
        let uow = db.begin().await.unwrap();

        let user = uow.create_user(&User::new("owner".to_string())).await.unwrap();
        let vault = uow
            .create_vault(&Vault::new("team".to_string(), String::new()))
            .await
            .unwrap();

        let set = uow
            .create_flag_set(
                "web",
                "prod",
                &[FeatureFlag::new("env", "prod"), FeatureFlag::new("beta", "on")],
            )
            .await
            .unwrap();
        let credential = uow
            .create_credential(&Credential::new(
                "flags".to_string(),
                String::new(),
                CredentialKind::FeatureFlags,
                set.id,
            ))
            .await
            .unwrap();
        uow.link_credential(vault.id, credential.id).await.unwrap();
        uow.create_assignment(&PermissionAssignment::new(
            Identity::User(user.id),
            user.pid.clone(),
            Resource::Credential(credential.id),
            credential.pid.clone(),
            Permission::Owner,
        ))
        .await
        .unwrap();

        uow.delete_credential(&credential).await.unwrap();

        assert!(uow.get_credential(credential.id).await.unwrap().is_none());
        assert!(uow.get_flag_set(set.id).await.unwrap().is_none());
        assert!(uow.credentials_in_vault(vault.id).await.unwrap().is_empty());
        assert!(
            uow.assignments_on(Resource::Credential(credential.id))
                .await
                .unwrap()
                .is_empty()
        );
        assert!(uow.integrity_report().await.unwrap().is_clean());
    }

    #[tokio::test]
    async fn test_flag_keys_unique_per_set() {
        let (db, _) = setup_test_db().await;
        let uow = db.begin().await.unwrap();

        let a = uow
            .create_flag_set("a", "dev", &[FeatureFlag::new("region", "eu")])
            .await
            .unwrap();
        let b = uow
            .create_flag_set("b", "dev", &[FeatureFlag::new("region", "us")])
            .await
            .unwrap();

        let dup = uow.add_flags(a.id, &[FeatureFlag::new("region", "ap")]).await;
        assert!(matches!(dup, Err(Error::AlreadyExists(_))));

        assert!(uow.set_flag_value(b.id, "region", "us-east").await.unwrap());
        assert!(!uow.set_flag_value(b.id, "missing", "x").await.unwrap());
        assert_eq!(
            uow.get_flag(b.id, "region").await.unwrap().unwrap().value,
            "us-east"
        );
        assert!(uow.remove_flag(a.id, "region").await.unwrap());
        assert!(!uow.remove_flag(a.id, "region").await.unwrap());
    }

    #[tokio::test]
    async fn test_one_assignment_per_pair() {
        let (db, _) = setup_test_db().await;
        let uow = db.begin().await.unwrap();

        let user = uow.create_user(&User::new("u".to_string())).await.unwrap();
        let vault = uow
            .create_vault(&Vault::new("v".to_string(), String::new()))
            .await
            .unwrap();

        let edge = |permission| {
            PermissionAssignment::new(
                Identity::User(user.id),
                user.pid.clone(),
                Resource::Vault(vault.id),
                vault.pid.clone(),
                permission,
            )
        };

        let first = uow.create_assignment(&edge(Permission::View)).await.unwrap();
        let second = uow.create_assignment(&edge(Permission::Admin)).await;
        assert!(matches!(second, Err(Error::AlreadyExists(_))));

        let updated = uow
            .update_assignment_permission(&first, Permission::Edit)
            .await
            .unwrap();
        assert_eq!(updated.permission, Permission::Edit);
        assert_eq!(
            uow.direct_permission(Identity::User(user.id), Resource::Vault(vault.id))
                .await
                .unwrap(),
            Some(Permission::Edit)
        );
    }

    #[tokio::test]
    async fn test_integrity_report_detects_orphans() {
        let (db, _) = setup_test_db().await;
        let uow = db.begin().await.unwrap();

        // payload with no envelope
        uow.create_flag_set("stray", "dev", &[FeatureFlag::new("k", "v")])
            .await
            .unwrap();

        // link to a vault that does not exist
        let credential = create_file_credential(&uow, b"x").await;
        uow.link_credential(coffer_types::VaultId(999), credential.id)
            .await
            .unwrap();

        // blob with no file row
        uow.put_blob(b"stray").await.unwrap();

        let report = uow.integrity_report().await.unwrap();
        assert_eq!(report.orphaned_payloads, 1);
        assert_eq!(report.dangling_vault_links, 1);
        assert_eq!(report.orphaned_flags, 0);
        assert_eq!(report.orphaned_blobs, 1);
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn test_retired_blob_is_not_an_orphan_before_commit() {
        let (db, blobs) = setup_test_db().await;

        let uow = db.begin().await.unwrap();
        let credential = create_file_credential(&uow, b"ciphertext").await;
        uow.commit().await.unwrap();

        let uow = db.begin().await.unwrap();
        uow.delete_credential(&credential).await.unwrap();
        assert_eq!(blobs.len(), 1);
        assert!(uow.integrity_report().await.unwrap().is_clean());
        uow.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_commit_deletes_written_blobs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.database.connection_string = temp_dir
            .path()
            .join("locked.db")
            .to_string_lossy()
            .to_string();
        // a rollback journal makes readers block the writer's commit
        config.database.sqlite.write_ahead_log = false;
        config.storage.file_store_path = temp_dir.path().join("filestore");

        let db = CofferDb::new(&config).await.unwrap();
        let other = CofferDb::new(&config).await.unwrap();

        let reader = other.begin().await.unwrap();
        reader.get_user_by_name("nobody").await.unwrap();

        let uow = db.begin().await.unwrap();
        let credential = create_file_credential(&uow, b"ciphertext").await;
        let written = std::fs::read_dir(&config.storage.file_store_path)
            .unwrap()
            .count();
        assert_eq!(written, 1);

        assert!(uow.commit().await.is_err());
        reader.rollback().await.unwrap();

        let left = std::fs::read_dir(&config.storage.file_store_path)
            .unwrap()
            .count();
        assert_eq!(left, 0, "blob of a failed commit should be deleted");

        let uow = db.begin().await.unwrap();
        assert!(
            uow.get_credential_by_pid(&credential.pid)
                .await
                .unwrap()
                .is_none()
        );
        assert!(uow.integrity_report().await.unwrap().is_clean());
        uow.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_failing_late_restores_every_row() {
        let (db, _) = setup_test_db().await;

        let uow = db.begin().await.unwrap();
        let user = uow.create_user(&User::new("owner".to_string())).await.unwrap();
        let vault = uow
            .create_vault(&Vault::new("team".to_string(), String::new()))
            .await
            .unwrap();
        let set = uow
            .create_flag_set("web", "prod", &[FeatureFlag::new("env", "prod")])
            .await
            .unwrap();
        let credential = uow
            .create_credential(&Credential::new(
                "flags".to_string(),
                String::new(),
                CredentialKind::FeatureFlags,
                set.id,
            ))
            .await
            .unwrap();
        uow.link_credential(vault.id, credential.id).await.unwrap();
        uow.create_assignment(&PermissionAssignment::new(
            Identity::User(user.id),
            user.pid.clone(),
            Resource::Credential(credential.id),
            credential.pid.clone(),
            Permission::Owner,
        ))
        .await
        .unwrap();
        uow.commit().await.unwrap();

        // the envelope is removed last; refusing it fails the protocol
        // after links, flags, payload and assignments are already gone
        db.conn
            .execute_unprepared(
                "CREATE TRIGGER keep_credentials BEFORE DELETE ON credentials \
                 BEGIN SELECT RAISE(ABORT, 'credential is kept'); END",
            )
            .await
            .unwrap();

        let uow = db.begin().await.unwrap();
        let result = uow.delete_credential(&credential).await;
        assert!(result.is_err());
        assert!(uow.finish(result).await.is_err());

        let uow = db.begin().await.unwrap();
        assert!(uow.get_credential(credential.id).await.unwrap().is_some());
        assert_eq!(
            uow.get_flag(set.id, "env").await.unwrap().unwrap().value,
            "prod"
        );
        assert_eq!(uow.credentials_in_vault(vault.id).await.unwrap().len(), 1);
        assert_eq!(
            uow.direct_permission(Identity::User(user.id), Resource::Credential(credential.id))
                .await
                .unwrap(),
            Some(Permission::Owner)
        );
        assert!(uow.integrity_report().await.unwrap().is_clean());
        uow.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_sqlite_wal_mode_enabled() {
        // WAL mode requires a file-based database, not :memory:
        let temp_dir = tempfile::tempdir().unwrap();

        let mut config = Config::default();
        config.database.connection_string = temp_dir
            .path()
            .join("test_wal.db")
            .to_string_lossy()
            .to_string();
        config.database.sqlite.write_ahead_log = true;
        config.storage.file_store_path = temp_dir.path().join("filestore");

        let db = CofferDb::new(&config).await.unwrap();
        let mode = db.get_journal_mode().await.unwrap();

        assert_eq!(mode.to_lowercase(), "wal", "journal mode should be WAL");
        assert!(config.storage.file_store_path.is_dir());
    }

    #[tokio::test]
    async fn test_in_memory_is_not_wal() {
        let (db, _) = setup_test_db().await;
        let mode = db.get_journal_mode().await.unwrap();
        assert_ne!(mode.to_lowercase(), "wal");
    }

    #[test]
    fn test_unsupported_db_type() {
        let mut config = coffer_types::DatabaseConfig::default();
        config.db_type = "mysql".to_string();
        assert!(matches!(
            CofferDb::build_connection_url(&config),
            Err(Error::InvalidData(_))
        ));
    }
}
