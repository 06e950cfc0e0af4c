use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use studio_core::config::AppConfig;
use studio_core::error::StorageError;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn open(config: &AppConfig) -> Result<Self, StorageError> {
        let db_dir = config.data_path();
        std::fs::create_dir_all(&db_dir).map_err(|e| StorageError::Database(e.to_string()))?;

        let db_path = db_dir.join("studio.db");
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;

        tracing::debug!(path = %db_path.display(), "database opened");
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::query(include_str!("../migrations/001_initial.sql"))
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Migration(e.to_string()))?;
        Ok(())
    }

    pub fn accounts(&self) -> super::AccountRepo {
        super::AccountRepo::new(self.pool.clone())
    }

    pub fn gallery(&self) -> super::GalleryRepo {
        super::GalleryRepo::new(self.pool.clone())
    }

    pub fn snapshots(&self) -> super::SnapshotRepo {
        super::SnapshotRepo::new(self.pool.clone())
    }

    /// Account store charging `user_id`, for use by generation sessions.
    pub fn account_store(&self, user_id: impl Into<String>) -> super::SqliteAccountStore {
        super::SqliteAccountStore::new(self.accounts(), user_id.into())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
