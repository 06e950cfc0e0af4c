use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use studio_core::error::StorageError;

#[derive(Debug, Clone)]
pub struct SnapshotSummary {
    pub id: String,
    pub updated_at: DateTime<Utc>,
}

/// Local cache of serialised editing sessions, keyed by session id.
pub struct SnapshotRepo {
    pool: SqlitePool,
}

impl SnapshotRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, id: &str, user_id: &str, json: &str) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO session_snapshots (id, user_id, snapshot_json, updated_at) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET snapshot_json = excluded.snapshot_json, \
             updated_at = excluded.updated_at \
             WHERE session_snapshots.user_id = excluded.user_id",
        )
        .bind(id)
        .bind(user_id)
        .bind(json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(())
    }

    /// Load a snapshot owned by `user_id`; other users' sessions are not found.
    pub async fn load(&self, id: &str, user_id: &str) -> Result<String, StorageError> {
        let row: (String,) = sqlx::query_as(
            "SELECT snapshot_json FROM session_snapshots WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?
        .ok_or_else(|| StorageError::NotFound(format!("session {id}")))?;
        Ok(row.0)
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<SnapshotSummary>, StorageError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT id, updated_at FROM session_snapshots WHERE user_id = ? \
             ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(id, updated_at)| SnapshotSummary {
                id,
                updated_at: DateTime::parse_from_rfc3339(&updated_at)
                    .unwrap_or_default()
                    .with_timezone(&Utc),
            })
            .collect())
    }

    pub async fn delete(&self, id: &str, user_id: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM session_snapshots WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(())
    }
}
