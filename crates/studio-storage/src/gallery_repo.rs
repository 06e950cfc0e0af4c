use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use studio_core::catalog::BackendId;
use studio_core::error::StorageError;
use studio_core::history::{GalleryItem, ResultRef};

type GalleryRow = (String, String, Option<String>, String, String, String, i64, String);

/// Append-only log of every generation a user has paid for.
pub struct GalleryRepo {
    pool: SqlitePool,
}

impl GalleryRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn append(&self, item: &GalleryItem) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO gallery (id, user_id, session_id, backend, prompt, result, \
             cost, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&item.id)
        .bind(&item.user_id)
        .bind(&item.session_id)
        .bind(item.backend.as_str())
        .bind(&item.prompt)
        .bind(item.result.as_str())
        .bind(crate::account_repo::to_sql_credits(item.cost)?)
        .bind(item.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(())
    }

    /// Newest first.
    pub async fn list(&self, user_id: &str, limit: u32) -> Result<Vec<GalleryItem>, StorageError> {
        let rows: Vec<GalleryRow> = sqlx::query_as(
            "SELECT id, user_id, session_id, backend, prompt, result, cost, created_at \
             FROM gallery WHERE user_id = ? ORDER BY rowid DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        rows.into_iter().map(row_to_item).collect()
    }

    pub async fn count(&self, user_id: &str) -> Result<u64, StorageError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM gallery WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(row.0 as u64)
    }
}

fn row_to_item(row: GalleryRow) -> Result<GalleryItem, StorageError> {
    let backend: BackendId = row
        .3
        .parse()
        .map_err(|e: String| StorageError::Serialization(e))?;

    Ok(GalleryItem {
        id: row.0,
        user_id: row.1,
        session_id: row.2,
        backend,
        prompt: row.4,
        result: ResultRef(row.5),
        cost: row.6.max(0) as u64,
        created_at: DateTime::parse_from_rfc3339(&row.7)
            .unwrap_or_default()
            .with_timezone(&Utc),
    })
}
