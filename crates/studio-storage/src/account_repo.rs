use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use studio_core::account::AccountStore;
use studio_core::error::{AccountError, StorageError};

#[derive(Clone)]
pub struct AccountRepo {
    pool: SqlitePool,
}

impl AccountRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the account with `starting_credits` unless it exists. Returns the balance.
    pub async fn ensure(&self, user_id: &str, starting_credits: u64) -> Result<u64, StorageError> {
        let now = Utc::now().to_rfc3339();
        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO accounts (id, credits, created_at, updated_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(to_sql_credits(starting_credits)?)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?
        .rows_affected();

        if inserted > 0 {
            tracing::info!(user = user_id, credits = starting_credits, "account created");
        }
        self.credits(user_id).await
    }

    pub async fn credits(&self, user_id: &str) -> Result<u64, StorageError> {
        let row: (i64,) = sqlx::query_as("SELECT credits FROM accounts WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?
            .ok_or_else(|| StorageError::NotFound(format!("account {user_id}")))?;
        Ok(row.0.max(0) as u64)
    }

    /// Add purchased or promotional credits. Returns the new balance.
    pub async fn grant(&self, user_id: &str, amount: u64) -> Result<u64, StorageError> {
        let amount = to_sql_credits(amount)?;
        // SQLite turns an overflowing sum into a REAL; refuse instead
        let updated = sqlx::query(
            "UPDATE accounts SET credits = credits + ?, updated_at = ? \
             WHERE id = ? AND credits <= ?",
        )
        .bind(amount)
        .bind(Utc::now().to_rfc3339())
        .bind(user_id)
        .bind(i64::MAX - amount)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?
        .rows_affected();

        if updated == 0 {
            let balance = self.credits(user_id).await?;
            return Err(StorageError::Invalid(format!(
                "granting {amount} credits to {user_id} would overflow a balance of {balance}"
            )));
        }
        self.credits(user_id).await
    }

    /// Atomic check-and-decrement; concurrent callers cannot overdraw.
    pub async fn deduct(&self, user_id: &str, amount: u64) -> Result<(), AccountError> {
        // No stored balance exceeds i64::MAX, so a larger amount can never be covered
        let Ok(sql_amount) = i64::try_from(amount) else {
            let available = self.credits(user_id).await?;
            return Err(AccountError::InsufficientCredits {
                required: amount,
                available,
            });
        };

        let updated = sqlx::query(
            "UPDATE accounts SET credits = credits - ?, updated_at = ? \
             WHERE id = ? AND credits >= ?",
        )
        .bind(sql_amount)
        .bind(Utc::now().to_rfc3339())
        .bind(user_id)
        .bind(sql_amount)
        .execute(&self.pool)
        .await
        .map_err(|e| AccountError::Storage(e.to_string()))?
        .rows_affected();

        if updated == 0 {
            let available = self.credits(user_id).await?;
            return Err(AccountError::InsufficientCredits {
                required: amount,
                available,
            });
        }
        Ok(())
    }
}

/// SQLite integers are signed 64-bit.
pub(crate) fn to_sql_credits(amount: u64) -> Result<i64, StorageError> {
    i64::try_from(amount)
        .map_err(|_| StorageError::Invalid(format!("{amount} credits is out of range")))
}

/// [`AccountStore`] bound to one user of the local database.
#[derive(Clone)]
pub struct SqliteAccountStore {
    repo: AccountRepo,
    user_id: String,
}

impl SqliteAccountStore {
    pub fn new(repo: AccountRepo, user_id: String) -> Self {
        Self { repo, user_id }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

#[async_trait]
impl AccountStore for SqliteAccountStore {
    async fn get_credits(&self) -> Result<u64, AccountError> {
        Ok(self.repo.credits(&self.user_id).await?)
    }

    async fn deduct_credits(&self, amount: u64) -> Result<(), AccountError> {
        self.repo.deduct(&self.user_id, amount).await
    }
}
