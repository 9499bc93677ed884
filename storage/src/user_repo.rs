//! User repository: persistence for per-chat subscription records.
//!
//! Uses SqlitePoolManager; callers use the [`Repository`] methods plus `set_active` / `list_active`.

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::models::UserRecord;
use crate::repository::{RecordKey, Repository};
use crate::sqlite_pool::SqlitePoolManager;

#[derive(Clone)]
pub struct UserRepository {
    pool_manager: SqlitePoolManager,
}

impl UserRepository {
    /// Opens the database and creates the schema if needed.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool_manager = SqlitePoolManager::new(database_url).await?;
        let repo = Self { pool_manager };
        repo.init().await?;
        Ok(repo)
    }

    async fn init(&self) -> Result<(), StorageError> {
        info!("Creating database tables if not exist");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                active INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(self.pool_manager.pool())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_active ON users(active)")
            .execute(self.pool_manager.pool())
            .await?;

        Ok(())
    }

    /// Flips the `active` flag. Returns false when no record has that key.
    pub async fn set_active(&self, key: RecordKey, active: bool) -> Result<bool, StorageError> {
        let result = sqlx::query("UPDATE users SET active = ?, updated_at = ? WHERE id = ?")
            .bind(active)
            .bind(Utc::now())
            .bind(key)
            .execute(self.pool_manager.pool())
            .await?;

        let updated = result.rows_affected() > 0;
        info!(user_id = key, active, updated, "Set user active flag");
        Ok(updated)
    }

    pub async fn list_active(&self) -> Result<Vec<UserRecord>, StorageError> {
        let users = sqlx::query_as::<_, UserRecord>(
            "SELECT id, active, created_at, updated_at FROM users WHERE active = 1 ORDER BY id",
        )
        .fetch_all(self.pool_manager.pool())
        .await?;
        Ok(users)
    }

    /// Closes the underlying pool. Used on shutdown.
    pub async fn close(&self) {
        self.pool_manager.close().await;
    }
}

#[async_trait]
impl Repository<UserRecord> for UserRepository {
    async fn get(&self, key: RecordKey) -> Result<Option<UserRecord>, StorageError> {
        let user = sqlx::query_as::<_, UserRecord>(
            "SELECT id, active, created_at, updated_at FROM users WHERE id = ?",
        )
        .bind(key)
        .fetch_optional(self.pool_manager.pool())
        .await?;

        debug!(user_id = key, found = user.is_some(), "Fetched user");
        Ok(user)
    }

    async fn put(&self, record: &UserRecord) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, active, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                active = excluded.active,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(record.id)
        .bind(record.active)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(self.pool_manager.pool())
        .await?;

        info!(user_id = record.id, active = record.active, "Saved user");
        Ok(())
    }

    async fn delete(&self, key: RecordKey) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(key)
            .execute(self.pool_manager.pool())
            .await?;

        let deleted = result.rows_affected() > 0;
        info!(user_id = key, deleted, "Deleted user");
        Ok(deleted)
    }

    async fn list(&self) -> Result<Vec<UserRecord>, StorageError> {
        let users = sqlx::query_as::<_, UserRecord>(
            "SELECT id, active, created_at, updated_at FROM users ORDER BY id",
        )
        .fetch_all(self.pool_manager.pool())
        .await?;

        info!("Retrieved {} users", users.len());
        Ok(users)
    }
}
