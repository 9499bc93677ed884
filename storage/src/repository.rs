use async_trait::async_trait;

use crate::error::StorageError;

/// Stable key of a persisted record (the chat id).
pub type RecordKey = i64;

/// Minimal CRUD contract. A missing key is never an error: `get` returns `None`, `delete` returns `false`.
#[async_trait]
pub trait Repository<T>: Send + Sync {
    async fn get(&self, key: RecordKey) -> Result<Option<T>, StorageError>;
    /// Inserts or replaces the record stored under its key.
    async fn put(&self, record: &T) -> Result<(), StorageError>;
    async fn delete(&self, key: RecordKey) -> Result<bool, StorageError>;
    async fn list(&self) -> Result<Vec<T>, StorageError>;
}
