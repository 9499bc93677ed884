//! Storage crate: per-chat record persistence and repository abstractions.
//!
//! ## Modules
//!
//! - [`error`] – Storage error types
//! - [`models`] – UserRecord
//! - [`repository`] – Repository trait
//! - [`user_repo`] – UserRepository (SQLite)
//! - [`sqlite_pool`] – SqlitePoolManager

mod error;
mod models;
mod repository;
mod sqlite_pool;
mod user_repo;


pub use error::StorageError;
pub use models::UserRecord;
pub use repository::{RecordKey, Repository};
pub use sqlite_pool::SqlitePoolManager;
pub use user_repo::UserRepository;
