//! Per-chat subscription record.
//!
//! Maps to the `users` table and is used by UserRepository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRecord {
    /// Chat id; the record key.
    pub id: i64,
    /// Whether daily reminders are enabled.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// Creates an active record stamped with the current time.
    pub fn new(id: i64) -> Self {
        let now = Utc::now();
        Self {
            id,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns a copy with `active` replaced and `updated_at` refreshed.
    pub fn with_active(&self, active: bool) -> Self {
        Self {
            active,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }
}
