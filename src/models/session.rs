//! Session model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Login session; its id is the opaque auth token handed to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session token (UUID v4)
    pub id: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Issue a fresh token for `user_id` valid for `ttl`.
    pub fn issue(user_id: i64, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + ttl,
            created_at: now,
        }
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}
