//! Follow repository
//!
//! Subscriptions of a user to an author.

use crate::db::{Backend, DynDatabasePool};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

/// Follow repository trait
#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Subscribe `user_id` to `author_id`. Returns false if already subscribed
    async fn add(&self, user_id: i64, author_id: i64) -> Result<bool>;

    /// Unsubscribe. Returns false if there was no subscription
    async fn remove(&self, user_id: i64, author_id: i64) -> Result<bool>;

    /// Check whether `user_id` follows `author_id`
    async fn exists(&self, user_id: i64, author_id: i64) -> Result<bool>;
}

/// SQLx-based follow repository implementation
pub struct SqlxFollowRepository {
    pool: DynDatabasePool,
}

impl SqlxFollowRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn FollowRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl FollowRepository for SqlxFollowRepository {
    async fn add(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query("INSERT OR IGNORE INTO follows (user_id, author_id) VALUES (?, ?)")
                    .bind(user_id)
                    .bind(author_id)
                    .execute(pool)
                    .await
                    .map(|r| r.rows_affected())
            }
            Backend::Mysql(pool) => {
                sqlx::query("INSERT IGNORE INTO follows (user_id, author_id) VALUES (?, ?)")
                    .bind(user_id)
                    .bind(author_id)
                    .execute(pool)
                    .await
                    .map(|r| r.rows_affected())
            }
        }
        .context("Failed to add follow")?;

        Ok(affected > 0)
    }

    async fn remove(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let sql = "DELETE FROM follows WHERE user_id = ? AND author_id = ?";
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(user_id)
                .bind(author_id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(user_id)
                .bind(author_id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to remove follow")?;

        Ok(affected > 0)
    }

    async fn exists(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let sql = "SELECT COUNT(*) AS count FROM follows WHERE user_id = ? AND author_id = ?";
        let count: i64 = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(user_id)
                .bind(author_id)
                .fetch_one(pool)
                .await
                .map(|row| row.get("count")),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(user_id)
                .bind(author_id)
                .fetch_one(pool)
                .await
                .map(|row| row.get("count")),
        }
        .context("Failed to check follow")?;

        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxFollowRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        for id in [1, 2] {
            sqlx::query(
                "INSERT INTO users (id, email, username, first_name, last_name, password_hash) \
                 VALUES (?, ?, ?, 'F', 'L', 'h')",
            )
            .bind(id)
            .bind(format!("u{}@example.com", id))
            .bind(format!("u{}", id))
            .execute(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        }
        SqlxFollowRepository::new(pool)
    }

    #[tokio::test]
    async fn test_follow_lifecycle() {
        let repo = setup().await;

        assert!(!repo.exists(1, 2).await.unwrap());
        assert!(repo.add(1, 2).await.unwrap());
        assert!(!repo.add(1, 2).await.unwrap());
        assert!(repo.exists(1, 2).await.unwrap());
        assert!(!repo.exists(2, 1).await.unwrap());

        assert!(repo.remove(1, 2).await.unwrap());
        assert!(!repo.remove(1, 2).await.unwrap());
        assert!(!repo.exists(1, 2).await.unwrap());
    }

    #[tokio::test]
    async fn test_self_follow_never_stored() {
        let repo = setup().await;
        // OR IGNORE also skips the CHECK violation
        assert!(!repo.add(1, 1).await.unwrap());
        assert!(!repo.exists(1, 1).await.unwrap());
    }
}
