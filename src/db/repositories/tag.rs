//! Tag repository
//!
//! Database operations for tags.
//!
//! This module provides:
//! - `TagRepository` trait defining the interface for tag data access
//! - `SqlxTagRepository` implementing the trait for SQLite and MySQL

use super::placeholders;
use crate::db::{Backend, DynDatabasePool};
use crate::models::{CreateTagInput, Tag};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Unique tag column used for lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagField {
    Name,
    Color,
    Slug,
}

impl TagField {
    fn column(&self) -> &'static str {
        match self {
            TagField::Name => "name",
            TagField::Color => "color",
            TagField::Slug => "slug",
        }
    }
}

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Create a new tag
    async fn create(&self, input: &CreateTagInput) -> Result<Tag>;

    /// Get tag by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>>;

    /// Get tag by one of its unique fields
    async fn get_by_field(&self, field: TagField, value: &str) -> Result<Option<Tag>>;

    /// Get all tags whose id is in `ids` (missing ids are skipped)
    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Tag>>;

    /// List all tags ordered by name
    async fn list(&self) -> Result<Vec<Tag>>;
}

/// SQLx-based tag repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    /// Create a new SQLx tag repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, input: &CreateTagInput) -> Result<Tag> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_tag_sqlite(pool, input).await,
            Backend::Mysql(pool) => create_tag_mysql(pool, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>> {
        let sql = "SELECT id, name, color, slug FROM tags WHERE id = ?";
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get tag by ID")?;
                Ok(row.as_ref().map(row_to_tag_sqlite))
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get tag by ID")?;
                Ok(row.as_ref().map(row_to_tag_mysql))
            }
        }
    }

    async fn get_by_field(&self, field: TagField, value: &str) -> Result<Option<Tag>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_tag_by_field_sqlite(pool, field, value).await,
            Backend::Mysql(pool) => get_tag_by_field_mysql(pool, field, value).await,
        }
    }

    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Tag>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_tags_by_ids_sqlite(pool, ids).await,
            Backend::Mysql(pool) => get_tags_by_ids_mysql(pool, ids).await,
        }
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        let sql = "SELECT id, name, color, slug FROM tags ORDER BY name ASC";
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(sql)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list tags")?;
                Ok(rows.iter().map(row_to_tag_sqlite).collect())
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(sql)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list tags")?;
                Ok(rows.iter().map(row_to_tag_mysql).collect())
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_tag_sqlite(pool: &SqlitePool, input: &CreateTagInput) -> Result<Tag> {
    let result = sqlx::query("INSERT INTO tags (name, color, slug) VALUES (?, ?, ?)")
        .bind(&input.name)
        .bind(&input.color)
        .bind(&input.slug)
        .execute(pool)
        .await
        .context("Failed to create tag")?;

    Ok(Tag {
        id: result.last_insert_rowid(),
        name: input.name.clone(),
        color: input.color.clone(),
        slug: input.slug.clone(),
    })
}

async fn get_tag_by_field_sqlite(
    pool: &SqlitePool,
    field: TagField,
    value: &str,
) -> Result<Option<Tag>> {
    let sql = format!(
        "SELECT id, name, color, slug FROM tags WHERE {} = ?",
        field.column()
    );
    let row = sqlx::query(&sql)
        .bind(value)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get tag by {}", field.column()))?;

    Ok(row.as_ref().map(row_to_tag_sqlite))
}

async fn get_tags_by_ids_sqlite(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<Tag>> {
    let sql = format!(
        "SELECT id, name, color, slug FROM tags WHERE id IN ({}) ORDER BY name ASC",
        placeholders(ids.len())
    );
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(*id);
    }
    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to get tags by IDs")?;

    Ok(rows.iter().map(row_to_tag_sqlite).collect())
}

pub(crate) fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        color: row.get("color"),
        slug: row.get("slug"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_tag_mysql(pool: &MySqlPool, input: &CreateTagInput) -> Result<Tag> {
    let result = sqlx::query("INSERT INTO tags (name, color, slug) VALUES (?, ?, ?)")
        .bind(&input.name)
        .bind(&input.color)
        .bind(&input.slug)
        .execute(pool)
        .await
        .context("Failed to create tag")?;

    Ok(Tag {
        id: result.last_insert_id() as i64,
        name: input.name.clone(),
        color: input.color.clone(),
        slug: input.slug.clone(),
    })
}

async fn get_tag_by_field_mysql(
    pool: &MySqlPool,
    field: TagField,
    value: &str,
) -> Result<Option<Tag>> {
    let sql = format!(
        "SELECT id, name, color, slug FROM tags WHERE {} = ?",
        field.column()
    );
    let row = sqlx::query(&sql)
        .bind(value)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get tag by {}", field.column()))?;

    Ok(row.as_ref().map(row_to_tag_mysql))
}

async fn get_tags_by_ids_mysql(pool: &MySqlPool, ids: &[i64]) -> Result<Vec<Tag>> {
    let sql = format!(
        "SELECT id, name, color, slug FROM tags WHERE id IN ({}) ORDER BY name ASC",
        placeholders(ids.len())
    );
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(*id);
    }
    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to get tags by IDs")?;

    Ok(rows.iter().map(row_to_tag_mysql).collect())
}

pub(crate) fn row_to_tag_mysql(row: &sqlx::mysql::MySqlRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        color: row.get("color"),
        slug: row.get("slug"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxTagRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxTagRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_get_tag() {
        let repo = setup_test_repo().await;

        let created = repo
            .create(&CreateTagInput::new("Breakfast", "#E26C2D", "breakfast"))
            .await
            .expect("Failed to create tag");
        assert!(created.id > 0);

        let found = repo
            .get_by_id(created.id)
            .await
            .expect("Failed to get tag")
            .expect("Tag not found");
        assert_eq!(found, created);
        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_by_field() {
        let repo = setup_test_repo().await;
        let tag = repo
            .create(&CreateTagInput::new("Lunch", "#49B64E", "lunch"))
            .await
            .unwrap();

        assert_eq!(repo.get_by_field(TagField::Name, "Lunch").await.unwrap(), Some(tag.clone()));
        assert_eq!(repo.get_by_field(TagField::Color, "#49B64E").await.unwrap(), Some(tag.clone()));
        assert_eq!(repo.get_by_field(TagField::Slug, "lunch").await.unwrap(), Some(tag));
        assert!(repo.get_by_field(TagField::Slug, "dinner").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_tags_ordered_by_name() {
        let repo = setup_test_repo().await;
        repo.create(&CreateTagInput::new("Dinner", "#8775D2", "dinner")).await.unwrap();
        repo.create(&CreateTagInput::new("Breakfast", "#E26C2D", "breakfast")).await.unwrap();
        repo.create(&CreateTagInput::new("Lunch", "#49B64E", "lunch")).await.unwrap();

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Breakfast", "Dinner", "Lunch"]);
    }

    #[tokio::test]
    async fn test_get_by_ids_skips_missing() {
        let repo = setup_test_repo().await;
        let a = repo.create(&CreateTagInput::new("A", "#000001", "a")).await.unwrap();
        let b = repo.create(&CreateTagInput::new("B", "#000002", "b")).await.unwrap();

        let found = repo.get_by_ids(&[b.id, 999, a.id]).await.unwrap();
        assert_eq!(found, vec![a, b]);
        assert!(repo.get_by_ids(&[]).await.unwrap().is_empty());
    }
}
