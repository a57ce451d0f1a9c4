//! Ingredient repository
//!
//! Ingredients are reference data: created by the loader, read by everyone.

use super::placeholders;
use crate::db::{Backend, DynDatabasePool};
use crate::models::{CreateIngredientInput, Ingredient};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

/// Ingredient repository trait
#[async_trait]
pub trait IngredientRepository: Send + Sync {
    /// Create a new ingredient
    async fn create(&self, input: &CreateIngredientInput) -> Result<Ingredient>;

    /// Get ingredient by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Ingredient>>;

    /// Get the first ingredient with exactly this name and unit
    async fn get_by_name_and_unit(&self, name: &str, unit: &str) -> Result<Option<Ingredient>>;

    /// Get all ingredients whose id is in `ids` (missing ids are skipped)
    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Ingredient>>;

    /// List all ingredients ordered by name
    async fn list(&self) -> Result<Vec<Ingredient>>;
}

/// SQLx-based ingredient repository implementation
pub struct SqlxIngredientRepository {
    pool: DynDatabasePool,
}

impl SqlxIngredientRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn IngredientRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl IngredientRepository for SqlxIngredientRepository {
    async fn create(&self, input: &CreateIngredientInput) -> Result<Ingredient> {
        let sql = "INSERT INTO ingredients (name, measurement_unit) VALUES (?, ?)";
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(&input.name)
                .bind(&input.measurement_unit)
                .execute(pool)
                .await
                .context("Failed to create ingredient")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(&input.name)
                .bind(&input.measurement_unit)
                .execute(pool)
                .await
                .context("Failed to create ingredient")?
                .last_insert_id() as i64,
        };

        Ok(Ingredient {
            id,
            name: input.name.clone(),
            measurement_unit: input.measurement_unit.clone(),
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Ingredient>> {
        let sql = "SELECT id, name, measurement_unit FROM ingredients WHERE id = ?";
        let ingredient = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get ingredient by ID")?
                .map(|row| row_to_ingredient_sqlite(&row)),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get ingredient by ID")?
                .map(|row| row_to_ingredient_mysql(&row)),
        };
        Ok(ingredient)
    }

    async fn get_by_name_and_unit(&self, name: &str, unit: &str) -> Result<Option<Ingredient>> {
        let sql = r#"
            SELECT id, name, measurement_unit FROM ingredients
            WHERE name = ? AND measurement_unit = ?
            ORDER BY id ASC
            LIMIT 1
        "#;
        let ingredient = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(name)
                .bind(unit)
                .fetch_optional(pool)
                .await
                .context("Failed to get ingredient by name")?
                .map(|row| row_to_ingredient_sqlite(&row)),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(name)
                .bind(unit)
                .fetch_optional(pool)
                .await
                .context("Failed to get ingredient by name")?
                .map(|row| row_to_ingredient_mysql(&row)),
        };
        Ok(ingredient)
    }

    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Ingredient>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT id, name, measurement_unit FROM ingredients WHERE id IN ({}) ORDER BY id ASC",
            placeholders(ids.len())
        );

        let ingredients = match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let mut query = sqlx::query(&sql);
                for id in ids {
                    query = query.bind(*id);
                }
                query
                    .fetch_all(pool)
                    .await
                    .context("Failed to get ingredients by IDs")?
                    .into_iter()
                    .map(|row| row_to_ingredient_sqlite(&row))
                    .collect()
            }
            Backend::Mysql(pool) => {
                let mut query = sqlx::query(&sql);
                for id in ids {
                    query = query.bind(*id);
                }
                query
                    .fetch_all(pool)
                    .await
                    .context("Failed to get ingredients by IDs")?
                    .into_iter()
                    .map(|row| row_to_ingredient_mysql(&row))
                    .collect()
            }
        };
        Ok(ingredients)
    }

    async fn list(&self) -> Result<Vec<Ingredient>> {
        let sql = "SELECT id, name, measurement_unit FROM ingredients ORDER BY name ASC, id ASC";
        let ingredients = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .fetch_all(pool)
                .await
                .context("Failed to list ingredients")?
                .into_iter()
                .map(|row| row_to_ingredient_sqlite(&row))
                .collect(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .fetch_all(pool)
                .await
                .context("Failed to list ingredients")?
                .into_iter()
                .map(|row| row_to_ingredient_mysql(&row))
                .collect(),
        };
        Ok(ingredients)
    }
}

fn row_to_ingredient_sqlite(row: &sqlx::sqlite::SqliteRow) -> Ingredient {
    Ingredient {
        id: row.get("id"),
        name: row.get("name"),
        measurement_unit: row.get("measurement_unit"),
    }
}

fn row_to_ingredient_mysql(row: &sqlx::mysql::MySqlRow) -> Ingredient {
    Ingredient {
        id: row.get("id"),
        name: row.get("name"),
        measurement_unit: row.get("measurement_unit"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxIngredientRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxIngredientRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_get_ingredient() {
        let repo = setup_test_repo().await;

        let created = repo
            .create(&CreateIngredientInput::new("Flour", "g"))
            .await
            .expect("Failed to create ingredient");

        let found = repo.get_by_id(created.id).await.unwrap().expect("Ingredient not found");
        assert_eq!(found, created);
        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_same_name_and_unit_allowed_twice() {
        let repo = setup_test_repo().await;
        let first = repo.create(&CreateIngredientInput::new("Flour", "g")).await.unwrap();
        let second = repo.create(&CreateIngredientInput::new("Flour", "g")).await.unwrap();
        assert_ne!(first.id, second.id);

        let found = repo.get_by_name_and_unit("Flour", "g").await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
        assert!(repo.get_by_name_and_unit("Flour", "kg").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_ordered_by_name() {
        let repo = setup_test_repo().await;
        repo.create(&CreateIngredientInput::new("Sugar", "g")).await.unwrap();
        repo.create(&CreateIngredientInput::new("Butter", "g")).await.unwrap();
        repo.create(&CreateIngredientInput::new("Milk", "ml")).await.unwrap();

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["Butter", "Milk", "Sugar"]);
    }

    #[tokio::test]
    async fn test_get_by_ids() {
        let repo = setup_test_repo().await;
        let a = repo.create(&CreateIngredientInput::new("Salt", "g")).await.unwrap();
        let b = repo.create(&CreateIngredientInput::new("Egg", "pcs")).await.unwrap();

        let found = repo.get_by_ids(&[a.id, b.id, 42]).await.unwrap();
        assert_eq!(found, vec![a, b]);
    }
}
