//! Favorites and shopping cart repository
//!
//! Both collections are (user, recipe) pairs guarded by a unique constraint,
//! so they share one repository keyed by [`Collection`].

use crate::db::{Backend, DynDatabasePool};
use crate::models::{CartIngredient, Collection};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

/// Recipe collection repository trait
#[async_trait]
pub trait RelationRepository: Send + Sync {
    /// Add a recipe to a collection. Returns false if it was already there
    async fn add(&self, collection: Collection, user_id: i64, recipe_id: i64) -> Result<bool>;

    /// Remove a recipe from a collection. Returns false if it was not there
    async fn remove(&self, collection: Collection, user_id: i64, recipe_id: i64) -> Result<bool>;

    /// Check whether a recipe is in a user's collection
    async fn contains(&self, collection: Collection, user_id: i64, recipe_id: i64) -> Result<bool>;

    /// Every ingredient row of every recipe in the user's cart, in cart
    /// insertion order then recipe ingredient order
    async fn cart_ingredients(&self, user_id: i64) -> Result<Vec<CartIngredient>>;
}

/// SQLx-based collection repository implementation
pub struct SqlxRelationRepository {
    pool: DynDatabasePool,
}

impl SqlxRelationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn RelationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl RelationRepository for SqlxRelationRepository {
    async fn add(&self, collection: Collection, user_id: i64, recipe_id: i64) -> Result<bool> {
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let sql = format!(
                    "INSERT OR IGNORE INTO {} (user_id, recipe_id) VALUES (?, ?)",
                    collection.table()
                );
                sqlx::query(&sql)
                    .bind(user_id)
                    .bind(recipe_id)
                    .execute(pool)
                    .await
                    .map(|r| r.rows_affected())
            }
            Backend::Mysql(pool) => {
                let sql = format!(
                    "INSERT IGNORE INTO {} (user_id, recipe_id) VALUES (?, ?)",
                    collection.table()
                );
                sqlx::query(&sql)
                    .bind(user_id)
                    .bind(recipe_id)
                    .execute(pool)
                    .await
                    .map(|r| r.rows_affected())
            }
        }
        .with_context(|| format!("Failed to add recipe to {}", collection))?;

        Ok(affected > 0)
    }

    async fn remove(&self, collection: Collection, user_id: i64, recipe_id: i64) -> Result<bool> {
        let sql = format!(
            "DELETE FROM {} WHERE user_id = ? AND recipe_id = ?",
            collection.table()
        );
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(&sql)
                .bind(user_id)
                .bind(recipe_id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query(&sql)
                .bind(user_id)
                .bind(recipe_id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        }
        .with_context(|| format!("Failed to remove recipe from {}", collection))?;

        Ok(affected > 0)
    }

    async fn contains(&self, collection: Collection, user_id: i64, recipe_id: i64) -> Result<bool> {
        let sql = format!(
            "SELECT COUNT(*) AS count FROM {} WHERE user_id = ? AND recipe_id = ?",
            collection.table()
        );
        let count: i64 = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(&sql)
                .bind(user_id)
                .bind(recipe_id)
                .fetch_one(pool)
                .await
                .map(|row| row.get("count")),
            Backend::Mysql(pool) => sqlx::query(&sql)
                .bind(user_id)
                .bind(recipe_id)
                .fetch_one(pool)
                .await
                .map(|row| row.get("count")),
        }
        .with_context(|| format!("Failed to check {}", collection))?;

        Ok(count > 0)
    }

    async fn cart_ingredients(&self, user_id: i64) -> Result<Vec<CartIngredient>> {
        let sql = r#"
            SELECT i.name, i.measurement_unit, ri.amount
            FROM shopping_cart c
            JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
            JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE c.user_id = ?
            ORDER BY c.id ASC, ri.id ASC
        "#;
        let rows = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(user_id)
                .fetch_all(pool)
                .await
                .context("Failed to load shopping cart ingredients")?
                .iter()
                .map(|row| CartIngredient::new(
                    row.get::<String, _>("name"),
                    row.get::<String, _>("measurement_unit"),
                    row.get("amount"),
                ))
                .collect(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(user_id)
                .fetch_all(pool)
                .await
                .context("Failed to load shopping cart ingredients")?
                .iter()
                .map(|row| CartIngredient::new(
                    row.get::<String, _>("name"),
                    row.get::<String, _>("measurement_unit"),
                    row.get("amount"),
                ))
                .collect(),
        };
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use sqlx::SqlitePool;

    async fn setup() -> (SqlitePool, SqlxRelationRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let sqlite = pool.as_sqlite().unwrap().clone();

        sqlx::query(
            "INSERT INTO users (id, email, username, first_name, last_name, password_hash) \
             VALUES (1, 'a@example.com', 'a', 'A', 'A', 'h')",
        )
        .execute(&sqlite)
        .await
        .unwrap();
        for (id, name) in [(1, "A"), (2, "B")] {
            sqlx::query(
                "INSERT INTO recipes (id, author_id, name, image, text, cooking_time) \
                 VALUES (?, 1, ?, 'img', 'text', 10)",
            )
            .bind(id)
            .bind(name)
            .execute(&sqlite)
            .await
            .unwrap();
        }

        (sqlite, SqlxRelationRepository::new(pool))
    }

    async fn add_ingredient(
        pool: &SqlitePool,
        recipe_id: i64,
        name: &str,
        unit: &str,
        amount: i64,
    ) {
        let ingredient_id =
            sqlx::query("INSERT INTO ingredients (name, measurement_unit) VALUES (?, ?)")
                .bind(name)
                .bind(unit)
                .execute(pool)
                .await
                .unwrap()
                .last_insert_rowid();
        sqlx::query(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES (?, ?, ?)",
        )
        .bind(recipe_id)
        .bind(ingredient_id)
        .bind(amount)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_add_twice_stores_one_row() {
        let (pool, repo) = setup().await;

        assert!(repo.add(Collection::Favorites, 1, 1).await.unwrap());
        assert!(!repo.add(Collection::Favorites, 1, 1).await.unwrap());

        let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM favorites")
            .fetch_one(&pool)
            .await
            .unwrap()
            .get("count");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_collections_are_independent() {
        let (_pool, repo) = setup().await;

        repo.add(Collection::ShoppingCart, 1, 2).await.unwrap();
        assert!(repo.contains(Collection::ShoppingCart, 1, 2).await.unwrap());
        assert!(!repo.contains(Collection::Favorites, 1, 2).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove() {
        let (_pool, repo) = setup().await;

        assert!(!repo.remove(Collection::Favorites, 1, 1).await.unwrap());
        repo.add(Collection::Favorites, 1, 1).await.unwrap();
        assert!(repo.remove(Collection::Favorites, 1, 1).await.unwrap());
        assert!(!repo.contains(Collection::Favorites, 1, 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_cart_ingredients_in_cart_order() {
        let (pool, repo) = setup().await;
        add_ingredient(&pool, 1, "Flour", "g", 200).await;
        add_ingredient(&pool, 1, "Salt", "g", 5).await;
        add_ingredient(&pool, 2, "Sugar", "g", 50).await;

        assert!(repo.cart_ingredients(1).await.unwrap().is_empty());

        repo.add(Collection::ShoppingCart, 1, 2).await.unwrap();
        repo.add(Collection::ShoppingCart, 1, 1).await.unwrap();

        let rows = repo.cart_ingredients(1).await.unwrap();
        assert_eq!(
            rows,
            vec![
                CartIngredient::new("Sugar", "g", 50),
                CartIngredient::new("Flour", "g", 200),
                CartIngredient::new("Salt", "g", 5),
            ]
        );
    }
}
