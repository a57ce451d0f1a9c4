//! Recipe repository
//!
//! Database operations for recipes and their ingredient and tag rows.
//!
//! Writes are transactional: a recipe and all of its join rows are committed
//! together or not at all. Updates replace the join rows wholesale.

use super::placeholders;
use super::tag::{row_to_tag_sqlite, row_to_tag_mysql};
use crate::db::{Backend, DynDatabasePool};
use crate::models::{
    ListParams, PagedResult, Recipe, RecipeDraft, RecipeFilter, RecipeIngredient, Tag,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlConnection, MySqlPool, Row, SqliteConnection, SqlitePool};
use std::sync::Arc;

/// Recipe repository trait
#[async_trait]
pub trait RecipeRepository: Send + Sync {
    /// Insert a recipe with its ingredient and tag rows in one transaction
    async fn create(&self, author_id: i64, draft: &RecipeDraft) -> Result<Recipe>;

    /// Overwrite a recipe's fields and replace its ingredient and tag rows
    /// in one transaction
    async fn update(&self, id: i64, draft: &RecipeDraft) -> Result<Recipe>;

    /// Delete a recipe. Returns false if it did not exist
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Get recipe by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Recipe>>;

    /// List recipes newest first
    async fn list(&self, filter: &RecipeFilter, params: &ListParams) -> Result<PagedResult<Recipe>>;

    /// Ingredient rows of a recipe, in insertion order
    async fn get_ingredients(&self, recipe_id: i64) -> Result<Vec<RecipeIngredient>>;

    /// Tags of a recipe, ordered by name
    async fn get_tags(&self, recipe_id: i64) -> Result<Vec<Tag>>;
}

/// SQLx-based recipe repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxRecipeRepository {
    pool: DynDatabasePool,
}

impl SqlxRecipeRepository {
    /// Create a new SQLx recipe repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn RecipeRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl RecipeRepository for SqlxRecipeRepository {
    async fn create(&self, author_id: i64, draft: &RecipeDraft) -> Result<Recipe> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_recipe_sqlite(pool, author_id, draft).await,
            Backend::Mysql(pool) => create_recipe_mysql(pool, author_id, draft).await,
        }
    }

    async fn update(&self, id: i64, draft: &RecipeDraft) -> Result<Recipe> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => update_recipe_sqlite(pool, id, draft).await,
            Backend::Mysql(pool) => update_recipe_mysql(pool, id, draft).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query("DELETE FROM recipes WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query("DELETE FROM recipes WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to delete recipe")?;

        Ok(affected > 0)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Recipe>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_recipe_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_recipe_by_id_mysql(pool, id).await,
        }
    }

    async fn list(
        &self,
        filter: &RecipeFilter,
        params: &ListParams,
    ) -> Result<PagedResult<Recipe>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_recipes_sqlite(pool, filter, params).await,
            Backend::Mysql(pool) => list_recipes_mysql(pool, filter, params).await,
        }
    }

    async fn get_ingredients(&self, recipe_id: i64) -> Result<Vec<RecipeIngredient>> {
        let sql = r#"
            SELECT i.id AS ingredient_id, i.name, i.measurement_unit, ri.amount
            FROM recipe_ingredients ri
            JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE ri.recipe_id = ?
            ORDER BY ri.id ASC
        "#;
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(sql)
                    .bind(recipe_id)
                    .fetch_all(pool)
                    .await
                    .context("Failed to get recipe ingredients")?;
                Ok(rows
                    .iter()
                    .map(|row| RecipeIngredient {
                        ingredient_id: row.get("ingredient_id"),
                        name: row.get("name"),
                        measurement_unit: row.get("measurement_unit"),
                        amount: row.get("amount"),
                    })
                    .collect())
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(sql)
                    .bind(recipe_id)
                    .fetch_all(pool)
                    .await
                    .context("Failed to get recipe ingredients")?;
                Ok(rows
                    .iter()
                    .map(|row| RecipeIngredient {
                        ingredient_id: row.get("ingredient_id"),
                        name: row.get("name"),
                        measurement_unit: row.get("measurement_unit"),
                        amount: row.get("amount"),
                    })
                    .collect())
            }
        }
    }

    async fn get_tags(&self, recipe_id: i64) -> Result<Vec<Tag>> {
        let sql = r#"
            SELECT t.id, t.name, t.color, t.slug
            FROM recipe_tags rt
            JOIN tags t ON t.id = rt.tag_id
            WHERE rt.recipe_id = ?
            ORDER BY t.name ASC
        "#;
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(sql)
                    .bind(recipe_id)
                    .fetch_all(pool)
                    .await
                    .context("Failed to get recipe tags")?;
                Ok(rows.iter().map(row_to_tag_sqlite).collect())
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(sql)
                    .bind(recipe_id)
                    .fetch_all(pool)
                    .await
                    .context("Failed to get recipe tags")?;
                Ok(rows.iter().map(row_to_tag_mysql).collect())
            }
        }
    }
}

/// A value bound into the recipe filter clause
#[derive(Debug, Clone, PartialEq)]
enum FilterArg {
    Int(i64),
    Text(String),
}

/// Build the WHERE clause of the recipe list query.
///
/// Both backends use `?` placeholders, so the clause is shared and only the
/// binding differs.
fn recipe_filter_clause(filter: &RecipeFilter) -> (String, Vec<FilterArg>) {
    let mut conditions = Vec::new();
    let mut args = Vec::new();

    if let Some(author_id) = filter.author_id {
        conditions.push("r.author_id = ?".to_string());
        args.push(FilterArg::Int(author_id));
    }

    if !filter.tags.is_empty() {
        conditions.push(format!(
            "EXISTS (SELECT 1 FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id \
             WHERE rt.recipe_id = r.id AND t.slug IN ({}))",
            placeholders(filter.tags.len())
        ));
        args.extend(filter.tags.iter().cloned().map(FilterArg::Text));
    }

    if let Some(user_id) = filter.favorited_by {
        conditions.push(
            "EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ?)"
                .to_string(),
        );
        args.push(FilterArg::Int(user_id));
    }

    if let Some(user_id) = filter.in_cart_of {
        conditions.push(
            "EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ?)"
                .to_string(),
        );
        args.push(FilterArg::Int(user_id));
    }

    if conditions.is_empty() {
        (String::new(), args)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), args)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn insert_recipe_rows_sqlite(
    conn: &mut SqliteConnection,
    recipe_id: i64,
    draft: &RecipeDraft,
) -> Result<()> {
    for item in &draft.ingredients {
        sqlx::query(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES (?, ?, ?)",
        )
        .bind(recipe_id)
        .bind(item.id)
        .bind(item.amount)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to add ingredient {} to recipe", item.id))?;
    }

    for tag_id in &draft.tags {
        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES (?, ?)")
            .bind(recipe_id)
            .bind(*tag_id)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Failed to add tag {} to recipe", tag_id))?;
    }

    Ok(())
}

async fn create_recipe_sqlite(
    pool: &SqlitePool,
    author_id: i64,
    draft: &RecipeDraft,
) -> Result<Recipe> {
    let pub_date = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO recipes (author_id, name, image, text, cooking_time, pub_date)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(author_id)
    .bind(&draft.name)
    .bind(&draft.image)
    .bind(&draft.text)
    .bind(draft.cooking_time)
    .bind(pub_date)
    .execute(&mut *tx)
    .await
    .context("Failed to create recipe")?;

    let id = result.last_insert_rowid();
    insert_recipe_rows_sqlite(&mut tx, id, draft).await?;
    tx.commit().await.context("Failed to commit recipe")?;

    Ok(Recipe {
        id,
        author_id,
        name: draft.name.clone(),
        image: draft.image.clone(),
        text: draft.text.clone(),
        cooking_time: draft.cooking_time,
        pub_date,
    })
}

async fn update_recipe_sqlite(pool: &SqlitePool, id: i64, draft: &RecipeDraft) -> Result<Recipe> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("UPDATE recipes SET name = ?, image = ?, text = ?, cooking_time = ? WHERE id = ?")
        .bind(&draft.name)
        .bind(&draft.image)
        .bind(&draft.text)
        .bind(draft.cooking_time)
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to update recipe")?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear recipe ingredients")?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear recipe tags")?;

    insert_recipe_rows_sqlite(&mut tx, id, draft).await?;
    tx.commit().await.context("Failed to commit recipe update")?;

    get_recipe_by_id_sqlite(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Recipe not found after update"))
}

async fn get_recipe_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Recipe>> {
    let row = sqlx::query(
        r#"
        SELECT r.id, r.author_id, r.name, r.image, r.text, r.cooking_time, r.pub_date
        FROM recipes r
        WHERE r.id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get recipe by ID")?;

    Ok(row.as_ref().map(row_to_recipe_sqlite))
}

async fn list_recipes_sqlite(
    pool: &SqlitePool,
    filter: &RecipeFilter,
    params: &ListParams,
) -> Result<PagedResult<Recipe>> {
    let (clause, args) = recipe_filter_clause(filter);

    let count_sql = format!("SELECT COUNT(*) AS count FROM recipes r{}", clause);
    let mut count_query = sqlx::query(&count_sql);
    for arg in &args {
        count_query = match arg {
            FilterArg::Int(v) => count_query.bind(*v),
            FilterArg::Text(s) => count_query.bind(s.as_str()),
        };
    }
    let total: i64 = count_query
        .fetch_one(pool)
        .await
        .context("Failed to count recipes")?
        .get("count");

    let list_sql = format!(
        "SELECT r.id, r.author_id, r.name, r.image, r.text, r.cooking_time, r.pub_date \
         FROM recipes r{} ORDER BY r.pub_date DESC, r.id DESC LIMIT ? OFFSET ?",
        clause
    );
    let mut list_query = sqlx::query(&list_sql);
    for arg in &args {
        list_query = match arg {
            FilterArg::Int(v) => list_query.bind(*v),
            FilterArg::Text(s) => list_query.bind(s.as_str()),
        };
    }
    let rows = list_query
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list recipes")?;

    let recipes = rows.iter().map(row_to_recipe_sqlite).collect();
    Ok(PagedResult::new(recipes, total, params))
}

fn row_to_recipe_sqlite(row: &sqlx::sqlite::SqliteRow) -> Recipe {
    Recipe {
        id: row.get("id"),
        author_id: row.get("author_id"),
        name: row.get("name"),
        image: row.get("image"),
        text: row.get("text"),
        cooking_time: row.get("cooking_time"),
        pub_date: row.get("pub_date"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn insert_recipe_rows_mysql(
    conn: &mut MySqlConnection,
    recipe_id: i64,
    draft: &RecipeDraft,
) -> Result<()> {
    for item in &draft.ingredients {
        sqlx::query(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES (?, ?, ?)",
        )
        .bind(recipe_id)
        .bind(item.id)
        .bind(item.amount)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to add ingredient {} to recipe", item.id))?;
    }

    for tag_id in &draft.tags {
        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES (?, ?)")
            .bind(recipe_id)
            .bind(*tag_id)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Failed to add tag {} to recipe", tag_id))?;
    }

    Ok(())
}

async fn create_recipe_mysql(
    pool: &MySqlPool,
    author_id: i64,
    draft: &RecipeDraft,
) -> Result<Recipe> {
    let pub_date = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO recipes (author_id, name, image, text, cooking_time, pub_date)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(author_id)
    .bind(&draft.name)
    .bind(&draft.image)
    .bind(&draft.text)
    .bind(draft.cooking_time)
    .bind(pub_date)
    .execute(&mut *tx)
    .await
    .context("Failed to create recipe")?;

    let id = result.last_insert_id() as i64;
    insert_recipe_rows_mysql(&mut tx, id, draft).await?;
    tx.commit().await.context("Failed to commit recipe")?;

    Ok(Recipe {
        id,
        author_id,
        name: draft.name.clone(),
        image: draft.image.clone(),
        text: draft.text.clone(),
        cooking_time: draft.cooking_time,
        pub_date,
    })
}

async fn update_recipe_mysql(pool: &MySqlPool, id: i64, draft: &RecipeDraft) -> Result<Recipe> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("UPDATE recipes SET name = ?, image = ?, text = ?, cooking_time = ? WHERE id = ?")
        .bind(&draft.name)
        .bind(&draft.image)
        .bind(&draft.text)
        .bind(draft.cooking_time)
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to update recipe")?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear recipe ingredients")?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear recipe tags")?;

    insert_recipe_rows_mysql(&mut tx, id, draft).await?;
    tx.commit().await.context("Failed to commit recipe update")?;

    get_recipe_by_id_mysql(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Recipe not found after update"))
}

async fn get_recipe_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Recipe>> {
    let row = sqlx::query(
        r#"
        SELECT r.id, r.author_id, r.name, r.image, r.text, r.cooking_time, r.pub_date
        FROM recipes r
        WHERE r.id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get recipe by ID")?;

    Ok(row.as_ref().map(row_to_recipe_mysql))
}

async fn list_recipes_mysql(
    pool: &MySqlPool,
    filter: &RecipeFilter,
    params: &ListParams,
) -> Result<PagedResult<Recipe>> {
    let (clause, args) = recipe_filter_clause(filter);

    let count_sql = format!("SELECT COUNT(*) AS count FROM recipes r{}", clause);
    let mut count_query = sqlx::query(&count_sql);
    for arg in &args {
        count_query = match arg {
            FilterArg::Int(v) => count_query.bind(*v),
            FilterArg::Text(s) => count_query.bind(s.as_str()),
        };
    }
    let total: i64 = count_query
        .fetch_one(pool)
        .await
        .context("Failed to count recipes")?
        .get("count");

    let list_sql = format!(
        "SELECT r.id, r.author_id, r.name, r.image, r.text, r.cooking_time, r.pub_date \
         FROM recipes r{} ORDER BY r.pub_date DESC, r.id DESC LIMIT ? OFFSET ?",
        clause
    );
    let mut list_query = sqlx::query(&list_sql);
    for arg in &args {
        list_query = match arg {
            FilterArg::Int(v) => list_query.bind(*v),
            FilterArg::Text(s) => list_query.bind(s.as_str()),
        };
    }
    let rows = list_query
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list recipes")?;

    let recipes = rows.iter().map(row_to_recipe_mysql).collect();
    Ok(PagedResult::new(recipes, total, params))
}

fn row_to_recipe_mysql(row: &sqlx::mysql::MySqlRow) -> Recipe {
    Recipe {
        id: row.get("id"),
        author_id: row.get("author_id"),
        name: row.get("name"),
        image: row.get("image"),
        text: row.get("text"),
        cooking_time: row.get("cooking_time"),
        pub_date: row.get("pub_date"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::IngredientAmount;

    async fn setup_test_repo() -> (SqlitePool, SqlxRecipeRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let sqlite = pool.as_sqlite().unwrap().clone();
        (sqlite, SqlxRecipeRepository::new(pool))
    }

    async fn insert_user(pool: &SqlitePool, username: &str) -> i64 {
        sqlx::query(
            "INSERT INTO users (email, username, first_name, last_name, password_hash) \
             VALUES (?, ?, 'F', 'L', 'hash')",
        )
        .bind(format!("{}@example.com", username))
        .bind(username)
        .execute(pool)
        .await
        .expect("Failed to create user")
        .last_insert_rowid()
    }

    async fn insert_ingredient(pool: &SqlitePool, name: &str, unit: &str) -> i64 {
        sqlx::query("INSERT INTO ingredients (name, measurement_unit) VALUES (?, ?)")
            .bind(name)
            .bind(unit)
            .execute(pool)
            .await
            .expect("Failed to create ingredient")
            .last_insert_rowid()
    }

    async fn insert_tag(pool: &SqlitePool, slug: &str, color: &str) -> i64 {
        sqlx::query("INSERT INTO tags (name, color, slug) VALUES (?, ?, ?)")
            .bind(slug.to_uppercase())
            .bind(color)
            .bind(slug)
            .execute(pool)
            .await
            .expect("Failed to create tag")
            .last_insert_rowid()
    }

    fn draft(name: &str, ingredients: Vec<IngredientAmount>, tags: Vec<i64>) -> RecipeDraft {
        RecipeDraft {
            name: name.to_string(),
            image: "image.png".to_string(),
            text: "Mix and bake".to_string(),
            cooking_time: 30,
            ingredients,
            tags,
        }
    }

    #[tokio::test]
    async fn test_create_then_read_back() {
        let (pool, repo) = setup_test_repo().await;
        let author = insert_user(&pool, "cook").await;
        let flour = insert_ingredient(&pool, "Flour", "g").await;
        let salt = insert_ingredient(&pool, "Salt", "g").await;
        let tag = insert_tag(&pool, "dinner", "#000001").await;

        let items = vec![
            IngredientAmount::new(flour, 500),
            IngredientAmount::new(salt, 10),
        ];
        let recipe = repo
            .create(author, &draft("Bread", items, vec![tag]))
            .await
            .expect("Failed to create recipe");

        let found = repo.get_by_id(recipe.id).await.unwrap().expect("Recipe not found");
        assert_eq!(found.name, "Bread");
        assert_eq!(found.author_id, author);

        let ingredients = repo.get_ingredients(recipe.id).await.unwrap();
        let pairs: Vec<(i64, i64)> = ingredients
            .iter()
            .map(|i| (i.ingredient_id, i.amount))
            .collect();
        assert_eq!(pairs, vec![(flour, 500), (salt, 10)]);

        let tags = repo.get_tags(recipe.id).await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].id, tag);
    }

    #[tokio::test]
    async fn test_update_replaces_rows_wholesale() {
        let (pool, repo) = setup_test_repo().await;
        let author = insert_user(&pool, "cook").await;
        let flour = insert_ingredient(&pool, "Flour", "g").await;
        let sugar = insert_ingredient(&pool, "Sugar", "g").await;
        let t1 = insert_tag(&pool, "a", "#000001").await;
        let t2 = insert_tag(&pool, "b", "#000002").await;

        let recipe = repo
            .create(author, &draft("Cake", vec![IngredientAmount::new(flour, 200)], vec![t1]))
            .await
            .unwrap();

        let replacement = draft("Sweet cake", vec![IngredientAmount::new(sugar, 50)], vec![t2]);
        let updated = repo
            .update(recipe.id, &replacement)
            .await
            .expect("Failed to update recipe");
        assert_eq!(updated.name, "Sweet cake");
        assert_eq!(updated.pub_date, recipe.pub_date);

        let ingredients = repo.get_ingredients(recipe.id).await.unwrap();
        assert_eq!(ingredients.len(), 1);
        assert_eq!(ingredients[0].ingredient_id, sugar);

        let tags: Vec<i64> = repo.get_tags(recipe.id).await.unwrap().iter().map(|t| t.id).collect();
        assert_eq!(tags, vec![t2]);
    }

    #[tokio::test]
    async fn test_failed_update_rolls_back() {
        let (pool, repo) = setup_test_repo().await;
        let author = insert_user(&pool, "cook").await;
        let flour = insert_ingredient(&pool, "Flour", "g").await;
        let tag = insert_tag(&pool, "a", "#000001").await;

        let recipe = repo
            .create(author, &draft("Cake", vec![IngredientAmount::new(flour, 200)], vec![tag]))
            .await
            .unwrap();

        // Ingredient 999 does not exist, the foreign key aborts the transaction.
        let result = repo
            .update(recipe.id, &draft("Broken", vec![IngredientAmount::new(999, 1)], vec![tag]))
            .await;
        assert!(result.is_err());

        let found = repo.get_by_id(recipe.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Cake");
        let ingredients = repo.get_ingredients(recipe.id).await.unwrap();
        assert_eq!(ingredients.len(), 1);
        assert_eq!(ingredients[0].ingredient_id, flour);
        assert_eq!(ingredients[0].amount, 200);
        assert_eq!(repo.get_tags(recipe.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_create_leaves_nothing() {
        let (pool, repo) = setup_test_repo().await;
        let author = insert_user(&pool, "cook").await;
        let tag = insert_tag(&pool, "a", "#000001").await;

        let result = repo
            .create(author, &draft("Ghost", vec![IngredientAmount::new(999, 1)], vec![tag]))
            .await;
        assert!(result.is_err());

        let page = repo.list(&RecipeFilter::default(), &ListParams::default()).await.unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_delete_recipe() {
        let (pool, repo) = setup_test_repo().await;
        let author = insert_user(&pool, "cook").await;
        let flour = insert_ingredient(&pool, "Flour", "g").await;
        let tag = insert_tag(&pool, "a", "#000001").await;
        let recipe = repo
            .create(author, &draft("Cake", vec![IngredientAmount::new(flour, 1)], vec![tag]))
            .await
            .unwrap();

        assert!(repo.delete(recipe.id).await.unwrap());
        assert!(!repo.delete(recipe.id).await.unwrap());
        assert!(repo.get_by_id(recipe.id).await.unwrap().is_none());
        assert!(repo.get_ingredients(recipe.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_newest_first_with_filters() {
        let (pool, repo) = setup_test_repo().await;
        let alice = insert_user(&pool, "alice").await;
        let bob = insert_user(&pool, "bob").await;
        let flour = insert_ingredient(&pool, "Flour", "g").await;
        let breakfast = insert_tag(&pool, "breakfast", "#000001").await;
        let dinner = insert_tag(&pool, "dinner", "#000002").await;

        let first = repo
            .create(alice, &draft("First", vec![IngredientAmount::new(flour, 1)], vec![breakfast]))
            .await
            .unwrap();
        let second = repo
            .create(bob, &draft("Second", vec![IngredientAmount::new(flour, 1)], vec![dinner]))
            .await
            .unwrap();
        let both_tags = vec![breakfast, dinner];
        let third = repo
            .create(alice, &draft("Third", vec![IngredientAmount::new(flour, 1)], both_tags))
            .await
            .unwrap();

        let all = repo.list(&RecipeFilter::default(), &ListParams::default()).await.unwrap();
        let ids: Vec<i64> = all.items.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);
        assert_eq!(all.total, 3);

        let ids_of = |page: PagedResult<Recipe>| {
            page.items.iter().map(|r| r.id).collect::<Vec<_>>()
        };

        let by_author = RecipeFilter {
            author_id: Some(alice),
            ..Default::default()
        };
        let ids = ids_of(repo.list(&by_author, &ListParams::default()).await.unwrap());
        assert_eq!(ids, vec![third.id, first.id]);

        let by_tag = RecipeFilter {
            tags: vec!["dinner".to_string()],
            ..Default::default()
        };
        let page = repo.list(&by_tag, &ListParams::default()).await.unwrap();
        assert_eq!(page.total, 2);

        sqlx::query("INSERT INTO favorites (user_id, recipe_id) VALUES (?, ?)")
            .bind(bob)
            .bind(first.id)
            .execute(&pool)
            .await
            .unwrap();
        let favorited = RecipeFilter {
            favorited_by: Some(bob),
            ..Default::default()
        };
        let ids = ids_of(repo.list(&favorited, &ListParams::default()).await.unwrap());
        assert_eq!(ids, vec![first.id]);

        let in_cart = RecipeFilter {
            in_cart_of: Some(bob),
            ..Default::default()
        };
        assert_eq!(repo.list(&in_cart, &ListParams::default()).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let (pool, repo) = setup_test_repo().await;
        let author = insert_user(&pool, "cook").await;
        let flour = insert_ingredient(&pool, "Flour", "g").await;
        let tag = insert_tag(&pool, "a", "#000001").await;

        for i in 0..5 {
            let name = format!("R{}", i);
            repo.create(author, &draft(&name, vec![IngredientAmount::new(flour, 1)], vec![tag]))
                .await
                .unwrap();
        }

        let page = repo.list(&RecipeFilter::default(), &ListParams::new(2, 2)).await.unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].name, "R2");
        assert!(page.has_next());
        assert!(page.has_prev());
    }

    #[test]
    fn test_filter_clause() {
        let (clause, args) = recipe_filter_clause(&RecipeFilter::default());
        assert!(clause.is_empty());
        assert!(args.is_empty());

        let filter = RecipeFilter {
            tags: vec!["a".to_string(), "b".to_string()],
            author_id: Some(7),
            favorited_by: None,
            in_cart_of: Some(3),
        };
        let (clause, args) = recipe_filter_clause(&filter);
        assert!(clause.starts_with(" WHERE r.author_id = ?"));
        assert!(clause.contains("t.slug IN (?, ?)"));
        assert!(clause.contains("shopping_cart"));
        assert!(!clause.contains("favorites"));
        assert_eq!(
            args,
            vec![
                FilterArg::Int(7),
                FilterArg::Text("a".to_string()),
                FilterArg::Text("b".to_string()),
                FilterArg::Int(3),
            ]
        );
    }
}
