//! Favorites and shopping cart toggles
//!
//! A (user, recipe) pair is either ABSENT or PRESENT. Adding a present pair
//! or removing an absent one is reported to the caller instead of being a
//! silent no-op. The store's unique constraint decides races between
//! concurrent adds.

use crate::db::repositories::{RecipeRepository, RelationRepository};
use crate::models::{Collection, RecipeShort, User};
use anyhow::Context;
use std::sync::Arc;

/// Errors of the toggle state machine, shared with follows
#[derive(Debug, thiserror::Error)]
pub enum ToggleError {
    /// Target recipe or author does not exist
    #[error("{0}")]
    NotFound(String),

    /// ADD on a pair that is already present
    #[error("{0}")]
    AlreadyPresent(String),

    /// REMOVE on a pair that is absent
    #[error("{0}")]
    NotPresent(String),

    /// Following oneself
    #[error("You cannot subscribe to yourself")]
    SelfFollow,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Favorites / shopping cart service
pub struct CollectionService {
    relation_repo: Arc<dyn RelationRepository>,
    recipe_repo: Arc<dyn RecipeRepository>,
}

impl CollectionService {
    pub fn new(
        relation_repo: Arc<dyn RelationRepository>,
        recipe_repo: Arc<dyn RecipeRepository>,
    ) -> Self {
        Self {
            relation_repo,
            recipe_repo,
        }
    }

    /// Put a recipe into the user's collection
    pub async fn add(
        &self,
        user: &User,
        collection: Collection,
        recipe_id: i64,
    ) -> Result<RecipeShort, ToggleError> {
        let recipe = self
            .recipe_repo
            .get_by_id(recipe_id)
            .await
            .context("Failed to get recipe")?
            .ok_or_else(|| ToggleError::NotFound(format!("Recipe {} not found", recipe_id)))?;

        let inserted = self
            .relation_repo
            .add(collection, user.id, recipe_id)
            .await?;
        if !inserted {
            return Err(ToggleError::AlreadyPresent(format!(
                "Recipe is already in {}",
                collection
            )));
        }

        Ok(RecipeShort::from(&recipe))
    }

    /// Take a recipe out of the user's collection
    pub async fn remove(
        &self,
        user: &User,
        collection: Collection,
        recipe_id: i64,
    ) -> Result<(), ToggleError> {
        if self
            .recipe_repo
            .get_by_id(recipe_id)
            .await
            .context("Failed to get recipe")?
            .is_none()
        {
            return Err(ToggleError::NotFound(format!("Recipe {} not found", recipe_id)));
        }

        let removed = self
            .relation_repo
            .remove(collection, user.id, recipe_id)
            .await?;
        if !removed {
            return Err(ToggleError::NotPresent(format!("Recipe is not in {}", collection)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxRecipeRepository, SqlxRelationRepository};
    use crate::db::{create_test_pool, migrations};
    use sqlx::Row;

    async fn setup() -> (sqlx::SqlitePool, CollectionService, User) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let sqlite = pool.as_sqlite().unwrap().clone();

        sqlx::query(
            "INSERT INTO users (id, email, username, first_name, last_name, password_hash) \
             VALUES (1, 'c@example.com', 'cook', 'C', 'K', 'h')",
        )
        .execute(&sqlite)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO recipes (id, author_id, name, image, text, cooking_time) \
             VALUES (10, 1, 'Stew', 'stew.png', 'Simmer', 90)",
        )
        .execute(&sqlite)
        .await
        .unwrap();

        let user = User {
            id: 1,
            ..User::new(
                "c@example.com".into(),
                "cook".into(),
                "C".into(),
                "K".into(),
                "h".into(),
                Default::default(),
            )
        };
        let service = CollectionService::new(
            SqlxRelationRepository::boxed(pool.clone()),
            SqlxRecipeRepository::boxed(pool),
        );
        (sqlite, service, user)
    }

    #[tokio::test]
    async fn test_add_returns_short_recipe() {
        let (_pool, service, user) = setup().await;
        let short = service.add(&user, Collection::Favorites, 10).await.unwrap();
        assert_eq!(
            short,
            RecipeShort {
                id: 10,
                name: "Stew".to_string(),
                image: "stew.png".to_string(),
                cooking_time: 90,
            }
        );
    }

    #[tokio::test]
    async fn test_second_add_conflicts_and_stores_once() {
        let (pool, service, user) = setup().await;
        service.add(&user, Collection::Favorites, 10).await.unwrap();

        let again = service.add(&user, Collection::Favorites, 10).await;
        assert!(matches!(again, Err(ToggleError::AlreadyPresent(_))));

        let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM favorites")
            .fetch_one(&pool)
            .await
            .unwrap()
            .get("count");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_add_then_remove_returns_to_empty() {
        let (_pool, service, user) = setup().await;

        service.add(&user, Collection::ShoppingCart, 10).await.unwrap();
        service.remove(&user, Collection::ShoppingCart, 10).await.unwrap();

        let again = service.remove(&user, Collection::ShoppingCart, 10).await;
        assert!(matches!(again, Err(ToggleError::NotPresent(_))));
    }

    #[tokio::test]
    async fn test_remove_without_add_is_not_present() {
        let (_pool, service, user) = setup().await;
        let result = service.remove(&user, Collection::Favorites, 10).await;
        assert!(matches!(result, Err(ToggleError::NotPresent(_))));
    }

    #[tokio::test]
    async fn test_missing_recipe_is_not_found() {
        let (_pool, service, user) = setup().await;
        assert!(matches!(
            service.add(&user, Collection::Favorites, 404).await,
            Err(ToggleError::NotFound(_))
        ));
        assert!(matches!(
            service.remove(&user, Collection::ShoppingCart, 404).await,
            Err(ToggleError::NotFound(_))
        ));
    }
}
