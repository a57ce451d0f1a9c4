//! Recipe service
//!
//! Implements recipe composition:
//! - validation of the ingredient and tag sets before anything is written
//! - transactional create and update (join rows replaced wholesale)
//! - author/admin permission checks
//! - assembly of the full recipe representation for a viewer

use crate::config::DuplicateIngredientPolicy;
use crate::db::repositories::{
    FollowRepository, IngredientRepository, RecipeRepository, RelationRepository, TagRepository,
    UserRepository,
};
use crate::models::{
    Collection, IngredientAmount, ListParams, PagedResult, Recipe, RecipeDetail, RecipeDraft,
    RecipeFilter, RecipeInput, RecipeUpdate, User,
};
use anyhow::Context;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Maximum recipe name length in characters
pub const MAX_RECIPE_NAME_LENGTH: usize = 200;

/// Error types for recipe service operations
#[derive(Debug, thiserror::Error)]
pub enum RecipeServiceError {
    #[error("Recipe not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Only the author or an admin may change a recipe
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

fn invalid(msg: impl Into<String>) -> RecipeServiceError {
    RecipeServiceError::ValidationError(msg.into())
}

/// Recipe list query as seen from the HTTP layer.
///
/// The favorited/cart flags only apply to an authenticated viewer.
#[derive(Debug, Clone, Default)]
pub struct RecipeQuery {
    pub tags: Vec<String>,
    pub author: Option<i64>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl RecipeQuery {
    fn into_filter(self, viewer: Option<&User>) -> RecipeFilter {
        let viewer_id = viewer.map(|u| u.id);
        RecipeFilter {
            tags: self.tags,
            author_id: self.author,
            favorited_by: viewer_id.filter(|_| self.is_favorited),
            in_cart_of: viewer_id.filter(|_| self.is_in_shopping_cart),
        }
    }
}

/// Recipe service
pub struct RecipeService {
    recipe_repo: Arc<dyn RecipeRepository>,
    tag_repo: Arc<dyn TagRepository>,
    ingredient_repo: Arc<dyn IngredientRepository>,
    relation_repo: Arc<dyn RelationRepository>,
    user_repo: Arc<dyn UserRepository>,
    follow_repo: Arc<dyn FollowRepository>,
    duplicate_policy: DuplicateIngredientPolicy,
}

impl RecipeService {
    pub fn new(
        recipe_repo: Arc<dyn RecipeRepository>,
        tag_repo: Arc<dyn TagRepository>,
        ingredient_repo: Arc<dyn IngredientRepository>,
        relation_repo: Arc<dyn RelationRepository>,
        user_repo: Arc<dyn UserRepository>,
        follow_repo: Arc<dyn FollowRepository>,
    ) -> Self {
        Self {
            recipe_repo,
            tag_repo,
            ingredient_repo,
            relation_repo,
            user_repo,
            follow_repo,
            duplicate_policy: DuplicateIngredientPolicy::default(),
        }
    }

    /// Use `policy` for ingredient ids repeated within one payload
    pub fn with_duplicate_policy(mut self, policy: DuplicateIngredientPolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Create a recipe authored by `author`.
    ///
    /// All validation, including existence of every referenced tag and
    /// ingredient, runs before the write transaction starts.
    pub async fn create(
        &self,
        author: &User,
        input: RecipeInput,
    ) -> Result<RecipeDetail, RecipeServiceError> {
        let draft = RecipeDraft {
            name: input.name,
            image: input.image,
            text: input.text,
            cooking_time: input.cooking_time,
            ingredients: input.ingredients,
            tags: input.tags,
        };
        let draft = validate_draft(draft, self.duplicate_policy)?;
        self.ensure_references_exist(&draft).await?;

        let recipe = self
            .recipe_repo
            .create(author.id, &draft)
            .await
            .context("Failed to create recipe")?;

        tracing::info!(recipe_id = recipe.id, author_id = author.id, "Recipe created");
        self.detail(recipe, Some(author)).await
    }

    /// Update a recipe.
    ///
    /// Absent scalar fields keep their stored value; the ingredient and tag
    /// sets are always replaced.
    ///
    /// # Errors
    /// - `NotFound` if the recipe does not exist
    /// - `Forbidden` if `user` is neither the author nor an admin
    /// - `ValidationError` if the merged recipe is invalid
    pub async fn update(
        &self,
        user: &User,
        id: i64,
        update: RecipeUpdate,
    ) -> Result<RecipeDetail, RecipeServiceError> {
        let existing = self.get_recipe(id).await?;
        if !user.can_edit(existing.author_id) {
            return Err(RecipeServiceError::Forbidden(
                "Only the author can edit this recipe".to_string(),
            ));
        }

        let draft = RecipeDraft {
            name: update.name.unwrap_or(existing.name),
            image: update.image.unwrap_or(existing.image),
            text: update.text.unwrap_or(existing.text),
            cooking_time: update.cooking_time.unwrap_or(existing.cooking_time),
            ingredients: update.ingredients,
            tags: update.tags,
        };
        let draft = validate_draft(draft, self.duplicate_policy)?;
        self.ensure_references_exist(&draft).await?;

        let recipe = self
            .recipe_repo
            .update(id, &draft)
            .await
            .context("Failed to update recipe")?;

        self.detail(recipe, Some(user)).await
    }

    /// Delete a recipe
    pub async fn delete(&self, user: &User, id: i64) -> Result<(), RecipeServiceError> {
        let existing = self.get_recipe(id).await?;
        if !user.can_edit(existing.author_id) {
            return Err(RecipeServiceError::Forbidden(
                "Only the author can delete this recipe".to_string(),
            ));
        }

        // A concurrent delete may have won; either way the recipe is gone.
        self.recipe_repo
            .delete(id)
            .await
            .context("Failed to delete recipe")?;

        tracing::info!(recipe_id = id, user_id = user.id, "Recipe deleted");
        Ok(())
    }

    /// Get the stored recipe or `NotFound`
    pub async fn get_recipe(&self, id: i64) -> Result<Recipe, RecipeServiceError> {
        self.recipe_repo
            .get_by_id(id)
            .await
            .context("Failed to get recipe")?
            .ok_or(RecipeServiceError::NotFound(id))
    }

    /// Full representation of one recipe for `viewer`
    pub async fn get(
        &self,
        viewer: Option<&User>,
        id: i64,
    ) -> Result<RecipeDetail, RecipeServiceError> {
        let recipe = self.get_recipe(id).await?;
        self.detail(recipe, viewer).await
    }

    /// Newest-first page of recipes for `viewer`
    pub async fn list(
        &self,
        viewer: Option<&User>,
        query: RecipeQuery,
        params: &ListParams,
    ) -> Result<PagedResult<RecipeDetail>, RecipeServiceError> {
        let filter = query.into_filter(viewer);
        let page = self
            .recipe_repo
            .list(&filter, params)
            .await
            .context("Failed to list recipes")?;

        let mut items = Vec::with_capacity(page.items.len());
        for recipe in page.items {
            items.push(self.detail(recipe, viewer).await?);
        }

        Ok(PagedResult {
            items,
            total: page.total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    async fn ensure_references_exist(&self, draft: &RecipeDraft) -> Result<(), RecipeServiceError> {
        let ingredient_ids: Vec<i64> = draft.ingredients.iter().map(|i| i.id).collect();
        let found: HashSet<i64> = self
            .ingredient_repo
            .get_by_ids(&ingredient_ids)
            .await
            .context("Failed to look up ingredients")?
            .into_iter()
            .map(|i| i.id)
            .collect();
        if let Some(missing) = ingredient_ids.iter().find(|id| !found.contains(id)) {
            return Err(invalid(format!("Ingredient {} does not exist", missing)));
        }

        let found: HashSet<i64> = self
            .tag_repo
            .get_by_ids(&draft.tags)
            .await
            .context("Failed to look up tags")?
            .into_iter()
            .map(|t| t.id)
            .collect();
        if let Some(missing) = draft.tags.iter().find(|id| !found.contains(id)) {
            return Err(invalid(format!("Tag {} does not exist", missing)));
        }

        Ok(())
    }

    async fn detail(
        &self,
        recipe: Recipe,
        viewer: Option<&User>,
    ) -> Result<RecipeDetail, RecipeServiceError> {
        let author = self
            .user_repo
            .get_by_id(recipe.author_id)
            .await
            .context("Failed to get recipe author")?
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Author {} of recipe {} is missing",
                    recipe.author_id,
                    recipe.id
                )
            })?;

        let tags = self
            .recipe_repo
            .get_tags(recipe.id)
            .await
            .context("Failed to get recipe tags")?;
        let ingredients = self
            .recipe_repo
            .get_ingredients(recipe.id)
            .await
            .context("Failed to get recipe ingredients")?;

        let (is_subscribed, is_favorited, is_in_shopping_cart) = match viewer {
            Some(viewer) => (
                self.follow_repo
                    .exists(viewer.id, author.id)
                    .await
                    .context("Failed to check subscription")?,
                self.relation_repo
                    .contains(Collection::Favorites, viewer.id, recipe.id)
                    .await
                    .context("Failed to check favorites")?,
                self.relation_repo
                    .contains(Collection::ShoppingCart, viewer.id, recipe.id)
                    .await
                    .context("Failed to check shopping cart")?,
            ),
            None => (false, false, false),
        };

        Ok(RecipeDetail {
            id: recipe.id,
            tags,
            author: author.profile(is_subscribed),
            ingredients,
            is_favorited,
            is_in_shopping_cart,
            name: recipe.name,
            image: recipe.image,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
        })
    }
}

/// Validate a recipe's content without touching the store.
///
/// Returns the draft with trimmed name and, under the merge policy, repeated
/// ingredient ids folded into their first occurrence.
pub fn validate_draft(
    draft: RecipeDraft,
    policy: DuplicateIngredientPolicy,
) -> Result<RecipeDraft, RecipeServiceError> {
    let name = draft.name.trim().to_string();
    if name.is_empty() {
        return Err(invalid("Recipe name cannot be empty"));
    }
    if name.chars().count() > MAX_RECIPE_NAME_LENGTH {
        return Err(invalid("Recipe name must be at most 200 characters"));
    }
    if draft.text.trim().is_empty() {
        return Err(invalid("Recipe text cannot be empty"));
    }
    if draft.image.trim().is_empty() {
        return Err(invalid("Recipe image cannot be empty"));
    }
    if draft.cooking_time < 1 {
        return Err(invalid("Cooking time must be at least 1 minute"));
    }

    let ingredients = validate_ingredients(draft.ingredients, policy)?;

    if draft.tags.is_empty() {
        return Err(invalid("A recipe must have at least one tag"));
    }
    let mut seen = HashSet::new();
    if let Some(dup) = draft.tags.iter().find(|id| !seen.insert(**id)) {
        return Err(invalid(format!("Tag {} is listed more than once", dup)));
    }

    Ok(RecipeDraft {
        name,
        image: draft.image,
        text: draft.text,
        cooking_time: draft.cooking_time,
        ingredients,
        tags: draft.tags,
    })
}

fn validate_ingredients(
    items: Vec<IngredientAmount>,
    policy: DuplicateIngredientPolicy,
) -> Result<Vec<IngredientAmount>, RecipeServiceError> {
    if items.is_empty() {
        return Err(invalid("A recipe must contain at least one ingredient"));
    }
    if let Some(bad) = items.iter().find(|i| i.amount < 1) {
        return Err(invalid(format!(
            "Amount of ingredient {} must be at least 1",
            bad.id
        )));
    }

    let mut merged: Vec<IngredientAmount> = Vec::with_capacity(items.len());
    let mut index: HashMap<i64, usize> = HashMap::new();
    for item in items {
        match index.get(&item.id) {
            None => {
                index.insert(item.id, merged.len());
                merged.push(item);
            }
            Some(_) if policy == DuplicateIngredientPolicy::Reject => {
                return Err(invalid("Ingredients must be unique"));
            }
            Some(&pos) => {
                let entry = &mut merged[pos];
                entry.amount = entry.amount.checked_add(item.amount).ok_or_else(|| {
                    invalid(format!("Amount of ingredient {} is too large", item.id))
                })?;
            }
        }
    }

    Ok(merged)
}
