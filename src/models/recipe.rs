//! Recipe model
//!
//! Recipes, their ingredient rows and the request/response shapes of the
//! recipe endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Tag, UserProfile};

/// Recipe entity as stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    /// Unique identifier
    pub id: i64,
    /// Author user ID
    pub author_id: i64,
    /// Title, at most 200 characters
    pub name: String,
    /// Opaque image reference
    pub image: String,
    /// Free-text description
    pub text: String,
    /// Cooking time in minutes (always positive)
    pub cooking_time: i64,
    /// Publication timestamp; recipes are listed newest first
    pub pub_date: DateTime<Utc>,
}

/// One ingredient of a recipe together with its amount.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeIngredient {
    /// Ingredient ID (not the join row ID)
    #[serde(rename = "id")]
    pub ingredient_id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Ingredient reference in a recipe write payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngredientAmount {
    /// Ingredient ID
    pub id: i64,
    /// Amount, must be positive
    pub amount: i64,
}

impl IngredientAmount {
    pub fn new(id: i64, amount: i64) -> Self {
        Self { id, amount }
    }
}

/// Payload for creating a recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeInput {
    #[serde(default)]
    pub ingredients: Vec<IngredientAmount>,
    #[serde(default)]
    pub tags: Vec<i64>,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i64,
}

/// Payload for updating a recipe.
///
/// Scalar fields are optional and keep their stored value when absent.
/// Ingredients and tags are replaced wholesale and must be supplied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeUpdate {
    #[serde(default)]
    pub ingredients: Vec<IngredientAmount>,
    #[serde(default)]
    pub tags: Vec<i64>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
}

/// Fully validated recipe content, ready to be written in one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeDraft {
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i64,
    /// Distinct ingredient IDs with positive amounts, in submission order
    pub ingredients: Vec<IngredientAmount>,
    /// Distinct, existing tag IDs
    pub tags: Vec<i64>,
}

/// Short recipe representation returned by favorite/cart toggles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeShort {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub cooking_time: i64,
}

impl From<&Recipe> for RecipeShort {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.clone(),
            image: recipe.image.clone(),
            cooking_time: recipe.cooking_time,
        }
    }
}

/// Full recipe representation as seen by a (possibly anonymous) viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeDetail {
    pub id: i64,
    pub tags: Vec<Tag>,
    pub author: UserProfile,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i64,
}

/// Recipe list filter. Empty fields do not restrict the result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeFilter {
    /// Tag slugs; a recipe matches if it carries any of them
    pub tags: Vec<String>,
    pub author_id: Option<i64>,
    /// Only recipes favorited by this user
    pub favorited_by: Option<i64>,
    /// Only recipes in this user's shopping cart
    pub in_cart_of: Option<i64>,
}

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 6,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters, clamping to sane bounds
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 || self.total <= 0 {
            return 0;
        }
        ((self.total as u64 + self.per_page as u64 - 1) / self.per_page as u64) as u32
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Transform the items while keeping pagination metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}
