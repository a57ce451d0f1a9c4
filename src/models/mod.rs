//! Data models
//!
//! Data structures shared by the repositories, services and API:
//! - Database entities (User, Session, Tag, Ingredient, Recipe)
//! - API request/response types
//! - Internal data transfer objects

mod ingredient;
mod recipe;
mod relation;
mod session;
mod tag;
mod user;

pub use ingredient::{CreateIngredientInput, Ingredient};
pub use recipe::{
    IngredientAmount, ListParams, PagedResult, Recipe, RecipeDetail, RecipeDraft, RecipeFilter,
    RecipeIngredient, RecipeInput, RecipeShort, RecipeUpdate,
};
pub use relation::{CartIngredient, Collection};
pub use session::Session;
pub use tag::{CreateTagInput, Tag};
pub use user::{CreateUserInput, User, UserProfile, UserRole};
