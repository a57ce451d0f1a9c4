//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the queries for a specific entity.

pub mod follow;
pub mod ingredient;
pub mod recipe;
pub mod relation;
pub mod session;
pub mod tag;
pub mod user;

pub use follow::{FollowRepository, SqlxFollowRepository};
pub use ingredient::{IngredientRepository, SqlxIngredientRepository};
pub use recipe::{RecipeRepository, SqlxRecipeRepository};
pub use relation::{RelationRepository, SqlxRelationRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use tag::{SqlxTagRepository, TagField, TagRepository};
pub use user::{SqlxUserRepository, UserRepository};

/// Comma-separated `?` placeholders for an `IN (...)` list
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }
}
