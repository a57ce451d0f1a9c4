//! Services layer - Business logic
//!
//! Services implement the rules of the recipe domain on top of the
//! repositories:
//! - validation and permission checks
//! - toggle semantics for favorites, cart and follows
//! - shopping list aggregation

pub mod follow;
pub mod ingredient;
pub mod password;
pub mod recipe;
pub mod shopping_list;
pub mod tag;
pub mod toggle;
pub mod user;

pub use follow::FollowService;
pub use ingredient::{IngredientService, IngredientServiceError};
pub use password::{hash_password, verify_password};
pub use recipe::{RecipeQuery, RecipeService, RecipeServiceError};
pub use shopping_list::{ShoppingListError, ShoppingListLine, ShoppingListService};
pub use tag::{TagService, TagServiceError};
pub use toggle::{CollectionService, ToggleError};
pub use user::{UserService, UserServiceError};
