//! User-to-recipe collections and the rows the shopping list is built from.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A per-user recipe collection with toggle semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Favorites,
    ShoppingCart,
}

impl Collection {
    /// Backing table name
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Favorites => "favorites",
            Collection::ShoppingCart => "shopping_cart",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collection::Favorites => write!(f, "favorites"),
            Collection::ShoppingCart => write!(f, "shopping cart"),
        }
    }
}

/// One ingredient row of a recipe in a user's shopping cart.
///
/// Rows are produced in cart insertion order, then ingredient insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartIngredient {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

impl CartIngredient {
    pub fn new(name: impl Into<String>, measurement_unit: impl Into<String>, amount: i64) -> Self {
        Self {
            name: name.into(),
            measurement_unit: measurement_unit.into(),
            amount,
        }
    }
}
