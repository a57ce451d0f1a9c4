//! Ingredient model

use serde::{Deserialize, Serialize};

/// Ingredient reference data: a product and the unit it is measured in.
///
/// Several records may share the same name and unit; the shopping list
/// merges them by that pair rather than by id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
}

/// Input for creating an ingredient (loader format)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIngredientInput {
    pub name: String,
    pub measurement_unit: String,
}

impl CreateIngredientInput {
    pub fn new(name: impl Into<String>, measurement_unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            measurement_unit: measurement_unit.into(),
        }
    }
}
