//! Tag model
//!
//! Tags label recipes ("Breakfast", "Dinner", ...). They are reference data
//! with a display color and a URL slug used by the recipe list filter.

use serde::{Deserialize, Serialize};

/// Tag entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    /// Unique identifier
    pub id: i64,
    /// Display name (unique)
    pub name: String,
    /// Hex color such as `#E26C2D` (unique)
    pub color: String,
    /// URL-friendly slug (unique)
    pub slug: String,
}

/// Input for creating a tag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTagInput {
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl CreateTagInput {
    pub fn new(name: impl Into<String>, color: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            slug: slug.into(),
        }
    }
}
