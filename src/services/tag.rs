//! Tag service
//!
//! Tags are reference data: listed and fetched over HTTP, created by the
//! loader. Creation validates the color and slug formats and the uniqueness
//! of name, color and slug.

use crate::db::repositories::{TagField, TagRepository};
use crate::models::{CreateTagInput, Tag};
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

const MAX_TAG_NAME_LENGTH: usize = 200;

static COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[a-fA-F0-9]{6}$").expect("valid color regex"));
static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid slug regex"));

/// Error types for tag service operations
#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    /// Tag not found
    #[error("Tag not found: {0}")]
    NotFound(i64),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Name, color or slug already used by another tag
    #[error("Tag already exists: {0}")]
    Conflict(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Tag service
pub struct TagService {
    repo: Arc<dyn TagRepository>,
}

impl TagService {
    pub fn new(repo: Arc<dyn TagRepository>) -> Self {
        Self { repo }
    }

    /// Create a tag after validating its fields.
    ///
    /// # Errors
    /// - `ValidationError` if the name is empty or too long, or color/slug
    ///   don't match their formats
    /// - `Conflict` if any of name, color or slug is taken
    pub async fn create(&self, input: CreateTagInput) -> Result<Tag, TagServiceError> {
        let input = CreateTagInput::new(input.name.trim(), input.color.trim(), input.slug.trim());
        validate_tag(&input)?;

        for (field, value) in [
            (TagField::Name, &input.name),
            (TagField::Color, &input.color),
            (TagField::Slug, &input.slug),
        ] {
            if self
                .repo
                .get_by_field(field, value)
                .await
                .context("Failed to check existing tag")?
                .is_some()
            {
                return Err(TagServiceError::Conflict(format!(
                    "A tag with {} '{}' already exists",
                    field.label(),
                    value
                )));
            }
        }

        let tag = self.repo.create(&input).await.context("Failed to create tag")?;
        Ok(tag)
    }

    /// Get tag by ID
    pub async fn get(&self, id: i64) -> Result<Tag, TagServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get tag by ID")?
            .ok_or(TagServiceError::NotFound(id))
    }

    /// Get tag by slug
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>, TagServiceError> {
        self.repo
            .get_by_field(TagField::Slug, slug)
            .await
            .context("Failed to get tag by slug")
            .map_err(Into::into)
    }

    /// List all tags ordered by name
    pub async fn list(&self) -> Result<Vec<Tag>, TagServiceError> {
        self.repo
            .list()
            .await
            .context("Failed to list tags")
            .map_err(Into::into)
    }
}

/// Check the formats of a tag's fields
pub fn validate_tag(input: &CreateTagInput) -> Result<(), TagServiceError> {
    if input.name.is_empty() {
        return Err(TagServiceError::ValidationError(
            "Tag name cannot be empty".to_string(),
        ));
    }
    if input.name.chars().count() > MAX_TAG_NAME_LENGTH {
        return Err(TagServiceError::ValidationError(
            "Tag name must be at most 200 characters".to_string(),
        ));
    }
    if !COLOR_RE.is_match(&input.color) {
        return Err(TagServiceError::ValidationError(format!(
            "Invalid color '{}', expected #RRGGBB",
            input.color
        )));
    }
    if !SLUG_RE.is_match(&input.slug) {
        return Err(TagServiceError::ValidationError(format!(
            "Invalid slug '{}', only letters, digits, '-' and '_' are allowed",
            input.slug
        )));
    }
    Ok(())
}

impl TagField {
    fn label(&self) -> &'static str {
        match self {
            TagField::Name => "name",
            TagField::Color => "color",
            TagField::Slug => "slug",
        }
    }
}
