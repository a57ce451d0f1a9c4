//! Ingredient service

use crate::db::repositories::IngredientRepository;
use crate::models::{CreateIngredientInput, Ingredient};
use anyhow::Context;
use std::sync::Arc;

const MAX_FIELD_LENGTH: usize = 200;

/// Error types for ingredient service operations
#[derive(Debug, thiserror::Error)]
pub enum IngredientServiceError {
    #[error("Ingredient not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Ingredient service
pub struct IngredientService {
    repo: Arc<dyn IngredientRepository>,
}

impl IngredientService {
    pub fn new(repo: Arc<dyn IngredientRepository>) -> Self {
        Self { repo }
    }

    /// List ingredients ordered by name.
    ///
    /// With `name`, only ingredients whose name starts with it are returned;
    /// the comparison ignores case, including non-ASCII letters.
    pub async fn list(
        &self,
        name: Option<&str>,
    ) -> Result<Vec<Ingredient>, IngredientServiceError> {
        let all = self.repo.list().await.context("Failed to list ingredients")?;

        let prefix = match name.map(str::trim) {
            Some(p) if !p.is_empty() => p.to_lowercase(),
            _ => return Ok(all),
        };

        Ok(all
            .into_iter()
            .filter(|i| i.name.to_lowercase().starts_with(&prefix))
            .collect())
    }

    /// Get ingredient by ID
    pub async fn get(&self, id: i64) -> Result<Ingredient, IngredientServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get ingredient by ID")?
            .ok_or(IngredientServiceError::NotFound(id))
    }

    /// Create an ingredient, or return the existing one with the same name
    /// and unit. The flag is true when a new row was written.
    pub async fn create_or_get(
        &self,
        input: CreateIngredientInput,
    ) -> Result<(Ingredient, bool), IngredientServiceError> {
        let name = input.name.trim();
        let unit = input.measurement_unit.trim();

        if name.is_empty() || unit.is_empty() {
            return Err(IngredientServiceError::ValidationError(
                "Ingredient name and measurement unit cannot be empty".to_string(),
            ));
        }
        if name.chars().count() > MAX_FIELD_LENGTH || unit.chars().count() > MAX_FIELD_LENGTH {
            return Err(IngredientServiceError::ValidationError(
                "Ingredient name and measurement unit must be at most 200 characters".to_string(),
            ));
        }

        if let Some(existing) = self
            .repo
            .get_by_name_and_unit(name, unit)
            .await
            .context("Failed to check existing ingredient")?
        {
            return Ok((existing, false));
        }

        let created = self
            .repo
            .create(&CreateIngredientInput::new(name, unit))
            .await
            .context("Failed to create ingredient")?;
        Ok((created, true))
    }
}
