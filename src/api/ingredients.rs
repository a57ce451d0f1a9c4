//! Ingredient API endpoints
//!
//! - GET /api/ingredients?name=<prefix> - Ingredients ordered by name
//! - GET /api/ingredients/{id} - One ingredient

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState};
use crate::models::Ingredient;

/// Query parameters for the ingredient list
#[derive(Debug, Deserialize)]
pub struct ListIngredientsQuery {
    /// Case-insensitive name prefix
    pub name: Option<String>,
}

/// Build the ingredients router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_ingredients))
        .route("/{id}", get(get_ingredient))
}

async fn list_ingredients(
    State(state): State<AppState>,
    Query(query): Query<ListIngredientsQuery>,
) -> Result<Json<Vec<Ingredient>>, ApiError> {
    let ingredients = state
        .ingredient_service
        .list(query.name.as_deref())
        .await?;
    Ok(Json(ingredients))
}

async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Ingredient>, ApiError> {
    Ok(Json(state.ingredient_service.get(id).await?))
}
