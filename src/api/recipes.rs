//! Recipe API endpoints
//!
//! Handles HTTP requests for recipes:
//! - GET /api/recipes - Paginated list, newest first, with filters
//! - POST /api/recipes - Create
//! - GET/PATCH/DELETE /api/recipes/{id}
//! - POST/DELETE /api/recipes/{id}/favorite
//! - POST/DELETE /api/recipes/{id}/shopping_cart
//! - GET /api/recipes/download_shopping_cart - Aggregated shopping list

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};
use crate::models::{
    Collection, ListParams, PagedResult, RecipeDetail, RecipeInput, RecipeShort, RecipeUpdate,
};
use crate::services::RecipeQuery;

/// Paginated recipe list response
#[derive(Debug, Serialize, Deserialize)]
pub struct RecipePage {
    pub count: i64,
    pub next_page: Option<u32>,
    pub previous_page: Option<u32>,
    pub results: Vec<RecipeDetail>,
}

impl From<PagedResult<RecipeDetail>> for RecipePage {
    fn from(page: PagedResult<RecipeDetail>) -> Self {
        Self {
            count: page.total,
            next_page: page.has_next().then(|| page.page + 1),
            previous_page: page.has_prev().then(|| page.page - 1),
            results: page.items,
        }
    }
}

/// Build the recipes router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_recipes).post(create_recipe))
        .route("/download_shopping_cart", get(download_shopping_cart))
        .route(
            "/{id}",
            get(get_recipe).patch(update_recipe).delete(delete_recipe),
        )
        .route("/{id}/favorite", post(add_favorite).delete(remove_favorite))
        .route(
            "/{id}/shopping_cart",
            post(add_to_cart).delete(remove_from_cart),
        )
}

/// Parse the list query string.
///
/// `tags` may repeat, so the raw pairs are walked instead of deserializing
/// into a struct.
fn parse_list_query(
    pairs: Vec<(String, String)>,
    default_page_size: u32,
) -> Result<(RecipeQuery, ListParams), ApiError> {
    let mut query = RecipeQuery::default();
    let mut page = 1u32;
    let mut limit = default_page_size;

    let number = |key: &str, value: &str| {
        value.parse::<u32>().map_err(|_| {
            ApiError::validation_error(format!("'{}' must be a positive integer", key))
        })
    };

    for (key, value) in pairs {
        match key.as_str() {
            "tags" if !value.is_empty() => query.tags.push(value),
            "author" => {
                let id = value
                    .parse::<i64>()
                    .map_err(|_| ApiError::validation_error("'author' must be a user id"))?;
                query.author = Some(id);
            }
            "is_favorited" => query.is_favorited = is_truthy(&value),
            "is_in_shopping_cart" => query.is_in_shopping_cart = is_truthy(&value),
            "page" => page = number("page", &value)?,
            "limit" => limit = number("limit", &value)?,
            _ => {}
        }
    }

    Ok((query, ListParams::new(page, limit)))
}

fn is_truthy(value: &str) -> bool {
    matches!(value, "1" | "true" | "True")
}

/// GET /api/recipes
async fn list_recipes(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<RecipePage>, ApiError> {
    let (query, params) = parse_list_query(pairs, state.page_size)?;
    let page = state
        .recipe_service
        .list(viewer.user(), query, &params)
        .await?;
    Ok(Json(page.into()))
}

/// POST /api/recipes
async fn create_recipe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<RecipeInput>,
) -> Result<(StatusCode, Json<RecipeDetail>), ApiError> {
    let recipe = state.recipe_service.create(&user, body).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

/// GET /api/recipes/{id}
async fn get_recipe(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<RecipeDetail>, ApiError> {
    Ok(Json(state.recipe_service.get(viewer.user(), id).await?))
}

/// PATCH /api/recipes/{id}
async fn update_recipe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<RecipeUpdate>,
) -> Result<Json<RecipeDetail>, ApiError> {
    Ok(Json(state.recipe_service.update(&user, id, body).await?))
}

/// DELETE /api/recipes/{id}
async fn delete_recipe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.recipe_service.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_to_collection(
    state: &AppState,
    user: &crate::models::User,
    collection: Collection,
    id: i64,
) -> Result<(StatusCode, Json<RecipeShort>), ApiError> {
    let recipe = state.collection_service.add(user, collection, id).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

async fn remove_from_collection(
    state: &AppState,
    user: &crate::models::User,
    collection: Collection,
    id: i64,
) -> Result<StatusCode, ApiError> {
    state.collection_service.remove(user, collection, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/recipes/{id}/favorite
async fn add_favorite(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<RecipeShort>), ApiError> {
    add_to_collection(&state, &user, Collection::Favorites, id).await
}

/// DELETE /api/recipes/{id}/favorite
async fn remove_favorite(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    remove_from_collection(&state, &user, Collection::Favorites, id).await
}

/// POST /api/recipes/{id}/shopping_cart
async fn add_to_cart(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<RecipeShort>), ApiError> {
    add_to_collection(&state, &user, Collection::ShoppingCart, id).await
}

/// DELETE /api/recipes/{id}/shopping_cart
async fn remove_from_cart(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    remove_from_collection(&state, &user, Collection::ShoppingCart, id).await
}

/// GET /api/recipes/download_shopping_cart
async fn download_shopping_cart(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Response, ApiError> {
    let body = state.shopping_list_service.download(&user).await?;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename={}",
        state.shopping_list_filename
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment; filename=shopping_list.txt"));

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
