//! API middleware
//!
//! Contains:
//! - Application state shared by all handlers
//! - `ApiError`, the JSON error body every handler returns
//! - Session token resolution (`Authorization: Token <t>` or `Bearer <t>`)
//! - `AuthenticatedUser` / `MaybeUser` extractors

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::Config;
use crate::db::repositories::{
    SqlxFollowRepository, SqlxIngredientRepository, SqlxRecipeRepository, SqlxRelationRepository,
    SqlxSessionRepository, SqlxTagRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::services::{
    CollectionService, FollowService, IngredientService, IngredientServiceError, RecipeService,
    RecipeServiceError, ShoppingListError, ShoppingListService, TagService, TagServiceError,
    ToggleError, UserService, UserServiceError,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub tag_service: Arc<TagService>,
    pub ingredient_service: Arc<IngredientService>,
    pub recipe_service: Arc<RecipeService>,
    pub collection_service: Arc<CollectionService>,
    pub follow_service: Arc<FollowService>,
    pub shopping_list_service: Arc<ShoppingListService>,
    /// Attachment name of the shopping list download
    pub shopping_list_filename: Arc<str>,
    /// Default page size of the recipe list
    pub page_size: u32,
}

impl AppState {
    /// Wire repositories and services on top of `pool`
    pub fn new(pool: DynDatabasePool, config: &Config) -> Self {
        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let follow_repo = SqlxFollowRepository::boxed(pool.clone());
        let tag_repo = SqlxTagRepository::boxed(pool.clone());
        let ingredient_repo = SqlxIngredientRepository::boxed(pool.clone());
        let recipe_repo = SqlxRecipeRepository::boxed(pool.clone());
        let relation_repo = SqlxRelationRepository::boxed(pool.clone());

        let user_service = UserService::with_session_expiration(
            user_repo.clone(),
            session_repo,
            follow_repo.clone(),
            config.auth.session_days,
        );
        let recipe_service = RecipeService::new(
            recipe_repo.clone(),
            tag_repo.clone(),
            ingredient_repo.clone(),
            relation_repo.clone(),
            user_repo.clone(),
            follow_repo.clone(),
        )
        .with_duplicate_policy(config.recipes.duplicate_ingredients);

        Self {
            user_service: Arc::new(user_service),
            tag_service: Arc::new(TagService::new(tag_repo)),
            ingredient_service: Arc::new(IngredientService::new(ingredient_repo)),
            recipe_service: Arc::new(recipe_service),
            collection_service: Arc::new(CollectionService::new(
                relation_repo.clone(),
                recipe_repo,
            )),
            follow_service: Arc::new(FollowService::new(follow_repo, user_repo)),
            shopping_list_service: Arc::new(ShoppingListService::new(relation_repo)),
            shopping_list_filename: Arc::from(config.shopping_list.filename.as_str()),
            page_size: config.recipes.page_size,
        }
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// The current user if the request carried a valid token
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    /// Log the cause and hide it from the client
    pub fn internal(err: &anyhow::Error) -> Self {
        tracing::error!("Internal error: {:#}", err);
        Self::internal_error("Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

// ============================================================================
// Service error mapping
// ============================================================================

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            UserServiceError::UserExists(msg) => ApiError::conflict(msg),
            UserServiceError::NotFound(id) => ApiError::not_found(format!("User {} not found", id)),
            UserServiceError::InternalError(e) => ApiError::internal(&e),
        }
    }
}

impl From<TagServiceError> for ApiError {
    fn from(err: TagServiceError) -> Self {
        match err {
            TagServiceError::NotFound(id) => ApiError::not_found(format!("Tag {} not found", id)),
            TagServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            TagServiceError::Conflict(msg) => ApiError::conflict(msg),
            TagServiceError::InternalError(e) => ApiError::internal(&e),
        }
    }
}

impl From<IngredientServiceError> for ApiError {
    fn from(err: IngredientServiceError) -> Self {
        match err {
            IngredientServiceError::NotFound(id) => {
                ApiError::not_found(format!("Ingredient {} not found", id))
            }
            IngredientServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            IngredientServiceError::InternalError(e) => ApiError::internal(&e),
        }
    }
}

impl From<RecipeServiceError> for ApiError {
    fn from(err: RecipeServiceError) -> Self {
        match err {
            RecipeServiceError::NotFound(id) => {
                ApiError::not_found(format!("Recipe {} not found", id))
            }
            RecipeServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            RecipeServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            RecipeServiceError::InternalError(e) => ApiError::internal(&e),
        }
    }
}

impl From<ToggleError> for ApiError {
    fn from(err: ToggleError) -> Self {
        match err {
            ToggleError::NotFound(msg) => ApiError::not_found(msg),
            ToggleError::AlreadyPresent(msg) => ApiError::conflict(msg),
            ToggleError::NotPresent(msg) => ApiError::not_found(msg),
            e @ ToggleError::SelfFollow => ApiError::conflict(e.to_string()),
            ToggleError::InternalError(e) => ApiError::internal(&e),
        }
    }
}

impl From<ShoppingListError> for ApiError {
    fn from(err: ShoppingListError) -> Self {
        match err {
            ShoppingListError::Overflow { name, unit } => ApiError::with_details(
                "VALIDATION_ERROR",
                "Shopping list total is too large",
                serde_json::json!({ "name": name, "measurement_unit": unit }),
            ),
            ShoppingListError::InternalError(e) => ApiError::internal(&e),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::internal(&err)
    }
}

// ============================================================================
// Authentication
// ============================================================================

/// Extract the session token from the `Authorization` header
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Token ")
        .or_else(|| value.strip_prefix("Bearer "))?
        .trim();

    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Resolve the current user, if any
///
/// A valid token puts an `AuthenticatedUser` into the request extensions.
/// Missing or invalid tokens let the request through anonymously; protected
/// handlers reject it through the `AuthenticatedUser` extractor.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_session_token(request.headers()) {
        match state.user_service.validate_session(&token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Session validation failed: {}", e),
        }
    }
    next.run(request).await
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication credentials were not provided"))
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .map(|au| au.0.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_token_scheme() {
        assert_eq!(extract_session_token(&headers("Token abc")), Some("abc".to_string()));
        assert_eq!(extract_session_token(&headers("Bearer xyz")), Some("xyz".to_string()));
    }

    #[test]
    fn test_extract_token_rejects_other_schemes() {
        assert_eq!(extract_session_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(extract_session_token(&headers("Token ")), None);
        assert_eq!(extract_session_token(&headers("abc")), None);
        assert_eq!(extract_session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(ApiError::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::validation_error("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::internal_error("x").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_toggle_errors_map_to_http_codes() {
        let conflict: ApiError = ToggleError::AlreadyPresent("dup".into()).into();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
        let missing: ApiError = ToggleError::NotPresent("gone".into()).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        let own: ApiError = ToggleError::SelfFollow.into();
        assert_eq!(own.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_shopping_list_overflow_names_the_line() {
        let err: ApiError = ShoppingListError::Overflow {
            name: "Flour".into(),
            unit: "g".into(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let body = serde_json::to_value(&err).unwrap();
        assert_eq!(body["error"]["details"]["name"], "Flour");
        assert_eq!(body["error"]["details"]["measurement_unit"], "g");
    }

    #[test]
    fn test_internal_error_hides_cause() {
        let err: ApiError =
            RecipeServiceError::InternalError(anyhow::anyhow!("disk on fire")).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.error.message.contains("disk"));
    }

    #[test]
    fn test_error_body_shape() {
        let body = serde_json::to_value(ApiError::with_details(
            "VALIDATION_ERROR",
            "bad",
            serde_json::json!({"field": "cooking_time"}),
        ))
        .unwrap();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["details"]["field"], "cooking_time");
        let plain = serde_json::to_value(ApiError::not_found("x")).unwrap();
        assert!(plain["error"].get("details").is_none());
    }
}
