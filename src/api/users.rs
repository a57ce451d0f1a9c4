//! User API endpoints
//!
//! - POST /api/users - Register
//! - GET /api/users/me - Current user
//! - GET /api/users/{id} - Any user's summary
//! - POST/DELETE /api/users/{id}/subscribe - Follow / unfollow

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};
use crate::models::{CreateUserInput, UserProfile};

/// Build the users router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(register))
        .route("/me", get(me))
        .route("/{id}", get(get_user))
        .route("/{id}/subscribe", post(subscribe).delete(unsubscribe))
}

/// POST /api/users
async fn register(
    State(state): State<AppState>,
    Json(body): Json<CreateUserInput>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    let user = state.user_service.register(body).await?;
    Ok((StatusCode::CREATED, Json(user.profile(false))))
}

/// GET /api/users/me
async fn me(AuthenticatedUser(user): AuthenticatedUser) -> Json<UserProfile> {
    Json(user.profile(false))
}

/// GET /api/users/{id}
async fn get_user(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = state.user_service.profile(id, viewer.user()).await?;
    Ok(Json(profile))
}

/// POST /api/users/{id}/subscribe
async fn subscribe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    let author = state.follow_service.follow(&user, id).await?;
    Ok((StatusCode::CREATED, Json(author)))
}

/// DELETE /api/users/{id}/subscribe
async fn unsubscribe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.follow_service.unfollow(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
