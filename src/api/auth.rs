//! Authentication API endpoints
//!
//! - POST /api/auth/token/login - Exchange email + password for a token
//! - POST /api/auth/token/logout - Invalidate the current token

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{extract_session_token, ApiError, AppState, AuthenticatedUser};

/// Request body for login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response for successful login
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub auth_token: String,
}

/// Build the auth router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/token/login", post(login))
        .route("/token/logout", post(logout))
}

/// POST /api/auth/token/login
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let session = state.user_service.login(&body.email, &body.password).await?;
    tracing::info!(user_id = session.user_id, "User logged in");

    Ok(Json(TokenResponse {
        auth_token: session.id,
    }))
}

/// POST /api/auth/token/logout
async fn logout(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    if let Some(token) = extract_session_token(&headers) {
        state.user_service.logout(&token).await?;
    }
    tracing::info!(user_id = user.id, "User logged out");
    Ok(StatusCode::NO_CONTENT)
}
