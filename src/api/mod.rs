//! API layer - HTTP handlers and routing
//!
//! All endpoints live under `/api`:
//! - User and subscription endpoints
//! - Token login/logout
//! - Tag and ingredient reference data
//! - Recipes, favorites, shopping cart and the shopping list download

pub mod auth;
pub mod ingredients;
pub mod middleware;
pub mod recipes;
pub mod tags;
pub mod users;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};

/// Build the API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/users", users::router())
        .nest("/auth", auth::router())
        .nest("/tags", tags::router())
        .nest("/ingredients", ingredients::router())
        .nest("/recipes", recipes::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::optional_auth,
        ))
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let origin = match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(_) => {
            tracing::warn!("Invalid CORS origin '{}', allowing none", cors_origin);
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .nest("/api", build_api_router(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
