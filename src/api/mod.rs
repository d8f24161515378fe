//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP API endpoints for the blog.
//! It includes:
//! - Auth API endpoints (register, login, reset, profile)
//! - Account settings endpoints
//! - Article API endpoints
//! - Comment API endpoints
//! - Admin API endpoints

pub mod account;
pub mod admin;
pub mod articles;
pub mod auth;
pub mod comments;
pub mod middleware;

use anyhow::Context;
use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    middleware as axum_middleware,
    routing::get,
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Superuser routes
    let admin_routes = Router::new()
        .nest("/admin", admin::router())
        .route_layer(axum_middleware::from_fn(middleware::require_superuser))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need a session)
    let protected_routes = Router::new()
        .merge(auth::protected_router())
        .nest("/account", account::router())
        .merge(articles::protected_router())
        .merge(comments::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes; a valid session still identifies the viewer
    let public_routes = Router::new()
        .merge(articles::public_router())
        .merge(comments::public_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::optional_auth,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(auth::public_router())
        .merge(public_routes)
        .merge(admin_routes)
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> anyhow::Result<Router> {
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {}", cors_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    Ok(Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// GET /api/v1/health - Database reachability and schema state
async fn health(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let checked = async {
        crate::db::ping(&state.pool).await?;
        crate::db::migrations::pending_count(&state.pool).await
    };

    match checked.await {
        Ok(pending) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "ok", "pending_migrations": pending })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {:#}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "unavailable" })),
            )
        }
    }
}
