//! Article API endpoints
//!
//! Handles HTTP requests for article management:
//! - GET /api/v1/articles - Articles visible to the requester, newest first
//! - GET /api/v1/articles/{id} - One article (404 when hidden)
//! - POST /api/v1/articles - Publish
//! - PUT /api/v1/articles/{id} - Edit title and entry
//! - DELETE /api/v1/articles/{id} - Delete, with its comments

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};
use crate::models::{Article, CreateArticleInput, UpdateArticleInput};

/// Response for article list
#[derive(Debug, Serialize)]
pub struct ArticleListResponse {
    pub articles: Vec<Article>,
    pub total: usize,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/articles", get(list_articles))
        .route("/articles/{id}", get(get_article))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/articles", post(create_article))
        .route(
            "/articles/{id}",
            axum::routing::put(update_article).delete(delete_article),
        )
}

async fn list_articles(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> Result<Json<ArticleListResponse>, ApiError> {
    let viewer = state.user_service.viewer_for(user.as_ref()).await?;
    let articles = state.article_service.list_visible(&viewer).await?;
    Ok(Json(ArticleListResponse {
        total: articles.len(),
        articles,
    }))
}

async fn get_article(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<Article>, ApiError> {
    let viewer = state.user_service.viewer_for(user.as_ref()).await?;
    let article = state.article_service.get_visible(id, &viewer).await?;
    Ok(Json(article))
}

async fn create_article(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateArticleInput>,
) -> Result<impl IntoResponse, ApiError> {
    let article = state.article_service.create(&user.0, body).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

async fn update_article(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateArticleInput>,
) -> Result<Json<Article>, ApiError> {
    let article = state.article_service.update(id, &user.0, body).await?;
    Ok(Json(article))
}

async fn delete_article(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.article_service.delete(id, &user.0).await?;
    Ok(StatusCode::NO_CONTENT)
}
