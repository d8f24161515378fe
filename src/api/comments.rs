//! Comment API endpoints
//!
//! - GET /api/v1/articles/{id}/comments - Comments with the requester's permissions
//! - POST /api/v1/articles/{id}/comments - Comment on an article
//! - PUT /api/v1/comments/{id} - Edit (owner or superuser)
//! - DELETE /api/v1/comments/{id} - Delete (owner, superuser or article owner)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};
use crate::models::{Comment, CommentWithPermissions};

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct CommentListResponse {
    pub comments: Vec<CommentWithPermissions>,
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/articles/{id}/comments", get(list_comments))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/articles/{id}/comments", post(create_comment))
        .route("/comments/{id}", put(update_comment).delete(delete_comment))
}

async fn list_comments(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(article_id): Path<i64>,
) -> Result<Json<CommentListResponse>, ApiError> {
    let viewer = state.user_service.viewer_for(user.as_ref()).await?;
    let comments = state
        .comment_service
        .list_for_article(article_id, &viewer, user.as_ref())
        .await?;
    Ok(Json(CommentListResponse { comments }))
}

async fn create_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(article_id): Path<i64>,
    Json(body): Json<CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = state.user_service.viewer_for(Some(&user.0)).await?;
    let comment = state
        .comment_service
        .create(article_id, &user.0, &viewer, body.content)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn update_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<CommentRequest>,
) -> Result<Json<Comment>, ApiError> {
    let comment = state
        .comment_service
        .update(id, &user.0, body.content)
        .await?;
    Ok(Json(comment))
}

async fn delete_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.comment_service.delete(id, &user.0).await?;
    Ok(StatusCode::NO_CONTENT)
}
