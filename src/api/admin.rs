//! Admin API endpoints
//!
//! Superuser-only:
//! - POST /api/v1/admin/users/{id}/ban - Ban an account for a duration

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};

use crate::api::auth::UserResponse;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::BanDuration;

pub fn router() -> Router<AppState> {
    Router::new().route("/users/{id}/ban", post(ban_user))
}

/// Body is `{ "minutes", "hours", "days", "weeks" }`; missing parts count as zero.
async fn ban_user(
    State(state): State<AppState>,
    admin: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(duration): Json<BanDuration>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.user_service.ban_user(&admin.0, id, duration).await?;
    Ok(Json(user.into()))
}
