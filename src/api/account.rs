//! Account settings endpoints
//!
//! - PUT /api/v1/account/password - Change password
//! - PUT /api/v1/account/email - Change email

use axum::{extract::State, http::StatusCode, routing::put, Json, Router};

use crate::api::auth::UserResponse;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::services::user::{ChangeEmailInput, ChangePasswordInput};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/password", put(change_password))
        .route("/email", put(change_email))
}

async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ChangePasswordInput>,
) -> Result<StatusCode, ApiError> {
    state.user_service.change_password(user.0.id, body).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn change_email(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ChangeEmailInput>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.user_service.change_email(user.0.id, body).await?;
    Ok(Json(user.into()))
}
