//! Authentication API endpoints
//!
//! Handles HTTP requests for account authentication:
//! - POST /api/v1/auth/register - Registration (account starts inactive)
//! - POST /api/v1/auth/login - Login, sets the `session` cookie
//! - POST /api/v1/auth/reset-password - Mail a generated password
//! - POST /api/v1/auth/logout - Logout
//! - GET /api/v1/auth/me - Current account and profile
//! - POST /api/v1/auth/profile - Create the profile, activating the account

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::middleware::{extract_session_token, ApiError, AppState, AuthenticatedUser};
use crate::models::{CreateProfileInput, Profile, User};
use crate::services::user::{LoginInput, RegisterInput, ResetPasswordInput};

/// Response for successful authentication
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
    /// The account has no profile yet
    pub needs_profile: bool,
}

/// Response for user info
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub nick: String,
    pub email: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub is_banned: bool,
    pub ban_ends_at: Option<DateTime<Utc>>,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            nick: user.nick,
            email: user.email,
            is_active: user.is_active,
            is_superuser: user.is_superuser,
            is_banned: user.is_banned,
            ban_ends_at: user.ban_ends_at,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserResponse,
    pub profile: Option<Profile>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(get_current_user))
        .route("/auth/profile", post(create_profile))
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/reset-password", post(reset_password))
}

/// POST /api/v1/auth/register - Account registration
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterInput>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.user_service.register(body).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// POST /api/v1/auth/login - Login
///
/// Banned accounts get `USER_BANNED` with the ban end in `details`.
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.user_service.login(body).await?;

    let cookie = format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        outcome.session.id, state.session_max_age_secs
    );
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie)
            .map_err(|e| ApiError::internal_error(format!("Invalid cookie: {}", e)))?,
    );

    Ok((
        headers,
        Json(AuthResponse {
            needs_profile: outcome.needs_profile,
            user: outcome.user.into(),
            token: outcome.session.id,
        }),
    ))
}

/// POST /api/v1/auth/reset-password - Mail a new password
async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordInput>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.user_service.reset_password(body).await?;
    Ok(Json(MessageResponse {
        message: "A new password has been sent to your email address.".to_string(),
    }))
}

/// POST /api/v1/auth/logout - Logout
async fn logout(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = extract_session_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    state.user_service.logout(&token).await?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"),
    );

    Ok((StatusCode::NO_CONTENT, response_headers))
}

/// GET /api/v1/auth/me - Current account
async fn get_current_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<MeResponse>, ApiError> {
    let profile = state.user_service.get_profile(&user.0).await?;
    Ok(Json(MeResponse {
        user: user.0.into(),
        profile,
    }))
}

/// POST /api/v1/auth/profile - Create profile
async fn create_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateProfileInput>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, profile) = state.user_service.create_profile(user.0.id, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(MeResponse {
            user: user.into(),
            profile: Some(profile),
        }),
    ))
}
