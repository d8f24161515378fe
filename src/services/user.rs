//! User service
//!
//! Account lifecycle:
//! - registration creates an inactive account
//! - creating a profile activates it
//! - login checks the password, lifts an expired ban, refuses an active
//!   one, then opens a session
//! - password reset/change and email change notify the account by email
//! - superusers may ban other accounts

use crate::config::SuperuserConfig;
use crate::db::repositories::{ProfileRepository, SessionRepository, UserRepository};
use crate::models::{BanDuration, CreateProfileInput, Profile, Session, User};
use crate::services::authorization::Viewer;
use crate::services::ban::{authenticate_allowed, BanError, BanManager};
use crate::services::clock::Clock;
use crate::services::email::AccountMailer;
use crate::services::password::{
    generate_password, hash_password, verify_password, GENERATED_PASSWORD_LEN,
};
use crate::services::validation::{self, FieldError};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Invalid credentials or unknown account
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Credentials were fine but the account is serving a ban
    #[error("{}", banned_message(.username, .ban_ends_at))]
    Banned {
        username: String,
        ban_ends_at: Option<DateTime<Utc>>,
    },

    #[error("Validation error: {0}")]
    ValidationError(#[from] FieldError),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<BanError> for UserServiceError {
    fn from(err: BanError) -> Self {
        match err {
            BanError::ForbiddenOperation => Self::Forbidden(err.to_string()),
            BanError::InvalidDuration => {
                Self::ValidationError(FieldError::new("duration", err.to_string()))
            }
            BanError::InternalError(e) => Self::InternalError(e),
        }
    }
}

fn banned_message(username: &str, ban_ends_at: &Option<DateTime<Utc>>) -> String {
    let until = ban_ends_at
        .map(|t| t.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    format!(
        "User about this username: {} is banned. Unlocking your account will: {}",
        username, until
    )
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub session: Session,
    pub user: User,
    /// The account has no profile yet and must create one
    pub needs_profile: bool,
}

/// User service for managing accounts and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    profile_repo: Arc<dyn ProfileRepository>,
    session_repo: Arc<dyn SessionRepository>,
    bans: Arc<BanManager>,
    mailer: AccountMailer,
    clock: Arc<dyn Clock>,
    session_expiration_days: i64,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        profile_repo: Arc<dyn ProfileRepository>,
        session_repo: Arc<dyn SessionRepository>,
        bans: Arc<BanManager>,
        mailer: AccountMailer,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            user_repo,
            profile_repo,
            session_repo,
            bans,
            mailer,
            clock,
            session_expiration_days: DEFAULT_SESSION_EXPIRATION_DAYS,
        }
    }

    pub fn with_session_expiration(mut self, days: i64) -> Self {
        self.session_expiration_days = days;
        self
    }

    /// Register a new, inactive account.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for any field rule
    /// - `UserExists` if username, nick or email is taken
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        validation::validate_username(&input.username)?;
        validation::validate_nick(&input.nick)?;
        validation::validate_nick_differs(&input.username, &input.nick)?;
        validation::validate_email("email", &input.email)?;
        validation::validate_password_pair(&input.password1, &input.password2)?;

        if self.user_repo.get_by_username(&input.username).await?.is_some() {
            return Err(UserServiceError::UserExists(
                "A user with that username already exists.".to_string(),
            ));
        }
        if self.user_repo.get_by_nick(&input.nick).await?.is_some() {
            return Err(UserServiceError::UserExists(
                "A user with that nick already exists.".to_string(),
            ));
        }
        if self.user_repo.get_by_email(&input.email).await?.is_some() {
            return Err(UserServiceError::UserExists(
                "A user with that email already exists.".to_string(),
            ));
        }

        let password_hash = hash_password(&input.password1)?;
        let user = self
            .user_repo
            .create(&User::new(input.username, input.nick, input.email, password_hash))
            .await?;
        tracing::info!(user_id = user.id, username = %user.username, "User registered");

        self.mailer
            .notify(
                &user,
                "Registration",
                &format!(
                    "Hello {}! Your account has been created. Log in and create your profile to activate it.",
                    user.nick
                ),
            )
            .await;

        Ok(user)
    }

    /// Create the account's profile and activate the account.
    pub async fn create_profile(
        &self,
        user_id: i64,
        input: CreateProfileInput,
    ) -> Result<(User, Profile), UserServiceError> {
        let mut user = self.require_user(user_id).await?;
        if user.has_profile() {
            return Err(FieldError::new("profile", "Profile already exists.").into());
        }

        let first_name = validation::validate_person_name("first_name", &input.first_name)?;
        let last_name = validation::validate_person_name("last_name", &input.last_name)?;
        let country = validation::validate_country(&input.country)?;
        validation::validate_birth_date(input.date_birth, self.clock.today())?;

        let profile = self
            .profile_repo
            .create(&Profile {
                id: 0,
                first_name,
                last_name,
                sex: input.sex,
                country,
                date_birth: input.date_birth,
                article_count: 0,
                created_at: self.clock.now(),
            })
            .await?;

        user.profile_id = Some(profile.id);
        user.is_active = true;
        let user = self.user_repo.update(&user).await?;
        tracing::info!(user_id = user.id, "Profile created, account activated");

        Ok((user, profile))
    }

    /// Authenticate and open a session.
    ///
    /// An expired ban is lifted before the ban check, so the first login
    /// after the ban window succeeds.
    pub async fn login(&self, input: LoginInput) -> Result<LoginOutcome, UserServiceError> {
        let invalid =
            || UserServiceError::AuthenticationError("Invalid username or password".to_string());

        let user = self
            .user_repo
            .get_by_username(&input.username)
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(&input.password, &user.password_hash)? {
            return Err(invalid());
        }

        let user = self.bans.check_and_unban(user).await?;
        if let Err(blocked) = authenticate_allowed(&user) {
            tracing::info!(user_id = user.id, "Login refused for banned account");
            return Err(UserServiceError::Banned {
                username: user.username,
                ban_ends_at: blocked.ban_ends_at,
            });
        }

        let session = self.open_session(user.id).await?;
        Ok(LoginOutcome {
            needs_profile: !user.is_active,
            session,
            user,
        })
    }

    async fn open_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let now = self.clock.now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + Duration::days(self.session_expiration_days),
            created_at: now,
        };
        Ok(self.session_repo.create(&session).await?)
    }

    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo.delete(session_id).await?;
        Ok(())
    }

    /// Resolve a session token to its account.
    ///
    /// Returns `Ok(None)` for unknown or expired sessions and `Banned` when
    /// the account is still serving a ban.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let Some(session) = self.session_repo.get_by_id(token).await? else {
            return Ok(None);
        };

        if session.is_expired_at(self.clock.now()) {
            self.session_repo.delete(&session.id).await?;
            return Ok(None);
        }

        let Some(user) = self.user_repo.get_by_id(session.user_id).await? else {
            return Ok(None);
        };

        let user = self.bans.check_and_unban(user).await?;
        if let Err(blocked) = authenticate_allowed(&user) {
            return Err(UserServiceError::Banned {
                username: user.username,
                ban_ends_at: blocked.ban_ends_at,
            });
        }

        Ok(Some(user))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        Ok(self.user_repo.get_by_id(id).await?)
    }

    pub async fn get_profile(&self, user: &User) -> Result<Option<Profile>, UserServiceError> {
        match user.profile_id {
            Some(id) => Ok(self.profile_repo.get_by_id(id).await?),
            None => Ok(None),
        }
    }

    /// Viewer for an optional account, with adulthood as of today
    pub async fn viewer_for(&self, user: Option<&User>) -> Result<Viewer, UserServiceError> {
        match user {
            Some(user) => {
                let profile = self.get_profile(user).await?;
                Ok(Viewer::for_account(user, profile.as_ref(), self.clock.today()))
            }
            None => Ok(Viewer::Anonymous),
        }
    }

    /// Replace the password of the account matching both username and email
    /// with a generated one, mail it, and return it.
    pub async fn reset_password(
        &self,
        input: ResetPasswordInput,
    ) -> Result<String, UserServiceError> {
        let mut user = self
            .user_repo
            .get_by_username(&input.username)
            .await?
            .filter(|user| user.email == input.email)
            .ok_or_else(|| {
                FieldError::new(
                    "email",
                    "The user with the given e-mail address or name does not exist.",
                )
            })?;

        let password = generate_password(GENERATED_PASSWORD_LEN);
        user.password_hash = hash_password(&password)?;
        let user = self.user_repo.update(&user).await?;
        tracing::info!(user_id = user.id, "Password reset");

        self.mailer
            .notify(
                &user,
                "Reset Password",
                &format!(
                    "Your password has been reset. New password: {}. Change it after logging in.",
                    password
                ),
            )
            .await;

        Ok(password)
    }

    pub async fn change_password(
        &self,
        user_id: i64,
        input: ChangePasswordInput,
    ) -> Result<(), UserServiceError> {
        let mut user = self.require_user(user_id).await?;

        if !verify_password(&input.old_password, &user.password_hash)? {
            return Err(FieldError::new(
                "old_password",
                "Old password does not match existing password.",
            )
            .into());
        }
        validation::validate_password_pair(&input.new_password1, &input.new_password2)?;

        user.password_hash = hash_password(&input.new_password1)?;
        let user = self.user_repo.update(&user).await?;

        self.mailer
            .notify(&user, "Change password.", "Your password has been changed.")
            .await;

        Ok(())
    }

    /// Change the account's email; both the new and the old address are told.
    pub async fn change_email(
        &self,
        user_id: i64,
        input: ChangeEmailInput,
    ) -> Result<User, UserServiceError> {
        validation::validate_email_pair(&input.email1, &input.email2)?;
        let mut user = self.require_user(user_id).await?;

        if let Some(existing) = self.user_repo.get_by_email(&input.email1).await? {
            if existing.id != user.id {
                return Err(UserServiceError::UserExists(
                    "A user with that email already exists.".to_string(),
                ));
            }
        }

        let old_email = std::mem::replace(&mut user.email, input.email1);
        let user = self.user_repo.update(&user).await?;

        self.mailer
            .notify_with(
                &user,
                &[old_email],
                "Change email.",
                &format!("The email of account {} has been changed to {}.", user.username, user.email),
            )
            .await;

        Ok(user)
    }

    /// Ban another account. Only superusers may do this; the target's
    /// sessions are revoked.
    pub async fn ban_user(
        &self,
        actor: &User,
        target_id: i64,
        duration: BanDuration,
    ) -> Result<User, UserServiceError> {
        if !actor.is_superuser {
            return Err(UserServiceError::Forbidden(
                "Only superusers can ban accounts".to_string(),
            ));
        }

        let target = self.require_user(target_id).await?;
        let banned = self.bans.ban(target, duration).await?;
        let revoked = self.session_repo.delete_by_user(banned.id).await?;
        tracing::info!(
            actor_id = actor.id,
            user_id = banned.id,
            revoked_sessions = revoked,
            "Ban applied"
        );

        Ok(banned)
    }

    /// Create the configured superuser unless an account with that username
    /// already exists.
    pub async fn ensure_superuser(
        &self,
        config: &SuperuserConfig,
    ) -> Result<User, UserServiceError> {
        if let Some(existing) = self.user_repo.get_by_username(&config.username).await? {
            return Ok(existing);
        }

        validation::validate_username(&config.username)?;
        validation::validate_nick(&config.nick)?;
        validation::validate_email("email", &config.email)?;

        let mut user = User::new(
            config.username.clone(),
            config.nick.clone(),
            config.email.clone(),
            hash_password(&config.password)?,
        );
        user.is_superuser = true;
        user.is_active = true;

        let user = self.user_repo.create(&user).await?;
        tracing::info!(user_id = user.id, username = %user.username, "Superuser created");
        Ok(user)
    }

    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        Ok(self.session_repo.delete_expired(self.clock.now()).await?)
    }

    async fn require_user(&self, id: i64) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| UserServiceError::NotFound(format!("User {}", id)))
    }
}

/// Input for user registration
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub username: String,
    pub nick: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

impl RegisterInput {
    pub fn new(
        username: impl Into<String>,
        nick: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let password = password.into();
        Self {
            username: username.into(),
            nick: nick.into(),
            email: email.into(),
            password1: password.clone(),
            password2: password,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordInput {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordInput {
    pub old_password: String,
    pub new_password1: String,
    pub new_password2: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeEmailInput {
    pub email1: String,
    pub email2: String,
}
