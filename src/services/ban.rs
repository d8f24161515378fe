//! Ban lifecycle
//!
//! Bans expire lazily: there is no timer. Every time an account is touched
//! for authentication, [`BanManager::check_and_unban`] runs first and lifts
//! an expired ban, then [`authenticate_allowed`] rejects accounts that are
//! still banned.
//!
//! State is persisted before any notification is attempted, and a failed
//! notification never undoes it.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::db::repositories::UserRepository;
use crate::models::{BanDuration, User};
use crate::services::clock::Clock;
use crate::services::email::AccountMailer;

#[derive(Debug, thiserror::Error)]
pub enum BanError {
    #[error("Superuser accounts cannot be banned")]
    ForbiddenOperation,

    #[error("Ban duration is too long")]
    InvalidDuration,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Authentication refused because the account is banned
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Account is banned")]
pub struct Blocked {
    pub ban_ends_at: Option<DateTime<Utc>>,
}

/// Refuse banned accounts. Call after [`BanManager::check_and_unban`].
pub fn authenticate_allowed(user: &User) -> Result<(), Blocked> {
    if user.is_banned {
        return Err(Blocked {
            ban_ends_at: user.ban_ends_at,
        });
    }
    Ok(())
}

pub struct BanManager {
    user_repo: Arc<dyn UserRepository>,
    mailer: AccountMailer,
    clock: Arc<dyn Clock>,
}

impl BanManager {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        mailer: AccountMailer,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            user_repo,
            mailer,
            clock,
        }
    }

    /// Lift the ban if its end lies strictly in the past; otherwise return
    /// the account unchanged. Safe to call any number of times.
    pub async fn check_and_unban(&self, mut user: User) -> Result<User, BanError> {
        if !user.ban_expired_at(self.clock.now()) {
            return Ok(user);
        }

        user.lift_ban();
        let user = self.user_repo.update(&user).await?;
        tracing::info!(user_id = user.id, "Ban expired, account unbanned");

        self.mailer
            .notify(&user, "Unban", "Your account has been unbanned.")
            .await;

        Ok(user)
    }

    /// Ban `user` until now + `duration`. A zero duration is not special:
    /// the ban ends at the current instant.
    pub async fn ban(&self, mut user: User, duration: BanDuration) -> Result<User, BanError> {
        if user.is_superuser {
            return Err(BanError::ForbiddenOperation);
        }

        let until = self
            .clock
            .now()
            .checked_add_signed(duration.to_duration())
            .ok_or(BanError::InvalidDuration)?;
        user.apply_ban(until);
        let user = self.user_repo.update(&user).await?;
        tracing::info!(user_id = user.id, ban_ends_at = %until, "Account banned");

        self.mailer
            .notify(
                &user,
                "Ban account",
                &format!("Your account has been banned until {}.", until),
            )
            .await;

        Ok(user)
    }
}
