//! User model
//!
//! Accounts start inactive and become active once a profile is attached.
//! Ban state is the pair (`is_banned`, `ban_ends_at`); the two fields are
//! only changed together through [`User::apply_ban`] and [`User::lift_ban`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A registered account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Login name (unique)
    pub username: String,
    /// Public display name (unique)
    pub nick: String,
    /// Email address (unique)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Linked profile, set when profile creation completes
    pub profile_id: Option<i64>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub is_banned: bool,
    /// End of the ban window; `Some` exactly when `is_banned`
    pub ban_ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new inactive, unbanned, regular account.
    ///
    /// The password must already be hashed.
    pub fn new(username: String, nick: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            username,
            nick,
            email,
            password_hash,
            profile_id: None,
            is_active: false,
            is_superuser: false,
            is_banned: false,
            ban_ends_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the account banned until `until`
    pub fn apply_ban(&mut self, until: DateTime<Utc>) {
        self.is_banned = true;
        self.ban_ends_at = Some(until);
    }

    /// Clear both ban fields
    pub fn lift_ban(&mut self) {
        self.is_banned = false;
        self.ban_ends_at = None;
    }

    /// True when a ban end is recorded and lies strictly before `now`
    pub fn ban_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.ban_ends_at, Some(end) if end < now)
    }

    pub fn has_profile(&self) -> bool {
        self.profile_id.is_some()
    }
}

/// Length of a ban, as the sum of its parts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanDuration {
    #[serde(default)]
    pub minutes: u32,
    #[serde(default)]
    pub hours: u32,
    #[serde(default)]
    pub days: u32,
    #[serde(default)]
    pub weeks: u32,
}

impl BanDuration {
    pub fn minutes(minutes: u32) -> Self {
        Self {
            minutes,
            ..Self::default()
        }
    }

    pub fn days(days: u32) -> Self {
        Self {
            days,
            ..Self::default()
        }
    }

    pub fn to_duration(&self) -> Duration {
        Duration::minutes(i64::from(self.minutes))
            + Duration::hours(i64::from(self.hours))
            + Duration::days(i64::from(self.days))
            + Duration::weeks(i64::from(self.weeks))
    }
}
