//! User repository
//!
//! Database operations for accounts, including the ban fields.

use crate::db::DbPool;
use crate::models::User;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

const USER_COLUMNS: &str = "id, username, nick, email, password_hash, profile_id, is_active, \
     is_superuser, is_banned, ban_ends_at, created_at, updated_at";

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn get_by_nick(&self, nick: &str) -> Result<Option<User>>;

    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Persist every mutable field of the user (last write wins)
    async fn update(&self, user: &User) -> Result<User>;

    async fn count(&self) -> Result<i64>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DbPool,
}

impl SqlxUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DbPool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }

    async fn get_by_column(&self, column: &str, value: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to get user by {}", column))?;

        Ok(row.as_ref().map(row_to_user))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, nick, email, password_hash, profile_id, is_active,
                               is_superuser, is_banned, ban_ends_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.nick)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.profile_id)
        .bind(user.is_active)
        .bind(user.is_superuser)
        .bind(user.is_banned)
        .bind(user.ban_ends_at)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create user")?;

        Ok(User {
            id: result.last_insert_rowid(),
            created_at: now,
            updated_at: now,
            ..user.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get user by ID")?;

        Ok(row.as_ref().map(row_to_user))
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        self.get_by_column("username", username).await
    }

    async fn get_by_nick(&self, nick: &str) -> Result<Option<User>> {
        self.get_by_column("nick", nick).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        self.get_by_column("email", email).await
    }

    async fn update(&self, user: &User) -> Result<User> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = ?, nick = ?, email = ?, password_hash = ?, profile_id = ?,
                is_active = ?, is_superuser = ?, is_banned = ?, ban_ends_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.username)
        .bind(&user.nick)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.profile_id)
        .bind(user.is_active)
        .bind(user.is_superuser)
        .bind(user.is_banned)
        .bind(user.ban_ends_at)
        .bind(now)
        .bind(user.id)
        .execute(&self.pool)
        .await
        .context("Failed to update user")?;

        if result.rows_affected() == 0 {
            anyhow::bail!("User not found: {}", user.id);
        }

        Ok(User {
            updated_at: now,
            ..user.clone()
        })
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count users")?;

        Ok(count)
    }
}

fn row_to_user(row: &SqliteRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        nick: row.get("nick"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        profile_id: row.get("profile_id"),
        is_active: row.get("is_active"),
        is_superuser: row.get("is_superuser"),
        is_banned: row.get("is_banned"),
        ban_ends_at: row.get("ban_ends_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
