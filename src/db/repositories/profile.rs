//! Profile repository

use crate::db::DbPool;
use crate::models::{Profile, Sex};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::str::FromStr;
use std::sync::Arc;

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn create(&self, profile: &Profile) -> Result<Profile>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Profile>>;

    /// Add `delta` to the article counter, never going below zero
    async fn adjust_article_count(&self, id: i64, delta: i64) -> Result<()>;
}

pub struct SqlxProfileRepository {
    pool: DbPool,
}

impl SqlxProfileRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn ProfileRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ProfileRepository for SqlxProfileRepository {
    async fn create(&self, profile: &Profile) -> Result<Profile> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO profiles (first_name, last_name, sex, country, date_birth, article_count, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(profile.sex.to_string())
        .bind(&profile.country)
        .bind(profile.date_birth)
        .bind(profile.article_count)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create profile")?;

        Ok(Profile {
            id: result.last_insert_rowid(),
            created_at: now,
            ..profile.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Profile>> {
        let row = sqlx::query(
            r#"
            SELECT id, first_name, last_name, sex, country, date_birth, article_count, created_at
            FROM profiles
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get profile")?;

        row.as_ref().map(row_to_profile).transpose()
    }

    async fn adjust_article_count(&self, id: i64, delta: i64) -> Result<()> {
        sqlx::query("UPDATE profiles SET article_count = MAX(article_count + ?, 0) WHERE id = ?")
            .bind(delta)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update article count")?;

        Ok(())
    }
}

fn row_to_profile(row: &SqliteRow) -> Result<Profile> {
    let sex_str: String = row.get("sex");
    let sex = Sex::from_str(&sex_str)
        .with_context(|| format!("Invalid sex in database: {}", sex_str))?;

    Ok(Profile {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        sex,
        country: row.get("country"),
        date_birth: row.get("date_birth"),
        article_count: row.get("article_count"),
        created_at: row.get("created_at"),
    })
}
