//! Article repository
//!
//! Articles are always returned newest first: by publication date, then by
//! id for articles published the same day.

use crate::db::DbPool;
use crate::models::Article;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

const ARTICLE_COLUMNS: &str = "id, author_id, title, entry, for_adult, like_count, dislike_count, \
     pub_date, created_at, updated_at";

/// Article repository trait
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    async fn create(&self, article: &Article) -> Result<Article>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>>;

    /// All articles, newest first
    async fn list(&self) -> Result<Vec<Article>>;

    /// Replace title and entry; `None` when the article does not exist
    async fn update_text(&self, id: i64, title: &str, entry: &str) -> Result<Option<Article>>;

    /// Delete an article together with its comments
    async fn delete(&self, id: i64) -> Result<bool>;

    async fn count(&self) -> Result<i64>;
}

/// SQLx-based article repository implementation
pub struct SqlxArticleRepository {
    pool: DbPool,
}

impl SqlxArticleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn ArticleRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ArticleRepository for SqlxArticleRepository {
    async fn create(&self, article: &Article) -> Result<Article> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO articles (author_id, title, entry, for_adult, like_count, dislike_count,
                                  pub_date, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(article.author_id)
        .bind(&article.title)
        .bind(&article.entry)
        .bind(article.for_adult)
        .bind(article.like_count)
        .bind(article.dislike_count)
        .bind(article.pub_date)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create article")?;

        Ok(Article {
            id: result.last_insert_rowid(),
            created_at: now,
            updated_at: now,
            ..article.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>> {
        let sql = format!("SELECT {} FROM articles WHERE id = ?", ARTICLE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get article by ID")?;

        Ok(row.as_ref().map(row_to_article))
    }

    async fn list(&self) -> Result<Vec<Article>> {
        let sql = format!(
            "SELECT {} FROM articles ORDER BY pub_date DESC, id DESC",
            ARTICLE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list articles")?;

        Ok(rows.iter().map(row_to_article).collect())
    }

    async fn update_text(&self, id: i64, title: &str, entry: &str) -> Result<Option<Article>> {
        let result = sqlx::query(
            "UPDATE articles SET title = ?, entry = ?, updated_at = ? WHERE id = ?",
        )
        .bind(title)
        .bind(entry)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to update article")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete article")?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count articles")?;

        Ok(count)
    }
}

fn row_to_article(row: &SqliteRow) -> Article {
    Article {
        id: row.get("id"),
        author_id: row.get("author_id"),
        title: row.get("title"),
        entry: row.get("entry"),
        for_adult: row.get("for_adult"),
        like_count: row.get("like_count"),
        dislike_count: row.get("dislike_count"),
        pub_date: row.get("pub_date"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::User;
    use chrono::NaiveDate;

    async fn setup() -> (SqlxArticleRepository, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.unwrap();
        let author = SqlxUserRepository::new(pool.clone())
            .create(&User::new(
                "author".into(),
                "authornick".into(),
                "author@example.com".into(),
                "hash".into(),
            ))
            .await
            .unwrap();
        (SqlxArticleRepository::new(pool), author.id)
    }

    fn article(author_id: i64, title: &str, date: (i32, u32, u32)) -> Article {
        Article::new(
            author_id,
            title.to_string(),
            "e".repeat(200),
            false,
            NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let (repo, author) = setup().await;
        repo.create(&article(author, "Oldest title", (2023, 1, 1))).await.unwrap();
        repo.create(&article(author, "Newest title", (2024, 6, 1))).await.unwrap();
        repo.create(&article(author, "Middle title A", (2024, 1, 1))).await.unwrap();
        repo.create(&article(author, "Middle title B", (2024, 1, 1))).await.unwrap();

        let titles: Vec<String> = repo.list().await.unwrap().into_iter().map(|a| a.title).collect();

        assert_eq!(
            titles,
            vec!["Newest title", "Middle title B", "Middle title A", "Oldest title"]
        );
    }

    #[tokio::test]
    async fn test_update_text_and_delete() {
        let (repo, author) = setup().await;
        let created = repo.create(&article(author, "Original title", (2024, 2, 2))).await.unwrap();

        let updated = repo
            .update_text(created.id, "Changed title", &"x".repeat(210))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "Changed title");
        assert_eq!(updated.author_id, author);

        assert!(repo.update_text(999, "t", "e").await.unwrap().is_none());

        assert!(repo.delete(created.id).await.unwrap());
        assert!(!repo.delete(created.id).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
