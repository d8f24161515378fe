//! Article service
//!
//! Publishing, reading and editing articles:
//! - only active accounts (those with a profile) may publish
//! - an author who is not an adult cannot flag an article as adult-only
//! - adult-only articles are hidden from anonymous viewers and minors
//! - edits and deletes are limited to the author and superusers
//! - the author's profile keeps a running article count

use crate::db::repositories::{ArticleRepository, ProfileRepository, UserRepository};
use crate::models::{Article, CreateArticleInput, UpdateArticleInput, User};
use crate::services::authorization::{
    can_edit_or_delete, compute_is_adult, filter_visible, is_adult_content_visible, Viewer,
};
use crate::services::clock::Clock;
use crate::services::validation::{self, FieldError};
use std::sync::Arc;

/// Error types for article service operations
#[derive(Debug, thiserror::Error)]
pub enum ArticleServiceError {
    /// Missing, or hidden from the viewer
    #[error("Article not found: {0}")]
    NotFound(i64),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(#[from] FieldError),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct ArticleService {
    repo: Arc<dyn ArticleRepository>,
    user_repo: Arc<dyn UserRepository>,
    profile_repo: Arc<dyn ProfileRepository>,
    clock: Arc<dyn Clock>,
}

impl ArticleService {
    pub fn new(
        repo: Arc<dyn ArticleRepository>,
        user_repo: Arc<dyn UserRepository>,
        profile_repo: Arc<dyn ProfileRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            user_repo,
            profile_repo,
            clock,
        }
    }

    /// Publish an article dated today.
    ///
    /// The adult flag is silently dropped when the author is not an adult.
    pub async fn create(
        &self,
        author: &User,
        input: CreateArticleInput,
    ) -> Result<Article, ArticleServiceError> {
        if !author.is_active {
            return Err(ArticleServiceError::Forbidden(
                "Create your profile before publishing articles".to_string(),
            ));
        }

        validation::validate_article_title(&input.title)?;
        validation::validate_article_entry(&input.entry)?;

        let profile = match author.profile_id {
            Some(id) => self.profile_repo.get_by_id(id).await?,
            None => None,
        };
        let today = self.clock.today();
        let author_is_adult = profile
            .as_ref()
            .map(|p| compute_is_adult(p.date_birth, today))
            .unwrap_or(false);

        let article = Article::new(
            author.id,
            input.title,
            input.entry,
            input.for_adult && author_is_adult,
            today,
        );
        let article = self.repo.create(&article).await?;

        if let Some(profile) = profile {
            self.profile_repo.adjust_article_count(profile.id, 1).await?;
        }
        tracing::info!(article_id = article.id, author_id = author.id, "Article published");

        Ok(article)
    }

    /// All articles the viewer may see, newest first
    pub async fn list_visible(&self, viewer: &Viewer) -> Result<Vec<Article>, ArticleServiceError> {
        let articles = self.repo.list().await?;
        Ok(filter_visible(articles, viewer))
    }

    /// One article; `NotFound` also when it is hidden from the viewer.
    pub async fn get_visible(
        &self,
        id: i64,
        viewer: &Viewer,
    ) -> Result<Article, ArticleServiceError> {
        let article = self.get(id).await?;
        if !is_adult_content_visible(&article, viewer) {
            return Err(ArticleServiceError::NotFound(id));
        }
        Ok(article)
    }

    /// One article regardless of visibility
    pub async fn get(&self, id: i64) -> Result<Article, ArticleServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or(ArticleServiceError::NotFound(id))
    }

    pub async fn update(
        &self,
        id: i64,
        actor: &User,
        input: UpdateArticleInput,
    ) -> Result<Article, ArticleServiceError> {
        let article = self.get(id).await?;
        if !can_edit_or_delete(&article, actor) {
            return Err(ArticleServiceError::Forbidden(
                "Only the author can edit this article".to_string(),
            ));
        }

        validation::validate_article_title(&input.title)?;
        validation::validate_article_entry(&input.entry)?;

        self.repo
            .update_text(id, &input.title, &input.entry)
            .await?
            .ok_or(ArticleServiceError::NotFound(id))
    }

    /// Delete an article and, through the foreign key, its comments.
    pub async fn delete(&self, id: i64, actor: &User) -> Result<(), ArticleServiceError> {
        let article = self.get(id).await?;
        if !can_edit_or_delete(&article, actor) {
            return Err(ArticleServiceError::Forbidden(
                "Only the author can delete this article".to_string(),
            ));
        }

        if !self.repo.delete(id).await? {
            return Err(ArticleServiceError::NotFound(id));
        }

        let author = self.user_repo.get_by_id(article.author_id).await?;
        if let Some(profile_id) = author.and_then(|a| a.profile_id) {
            self.profile_repo.adjust_article_count(profile_id, -1).await?;
        }
        tracing::info!(article_id = id, actor_id = actor.id, "Article deleted");

        Ok(())
    }

    pub async fn count(&self) -> Result<i64, ArticleServiceError> {
        Ok(self.repo.count().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::TestContext;

    fn input(title: &str, for_adult: bool) -> CreateArticleInput {
        CreateArticleInput {
            title: title.to_string(),
            entry: "x".repeat(250),
            for_adult,
        }
    }

    #[tokio::test]
    async fn test_create_requires_active_account() {
        let ctx = TestContext::new().await;
        let inactive = ctx.register("fresh").await;

        let result = ctx.articles.create(&inactive, input("A fine title", false)).await;

        assert!(matches!(result, Err(ArticleServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_create_sets_today_and_counts() {
        let ctx = TestContext::new().await;
        let author = ctx.member("writer", Some((1990, 1, 1))).await;

        let article = ctx
            .articles
            .create(&author, input("A fine title", true))
            .await
            .unwrap();

        assert_eq!(article.pub_date, ctx.clock.today());
        assert!(article.for_adult);
        let profile = ctx.users.get_profile(&author).await.unwrap().unwrap();
        assert_eq!(profile.article_count, 1);
    }

    #[tokio::test]
    async fn test_minor_cannot_flag_adult() {
        let ctx = TestContext::new().await;
        let author = ctx.member("teen", Some((2010, 1, 1))).await;

        let article = ctx
            .articles
            .create(&author, input("A fine title", true))
            .await
            .unwrap();

        assert!(!article.for_adult);
    }

    #[tokio::test]
    async fn test_create_validates_text() {
        let ctx = TestContext::new().await;
        let author = ctx.member("writer", Some((1990, 1, 1))).await;

        let short = ctx.articles.create(&author, input("short", false)).await;
        assert!(matches!(short, Err(ArticleServiceError::ValidationError(e)) if e.field == "title"));

        let mut thin = input("A fine title", false);
        thin.entry = "too thin".to_string();
        let thin = ctx.articles.create(&author, thin).await;
        assert!(matches!(thin, Err(ArticleServiceError::ValidationError(e)) if e.field == "entry"));
    }

    #[tokio::test]
    async fn test_adult_articles_hidden_from_minors_and_anonymous() {
        let ctx = TestContext::new().await;
        let author = ctx.member("writer", Some((1990, 1, 1))).await;
        let minor = ctx.member("teen", Some((2010, 1, 1))).await;
        let plain = ctx
            .articles
            .create(&author, input("Plain article", false))
            .await
            .unwrap();
        let adult = ctx
            .articles
            .create(&author, input("Adult article", true))
            .await
            .unwrap();

        let author_view = ctx.users.viewer_for(Some(&author)).await.unwrap();
        let minor_view = ctx.users.viewer_for(Some(&minor)).await.unwrap();

        let all: Vec<i64> = ctx
            .articles
            .list_visible(&author_view)
            .await
            .unwrap()
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(all, vec![adult.id, plain.id]);

        for viewer in [minor_view, Viewer::Anonymous] {
            let ids: Vec<i64> = ctx
                .articles
                .list_visible(&viewer)
                .await
                .unwrap()
                .iter()
                .map(|a| a.id)
                .collect();
            assert_eq!(ids, vec![plain.id]);
            assert!(matches!(
                ctx.articles.get_visible(adult.id, &viewer).await,
                Err(ArticleServiceError::NotFound(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_update_and_delete_permissions() {
        let ctx = TestContext::new().await;
        let author = ctx.member("writer", Some((1990, 1, 1))).await;
        let stranger = ctx.member("stranger", Some((1990, 1, 1))).await;
        let admin = ctx.superuser("root").await;
        let article = ctx
            .articles
            .create(&author, input("A fine title", false))
            .await
            .unwrap();
        let edit = UpdateArticleInput {
            title: "A better title".to_string(),
            entry: "y".repeat(300),
        };

        let denied = ctx.articles.update(article.id, &stranger, edit.clone()).await;
        assert!(matches!(denied, Err(ArticleServiceError::Forbidden(_))));

        let updated = ctx.articles.update(article.id, &admin, edit).await.unwrap();
        assert_eq!(updated.title, "A better title");
        assert_eq!(updated.author_id, author.id);

        let denied = ctx.articles.delete(article.id, &stranger).await;
        assert!(matches!(denied, Err(ArticleServiceError::Forbidden(_))));

        ctx.articles.delete(article.id, &author).await.unwrap();
        assert!(matches!(
            ctx.articles.get(article.id).await,
            Err(ArticleServiceError::NotFound(_))
        ));
        let profile = ctx.users.get_profile(&author).await.unwrap().unwrap();
        assert_eq!(profile.article_count, 0);
    }
}
