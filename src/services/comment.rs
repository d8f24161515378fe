//! Comment service

use std::sync::Arc;

use crate::db::repositories::CommentRepository;
use crate::models::{Comment, CommentPermissions, CommentWithPermissions, User};
use crate::services::article::{ArticleService, ArticleServiceError};
use crate::services::authorization::{can_edit_or_delete, comment_permissions, Viewer};
use crate::services::clock::Clock;
use crate::services::validation::{self, FieldError};

#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    #[error("Comment not found: {0}")]
    NotFound(i64),

    #[error("Article not found: {0}")]
    ArticleNotFound(i64),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(#[from] FieldError),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<ArticleServiceError> for CommentServiceError {
    fn from(err: ArticleServiceError) -> Self {
        match err {
            ArticleServiceError::NotFound(id) => Self::ArticleNotFound(id),
            ArticleServiceError::Forbidden(msg) => Self::Forbidden(msg),
            ArticleServiceError::ValidationError(e) => Self::ValidationError(e),
            ArticleServiceError::InternalError(e) => Self::InternalError(e),
        }
    }
}

/// Comment service
pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    articles: Arc<ArticleService>,
    clock: Arc<dyn Clock>,
}

impl CommentService {
    pub fn new(
        repo: Arc<dyn CommentRepository>,
        articles: Arc<ArticleService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            articles,
            clock,
        }
    }

    /// Comment on an article the actor can see.
    pub async fn create(
        &self,
        article_id: i64,
        actor: &User,
        viewer: &Viewer,
        content: String,
    ) -> Result<Comment, CommentServiceError> {
        if !actor.is_active {
            return Err(CommentServiceError::Forbidden(
                "Create your profile before commenting".to_string(),
            ));
        }

        let article = self.articles.get_visible(article_id, viewer).await?;
        validation::validate_comment_content(&content)?;

        let comment = Comment::new(article.id, actor.id, content, self.clock.today());
        let comment = self.repo.create(&comment).await?;
        tracing::debug!(comment_id = comment.id, article_id, "Comment created");

        Ok(comment)
    }

    /// Comments under an article, newest first, each with what `actor` may do to it
    pub async fn list_for_article(
        &self,
        article_id: i64,
        viewer: &Viewer,
        actor: Option<&User>,
    ) -> Result<Vec<CommentWithPermissions>, CommentServiceError> {
        let article = self.articles.get_visible(article_id, viewer).await?;
        let comments = self.repo.list_by_article(article.id).await?;

        Ok(comments
            .into_iter()
            .map(|comment| {
                let permissions = actor
                    .map(|actor| comment_permissions(&comment, Some(&article), actor))
                    .unwrap_or_default();
                CommentWithPermissions {
                    comment,
                    permissions,
                }
            })
            .collect())
    }

    pub async fn get(&self, id: i64) -> Result<Comment, CommentServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or(CommentServiceError::NotFound(id))
    }

    /// Only the comment's owner or a superuser may edit it.
    pub async fn update(
        &self,
        id: i64,
        actor: &User,
        content: String,
    ) -> Result<Comment, CommentServiceError> {
        let comment = self.get(id).await?;
        if !can_edit_or_delete(&comment, actor) {
            return Err(CommentServiceError::Forbidden(
                "Only the author can edit this comment".to_string(),
            ));
        }

        validation::validate_comment_content(&content)?;

        self.repo
            .update_content(id, &content)
            .await?
            .ok_or(CommentServiceError::NotFound(id))
    }

    /// The owner, a superuser, or whoever controls the parent article may delete.
    pub async fn delete(&self, id: i64, actor: &User) -> Result<(), CommentServiceError> {
        let comment = self.get(id).await?;
        let article = match comment.article_id {
            Some(article_id) => match self.articles.get(article_id).await {
                Ok(article) => Some(article),
                Err(ArticleServiceError::NotFound(_)) => None,
                Err(e) => return Err(e.into()),
            },
            None => None,
        };

        let CommentPermissions { can_delete, .. } =
            comment_permissions(&comment, article.as_ref(), actor);
        if !can_delete {
            return Err(CommentServiceError::Forbidden(
                "You cannot delete this comment".to_string(),
            ));
        }

        if !self.repo.delete(id).await? {
            return Err(CommentServiceError::NotFound(id));
        }
        tracing::info!(comment_id = id, actor_id = actor.id, "Comment deleted");
        Ok(())
    }
}
