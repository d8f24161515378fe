//! Comment model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Comment entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    /// Parent article; `None` once detached
    pub article_id: Option<i64>,
    pub owner_id: i64,
    pub content: String,
    pub pub_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(article_id: i64, owner_id: i64, content: String, pub_date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            article_id: Some(article_id),
            owner_id,
            content,
            pub_date,
            created_at: now,
            updated_at: now,
        }
    }
}

/// What the current viewer may do with a comment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommentPermissions {
    pub can_edit: bool,
    pub can_delete: bool,
}

/// Comment plus the viewer's permissions on it
#[derive(Debug, Clone, Serialize)]
pub struct CommentWithPermissions {
    #[serde(flatten)]
    pub comment: Comment,
    pub permissions: CommentPermissions,
}
