//! Article model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Article entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    /// Author user ID; never changes after creation
    pub author_id: i64,
    pub title: String,
    pub entry: String,
    /// Restricted to adult viewers
    pub for_adult: bool,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub dislike_count: i64,
    /// Publication date
    pub pub_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    pub fn new(
        author_id: i64,
        title: String,
        entry: String,
        for_adult: bool,
        pub_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            author_id,
            title,
            entry,
            for_adult,
            like_count: 0,
            dislike_count: 0,
            pub_date,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating an article
#[derive(Debug, Clone, Deserialize)]
pub struct CreateArticleInput {
    pub title: String,
    pub entry: String,
    #[serde(default)]
    pub for_adult: bool,
}

/// Input for editing an article; only the text is editable
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateArticleInput {
    pub title: String,
    pub entry: String,
}
