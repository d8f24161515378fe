//! Content visibility and ownership rules
//!
//! Pure functions: nothing here touches storage or the clock. Callers pass
//! in today's date and the acting account.
//!
//! - Adult-flagged articles are visible only to authenticated adults.
//! - Articles and comments may be edited or deleted by their owner or by a
//!   superuser.
//! - The owner of an article may additionally delete any comment on it.

use chrono::{Months, NaiveDate};

use crate::models::{Article, Comment, CommentPermissions, Profile, User};

/// Anything with an immutable owning account
pub trait OwnedContent {
    fn owner_account_id(&self) -> i64;
}

impl OwnedContent for Article {
    fn owner_account_id(&self) -> i64 {
        self.author_id
    }
}

impl OwnedContent for Comment {
    fn owner_account_id(&self) -> i64 {
        self.owner_id
    }
}

/// The requester, with adulthood already decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    Authenticated {
        account_id: i64,
        is_superuser: bool,
        is_adult: bool,
    },
}

impl Viewer {
    /// Build a viewer for an account. Without a profile there is no birth
    /// date, so the account is treated as a minor.
    pub fn for_account(user: &User, profile: Option<&Profile>, today: NaiveDate) -> Self {
        Viewer::Authenticated {
            account_id: user.id,
            is_superuser: user.is_superuser,
            is_adult: profile
                .map(|p| compute_is_adult(p.date_birth, today))
                .unwrap_or(false),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Viewer::Authenticated { .. })
    }

    pub fn is_adult(&self) -> bool {
        matches!(self, Viewer::Authenticated { is_adult: true, .. })
    }
}

/// Eighteenth birthday reached on or before `today`.
///
/// The anniversary is built as (year + 18, month, day). For a Feb 29 birth
/// date in a non-leap target year it falls on Feb 28.
pub fn compute_is_adult(birth_date: NaiveDate, today: NaiveDate) -> bool {
    match birth_date.checked_add_months(Months::new(18 * 12)) {
        Some(anniversary) => anniversary <= today,
        None => false,
    }
}

pub fn is_adult_content_visible(article: &Article, viewer: &Viewer) -> bool {
    !article.for_adult || viewer.is_adult()
}

pub fn can_edit_or_delete(item: &impl OwnedContent, actor: &User) -> bool {
    item.owner_account_id() == actor.id || actor.is_superuser
}

/// Keep the articles `viewer` may see, in their original order
pub fn filter_visible(articles: Vec<Article>, viewer: &Viewer) -> Vec<Article> {
    articles
        .into_iter()
        .filter(|article| is_adult_content_visible(article, viewer))
        .collect()
}

/// Edit follows ownership. Delete is also granted to whoever controls the
/// parent article.
pub fn comment_permissions(
    comment: &Comment,
    article: Option<&Article>,
    actor: &User,
) -> CommentPermissions {
    let can_edit = can_edit_or_delete(comment, actor);
    let moderates_article = article.is_some_and(|a| can_edit_or_delete(a, actor));
    CommentPermissions {
        can_edit,
        can_delete: can_edit || moderates_article,
    }
}
