//! Data models
//!
//! Database entities and the input types the services accept.

mod article;
mod comment;
mod profile;
mod session;
mod user;

pub use article::{Article, CreateArticleInput, UpdateArticleInput};
pub use comment::{Comment, CommentPermissions, CommentWithPermissions};
pub use profile::{CreateProfileInput, Profile, Sex};
pub use session::Session;
pub use user::{BanDuration, User};
