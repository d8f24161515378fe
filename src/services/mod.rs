//! Services layer - Business logic
//!
//! This module contains all business logic services for the blog.
//! Services are responsible for:
//! - Implementing business rules
//! - Coordinating between repositories, the clock and the mailer
//! - Handling validation and error cases

pub mod article;
pub mod authorization;
pub mod ban;
pub mod clock;
pub mod comment;
pub mod email;
pub mod password;
pub mod user;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use article::{ArticleService, ArticleServiceError};
pub use authorization::Viewer;
pub use ban::{BanError, BanManager};
pub use clock::{Clock, SystemClock};
pub use comment::{CommentService, CommentServiceError};
pub use email::{notifier_from_config, AccountMailer, Notifier};
pub use password::{hash_password, verify_password};
pub use user::{LoginInput, LoginOutcome, RegisterInput, UserService, UserServiceError};
pub use validation::FieldError;
