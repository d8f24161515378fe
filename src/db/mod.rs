//! Database layer
//!
//! SQLite through sqlx. Schema changes live in [`migrations`]; every table
//! is reached through a repository trait in [`repositories`].
//!
//! ```ignore
//! use mainblog::config::DatabaseConfig;
//! use mainblog::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, ping, DbPool};
