//! Shared fixture for service and API tests

use chrono::{NaiveDate, TimeZone, Utc};
use std::sync::Arc;

use crate::db::repositories::{
    SqlxArticleRepository, SqlxCommentRepository, SqlxProfileRepository, SqlxSessionRepository,
    SqlxUserRepository, UserRepository,
};
use crate::db::{create_test_pool, migrations, DbPool};
use crate::models::{CreateProfileInput, Sex, User};
use crate::services::ban::BanManager;
use crate::services::clock::ManualClock;
use crate::services::email::testing::RecordingNotifier;
use crate::services::email::AccountMailer;
use crate::services::user::RegisterInput;
use crate::services::{ArticleService, CommentService, UserService};

pub const TEST_PASSWORD: &str = "password123";
pub const TEST_FROM: &str = "blog@example.com";

pub struct TestContext {
    pub pool: DbPool,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub user_repo: Arc<dyn UserRepository>,
    pub users: Arc<UserService>,
    pub articles: Arc<ArticleService>,
    pub comments: Arc<CommentService>,
}

impl TestContext {
    /// Fresh in-memory database; the clock starts at 2024-05-01 12:00 UTC.
    pub async fn new() -> Self {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        ));
        let notifier = Arc::new(RecordingNotifier::default());
        let mailer = AccountMailer::new(notifier.clone(), TEST_FROM);

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let profile_repo = SqlxProfileRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());

        let bans = Arc::new(BanManager::new(
            user_repo.clone(),
            mailer.clone(),
            clock.clone(),
        ));
        let users = Arc::new(UserService::new(
            user_repo.clone(),
            profile_repo.clone(),
            session_repo,
            bans,
            mailer,
            clock.clone(),
        ));
        let articles = Arc::new(ArticleService::new(
            SqlxArticleRepository::boxed(pool.clone()),
            user_repo.clone(),
            profile_repo,
            clock.clone(),
        ));
        let comments = Arc::new(CommentService::new(
            SqlxCommentRepository::boxed(pool.clone()),
            articles.clone(),
            clock.clone(),
        ));

        Self {
            pool,
            clock,
            notifier,
            user_repo,
            users,
            articles,
            comments,
        }
    }

    /// Register an account without a profile. `name` must be alphanumeric
    /// and at most 16 characters.
    pub async fn register(&self, name: &str) -> User {
        self.users
            .register(RegisterInput::new(
                name,
                format!("{}Nick", name),
                format!("{}@example.com", name),
                TEST_PASSWORD,
            ))
            .await
            .expect("Failed to register test user")
    }

    /// Register an account and, given a birth date, activate it with a profile.
    pub async fn member(&self, name: &str, birth: Option<(i32, u32, u32)>) -> User {
        let user = self.register(name).await;
        let Some((y, m, d)) = birth else {
            return user;
        };

        let (user, _) = self
            .users
            .create_profile(
                user.id,
                CreateProfileInput {
                    first_name: "Test".to_string(),
                    last_name: "Member".to_string(),
                    sex: Sex::Female,
                    country: "PL".to_string(),
                    date_birth: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
                },
            )
            .await
            .expect("Failed to create test profile");
        user
    }

    /// An active superuser without a profile.
    pub async fn superuser(&self, name: &str) -> User {
        let mut user = self.register(name).await;
        user.is_superuser = true;
        user.is_active = true;
        self.user_repo.update(&user).await.unwrap()
    }
}
