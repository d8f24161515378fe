//! Mainblog - A small multi-author blog with moderated accounts

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mainblog::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{
            SqlxArticleRepository, SqlxCommentRepository, SqlxProfileRepository,
            SqlxSessionRepository, SqlxUserRepository,
        },
    },
    services::{
        article::ArticleService,
        ban::BanManager,
        clock::{Clock, SystemClock},
        comment::CommentService,
        email::{notifier_from_config, AccountMailer},
        user::UserService,
    },
};

/// Interval between expired-session sweeps
const SESSION_CLEANUP_INTERVAL_SECS: u64 = 3600;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mainblog=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting mainblog...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {}", config.database.url);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Outgoing mail
    let notifier = notifier_from_config(&config.email)?;
    let mailer =
        AccountMailer::new(notifier, config.email.from_address.clone()).in_background();
    if !config.email.enabled {
        tracing::info!("Email delivery disabled, notifications will be logged");
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Create repositories
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let profile_repo = SqlxProfileRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());
    let article_repo = SqlxArticleRepository::boxed(pool.clone());
    let comment_repo = SqlxCommentRepository::boxed(pool.clone());

    // Initialize services
    let bans = Arc::new(BanManager::new(
        user_repo.clone(),
        mailer.clone(),
        clock.clone(),
    ));
    let user_service = Arc::new(
        UserService::new(
            user_repo.clone(),
            profile_repo.clone(),
            session_repo,
            bans,
            mailer,
            clock.clone(),
        )
        .with_session_expiration(config.auth.session_expiration_days),
    );
    let article_service = Arc::new(ArticleService::new(
        article_repo,
        user_repo,
        profile_repo,
        clock.clone(),
    ));
    let comment_service = Arc::new(CommentService::new(
        comment_repo,
        article_service.clone(),
        clock,
    ));

    // Bootstrap the configured superuser
    if let Some(superuser) = &config.auth.superuser {
        let admin = user_service.ensure_superuser(superuser).await?;
        tracing::info!("Superuser ready: {}", admin.username);
    }

    // Start expired-session cleanup task
    {
        let users = user_service.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(
                SESSION_CLEANUP_INTERVAL_SECS,
            ));
            loop {
                interval.tick().await;
                match users.cleanup_expired_sessions().await {
                    Ok(0) => {}
                    Ok(removed) => tracing::info!("Removed {} expired sessions", removed),
                    Err(e) => tracing::warn!("Session cleanup failed: {}", e),
                }
            }
        });
    }

    // Build application state
    let state = AppState {
        pool: pool.clone(),
        user_service,
        article_service,
        comment_service,
        session_max_age_secs: config.auth.session_expiration_days * 24 * 60 * 60,
    };

    // Build router
    let app = api::build_router(state, &config.server.cors_origin)?;

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
