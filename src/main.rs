//! Roomsense - environmental monitoring backend

use anyhow::{bail, Result};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roomsense::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{SqlxReadingRepository, SqlxRoomRepository, SqlxUserRepository},
    },
    services::{AlertService, AuthService, IngestService, SmtpNotifier},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roomsense=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting roomsense monitoring backend...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    if config.auth.token_secret.is_empty() {
        bail!("auth.token_secret is not set; configure it in config.yml or ROOMSENSE_TOKEN_SECRET");
    }

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Create repositories
    let room_repo = SqlxRoomRepository::boxed(pool.clone());
    let reading_repo = SqlxReadingRepository::boxed(pool.clone());
    let user_repo = SqlxUserRepository::boxed(pool.clone());

    // Initialize services
    let notifier = Arc::new(SmtpNotifier::new(config.mail.clone()));
    let alert_service = Arc::new(AlertService::new(config.alert.cooldown_minutes, notifier));
    let auth_service = Arc::new(AuthService::new(user_repo, &config.auth.token_secret));
    let ingest_service = Arc::new(IngestService::new(room_repo, reading_repo.clone(), alert_service));

    let state = AppState {
        ingest_service,
        auth_service,
        reading_repo,
    };

    let app = api::build_router(state, &config.server.cors_origin);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
