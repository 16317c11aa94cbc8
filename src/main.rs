//! Bookrent Server - library rental REST API

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bookrent_server::{
    config::AppConfig,
    create_router,
    repository::Repository,
    services::{metadata::GoogleBooksClient, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("bookrent_server={},tower_http=debug", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Bookrent Server v{}", env!("CARGO_PKG_VERSION"));

    let repository = if config.database.is_memory() {
        tracing::warn!("Using the in-memory store, data is lost on exit");
        Repository::in_memory()
    } else {
        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .connect(&config.database.url)
            .await
            .context("Failed to connect to database")?;

        tracing::info!("Connected to database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;

        tracing::info!("Database migrations completed");
        Repository::new(pool)
    };

    let metadata = Arc::new(GoogleBooksClient::new(&config.metadata)?);
    let services = Services::new(repository, &config, metadata);

    if config.metadata.popular_refresh_secs > 0 {
        tracing::info!(every_secs = config.metadata.popular_refresh_secs, "Scheduling popular books refresh");
        services
            .catalog
            .clone()
            .spawn_popular_refresh(Duration::from_secs(config.metadata.popular_refresh_secs));
    }

    let host = config.server.host.parse().context("Invalid host address")?;
    let addr = SocketAddr::new(host, config.server.port);

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
