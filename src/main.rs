use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber;

mod api;
mod config;
mod models;
mod services;
mod validation;

use config::Settings;
use services::ConnectionPoolManager;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load configuration; malformed settings are fatal
    let settings = Settings::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        api::middleware::AppError::Config(e.to_string())
    })?;

    info!(
        "Starting server on {} (model: {}, default db: {})",
        settings.server_address(),
        settings.llm.model,
        settings.database.default_uri
    );

    // Postgres pools are bounded by MAX_CONNECTIONS and shared across requests
    let pool_manager = Arc::new(ConnectionPoolManager::new(
        settings.database.max_connections,
    ));

    let addr: SocketAddr = settings.server_address().parse()?;
    let app: Router = api::routes::create_router_with_state(settings, pool_manager);

    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
