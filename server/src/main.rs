//! Roster Server - Main Entry Point
//!
//! User directory backend with pluggable profile image storage.

use anyhow::Result;
use tracing::info;

use roster_server::{api, config, db, storage};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roster_server=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Roster Server"
    );

    // Initialize record store (runs migrations for PostgreSQL)
    let repo = db::connect(&config).await?;

    // Initialize profile storage (creates the upload directory for disk)
    let profiles = storage::build_profile_storage(&config).await?;
    info!(backend = ?profiles.backend(), "Profile storage ready");

    // Build application state
    let state = api::AppState::new(repo, profiles, config.clone());

    // Build router
    let app = api::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "Server listening");

    // Graceful shutdown handler
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal, cleaning up...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutdown complete");

    Ok(())
}
