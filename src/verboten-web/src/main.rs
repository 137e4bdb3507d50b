//! Verboten web server: hosts live voice games over WebSocket.

mod server;
mod transport;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use verboten_core::live::GeminiLiveConnector;
use verboten_core::{BackendConfig, Config};

use crate::server::{AppState, router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var("VERBOTEN_CONFIG").unwrap_or_else(|_| "verboten.toml".into());
    let config = Config::load_or_default(&config_path)?;
    let backend = BackendConfig::from_env()?;
    tracing::info!(backend = ?backend.kind, model = %backend.live_model, "live backend configured");

    let port = match std::env::var("PORT") {
        Ok(port) => port.parse::<u16>()?,
        Err(_) => config.server.port,
    };

    let state = AppState::new(config, Arc::new(GeminiLiveConnector::new(backend)))?;
    let app = router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("Listening on port {}", port);
    axum::serve(listener, app).await?;
    Ok(())
}
