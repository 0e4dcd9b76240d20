//! snake-relay server entry point.
//!
//! Starts the Axum server with the WebSocket relay and REST endpoints.

use tracing_subscriber::EnvFilter;

use snake_relay::app_state::AppState;
use snake_relay::build_app;
use snake_relay::config::RelayConfig;
use snake_relay::service::{Dispatcher, RelayHandle};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = RelayConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    tracing::info!(addr = %config.listen_addr, "starting snake-relay");

    // Start the relay task; it owns all session state
    let dispatcher = Dispatcher::new(config.max_members_per_session);
    let (relay, relay_task) = RelayHandle::spawn(dispatcher, config.dispatch_queue_capacity);

    let app = build_app(AppState {
        relay,
        outbound_capacity: config.outbound_buffer_capacity,
        max_frame_bytes: config.max_frame_bytes,
    });

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    relay_task.abort();
    tracing::info!("snake-relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
