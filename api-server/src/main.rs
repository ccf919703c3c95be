//! API server for the to-do service
//!
//! Exposes the task service over REST on `TODO_HTTP_PORT` (default 8081)
//! and pushes state changes over a WebSocket at `/api/events`.

mod config;
mod routes;
mod state;

use axum::Router;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api_server=debug,todo_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!("Using data directory: {:?}", config.data_dir);
    if config.import_enabled {
        tracing::info!("Remote import source: {}", config.import_url);
    }

    let app_state = AppState::new(&config).await?;

    // Purge and import in the background; requests get 503 until ready
    let service = app_state.service_arc();
    tokio::spawn(async move {
        match service.start().await {
            Ok(outcome) => tracing::info!("Startup finished, import: {:?}", outcome),
            Err(e) => tracing::error!("Task service failed to start: {}", e),
        }
    });

    let app = Router::new()
        .merge(routes::health::router())
        .merge(routes::task::router())
        .merge(routes::events::router())
        .with_state(app_state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    tracing::info!("REST API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
