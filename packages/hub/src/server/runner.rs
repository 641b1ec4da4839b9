//! Server startup and routing.

use std::sync::Arc;

use axum::{Router, routing::get};
use thiserror::Error;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{
    error::HubError,
    hub::Hub,
    server::{
        args::ServerArgs,
        handler::{get_room_detail, get_rooms, get_stats, health_check, websocket_handler},
        signal::shutdown_signal,
        state::AppState,
    },
};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Hub(#[from] HubError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let handshake_timeout = state.hub.config().handshake_timeout;
    Router::new()
        .route(
            "/ws",
            get(websocket_handler).layer(TimeoutLayer::new(handshake_timeout)),
        )
        .route("/api/health", get(health_check))
        .route("/api/stats", get(get_stats))
        .route("/api/rooms", get(get_rooms))
        .route("/api/rooms/{room_id}", get(get_room_detail))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the chat server until a shutdown signal arrives.
pub async fn run(args: ServerArgs) -> Result<(), ServerError> {
    let hub = Arc::new(Hub::new(args.hub_config())?);
    tracing::debug!(config = ?hub.config(), "hub configured");
    let app = build_router(Arc::new(AppState::new(hub.clone())));

    let listener = tokio::net::TcpListener::bind(args.bind_address()).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    let shutdown_hub = hub.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Open websockets keep the server alive until their clients are closed
            shutdown_hub.shutdown().await;
        })
        .await?;

    tracing::info!("server stopped");
    Ok(())
}
