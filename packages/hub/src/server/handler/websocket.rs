//! WebSocket connection handler.

use std::sync::Arc;

use axum::{
    extract::{Query, State, ws::WebSocketUpgrade},
    http::{HeaderMap, StatusCode},
    response::Response,
};

use crate::{
    domain::{ClientId, RoomId},
    error::HubError,
    server::state::{AppState, ConnectQuery},
};

/// Upgrade to a WebSocket, register the client and serve it until it disconnects.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    let client_id = match query.client_id {
        Some(raw) => ClientId::new(raw.clone()).map_err(|err| {
            tracing::warn!("Invalid client_id '{}': {}", raw, err);
            StatusCode::BAD_REQUEST
        })?,
        None => ClientId::new(uuid::Uuid::new_v4().to_string()).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?,
    };
    let room_id = match query.room {
        Some(raw) => Some(RoomId::new(raw.clone()).map_err(|err| {
            tracing::warn!("Invalid room '{}': {}", raw, err);
            StatusCode::BAD_REQUEST
        })?),
        None => None,
    };

    if state.hub.get_client(&client_id).await.is_ok() {
        tracing::warn!("Client '{}' is already connected. Rejecting connection.", client_id);
        return Err(StatusCode::CONFLICT);
    }

    let hub = state.hub.clone();
    let chat = state.chat.clone();
    let upgraded = state.hub.upgrade(ws, &headers, None, move |connection| async move {
        let client = hub.new_client(client_id, connection);
        if let Err(err) = hub.register_client(client.clone()).await {
            // Lost a race with another connection using the same id
            tracing::warn!("Rejecting connection: {}", err);
            if let Err(err) = client.close().await {
                tracing::debug!("error closing rejected client: {}", err);
            }
            return;
        }
        tracing::info!(client_id = %client.id(), "client connected");

        if let Some(room_id) = room_id {
            chat.join(&client, room_id).await;
        }

        let client_id = client.id().clone();
        if let Some(room_id) = hub.serve_client(client, chat.clone()).await {
            chat.announce_left(&room_id, &client_id).await;
        }
        tracing::info!(%client_id, "client disconnected");
    });

    match upgraded {
        Ok(response) => Ok(response),
        Err(HubError::Handshake(reason)) => {
            tracing::warn!("Handshake rejected: {}", reason);
            Err(StatusCode::FORBIDDEN)
        }
        Err(err) => {
            tracing::error!("Upgrade failed: {}", err);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
