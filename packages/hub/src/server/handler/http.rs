//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use roomcast_shared::time::to_jst_rfc3339;

use crate::{
    domain::RoomId,
    server::{
        dto::http::{ParticipantDetailDto, RoomDetailDto, RoomSummaryDto, StatsDto},
        state::AppState,
    },
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsDto> {
    Json(StatsDto {
        clients: state.hub.client_count().await,
        rooms: state.hub.room_count().await,
    })
}

/// Get list of rooms, ordered by id
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSummaryDto>> {
    let mut summaries = Vec::new();
    for room_id in state.hub.room_ids().await {
        // Removed between listing and lookup
        let Ok(room) = state.hub.get_room(&room_id).await else {
            continue;
        };
        summaries.push(RoomSummaryDto {
            id: room.id().to_string(),
            participants: room.client_ids().await.into_iter().map(|id| id.into_string()).collect(),
            created_at: to_jst_rfc3339(room.created_at()),
        });
    }
    Json(summaries)
}

/// Get room detail by ID
pub async fn get_room_detail(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomDetailDto>, StatusCode> {
    let room_id = RoomId::new(room_id).map_err(|_| StatusCode::NOT_FOUND)?;
    let room = state.hub.get_room(&room_id).await.map_err(|_| StatusCode::NOT_FOUND)?;

    let mut participants = Vec::new();
    for client_id in room.client_ids().await {
        if let Ok(client) = room.get_client(&client_id).await {
            participants.push(ParticipantDetailDto {
                client_id: client_id.into_string(),
                connected_at: to_jst_rfc3339(client.connected_at()),
            });
        }
    }

    Ok(Json(RoomDetailDto {
        id: room.id().to_string(),
        participants,
        created_at: to_jst_rfc3339(room.created_at()),
    }))
}
