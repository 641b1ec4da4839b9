//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

/// Hub-wide counters for the stats endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsDto {
    pub clients: usize,
    pub rooms: usize,
}

/// Room summary for list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSummaryDto {
    pub id: String,
    pub participants: Vec<String>,
    pub created_at: String, // ISO 8601
}

/// Room detail for detail endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomDetailDto {
    pub id: String,
    pub participants: Vec<ParticipantDetailDto>,
    pub created_at: String, // ISO 8601
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantDetailDto {
    pub client_id: String,
    pub connected_at: String, // ISO 8601
}
