//! WebSocket chat protocol messages.
//!
//! Inbound frames are JSON commands tagged by `type`; anything that does not
//! parse as a command is treated as chat content. Outbound messages carry
//! Unix timestamps in milliseconds; messages queued together arrive in one
//! frame, one JSON document per line.

use serde::{Deserialize, Serialize};

/// Commands a client sends to the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientCommand {
    Join { room_id: String },
    Leave,
    Chat { content: String },
}

impl ClientCommand {
    pub fn parse(payload: &[u8]) -> Self {
        match serde_json::from_slice(payload) {
            Ok(command) => command,
            Err(_) => Self::Chat {
                content: String::from_utf8_lossy(payload).into_owned(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageType {
    RoomJoined,
    RoomLeft,
    ParticipantJoined,
    ParticipantLeft,
    Chat,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub client_id: String,
    pub connected_at: i64,
}

/// Sent to a client once it has joined a room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomJoinedMessage {
    pub r#type: MessageType,
    pub room_id: String,
    pub participants: Vec<ParticipantInfo>,
}

/// Sent to a client once it has left its room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomLeftMessage {
    pub r#type: MessageType,
    pub room_id: String,
}

/// Participant joined notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantJoinedMessage {
    pub r#type: MessageType,
    pub room_id: String,
    pub client_id: String,
    pub connected_at: i64,
}

/// Participant left notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantLeftMessage {
    pub r#type: MessageType,
    pub room_id: String,
    pub client_id: String,
    pub left_at: i64,
}

/// Chat message relayed to the other members of a room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub r#type: MessageType,
    pub room_id: String,
    pub client_id: String,
    pub content: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub r#type: MessageType,
    pub message: String,
}
