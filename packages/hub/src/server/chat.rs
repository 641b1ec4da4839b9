//! Chat application logic driven by client messages.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

use roomcast_shared::time::get_jst_timestamp;

use crate::{
    client::{Client, ClientHandler},
    domain::{ClientId, RoomId},
    error::{HubError, TransportError},
    hub::Hub,
    server::dto::websocket::{
        ChatMessage, ClientCommand, ErrorMessage, MessageType, ParticipantInfo, ParticipantJoinedMessage,
        ParticipantLeftMessage, RoomJoinedMessage, RoomLeftMessage,
    },
};

/// Routes client commands to the hub: joining and leaving rooms, relaying chat.
pub struct ChatHandler {
    hub: Arc<Hub>,
}

impl ChatHandler {
    pub fn new(hub: Arc<Hub>) -> Self {
        Self { hub }
    }

    /// Move `client` into `room_id`, telling both the old and the new room.
    pub async fn join(&self, client: &Arc<Client>, room_id: RoomId) {
        let previous = client.room_id().await;
        let room = match self.hub.join_room(client.id(), room_id).await {
            Ok(room) => room,
            Err(err) => {
                tracing::info!(client_id = %client.id(), "join rejected: {}", err);
                self.reply_error(client, err.to_string()).await;
                return;
            }
        };

        if let Some(previous) = previous {
            self.announce_left(&previous, client.id()).await;
        }

        let mut participants = Vec::new();
        for id in room.client_ids().await {
            if let Ok(member) = room.get_client(&id).await {
                participants.push(ParticipantInfo {
                    client_id: id.into_string(),
                    connected_at: member.connected_at().timestamp_millis(),
                });
            }
        }
        self.reply(
            client,
            &RoomJoinedMessage {
                r#type: MessageType::RoomJoined,
                room_id: room.id().to_string(),
                participants,
            },
        )
        .await;

        let joined = ParticipantJoinedMessage {
            r#type: MessageType::ParticipantJoined,
            room_id: room.id().to_string(),
            client_id: client.id().to_string(),
            connected_at: client.connected_at().timestamp_millis(),
        };
        if let Some(payload) = encode(&joined) {
            let delivered = room.broadcast_exclude(payload, client.id()).await;
            tracing::info!(client_id = %client.id(), room_id = %room.id(), delivered, "participant joined");
        }
    }

    pub async fn leave(&self, client: &Arc<Client>) {
        match self.hub.leave_room(client.id()).await {
            Ok(room_id) => {
                self.reply(
                    client,
                    &RoomLeftMessage {
                        r#type: MessageType::RoomLeft,
                        room_id: room_id.to_string(),
                    },
                )
                .await;
                self.announce_left(&room_id, client.id()).await;
            }
            Err(err) => self.reply_error(client, err.to_string()).await,
        }
    }

    /// Relay `content` to everyone else in the sender's room.
    pub async fn chat(&self, client: &Arc<Client>, content: String) {
        let Some(room_id) = client.room_id().await else {
            self.reply_error(client, "join a room before chatting".to_string()).await;
            return;
        };

        let message = ChatMessage {
            r#type: MessageType::Chat,
            room_id: room_id.to_string(),
            client_id: client.id().to_string(),
            content,
            timestamp: get_jst_timestamp(),
        };
        let Some(payload) = encode(&message) else {
            return;
        };
        match self.hub.broadcast_to_room_exclude(&room_id, payload, client.id()).await {
            Ok(delivered) => tracing::debug!(client_id = %client.id(), %room_id, delivered, "chat relayed"),
            Err(err) => self.reply_error(client, err.to_string()).await,
        }
    }

    /// Tell the remaining members of `room_id` that `client_id` is gone.
    pub async fn announce_left(&self, room_id: &RoomId, client_id: &ClientId) {
        let left = ParticipantLeftMessage {
            r#type: MessageType::ParticipantLeft,
            room_id: room_id.to_string(),
            client_id: client_id.to_string(),
            left_at: get_jst_timestamp(),
        };
        let Some(payload) = encode(&left) else {
            return;
        };
        match self.hub.broadcast_to_room(room_id, payload).await {
            Ok(delivered) => tracing::info!(%client_id, %room_id, delivered, "participant left"),
            Err(HubError::RoomNotFound(_)) => {}
            Err(err) => tracing::warn!(%client_id, %room_id, "failed to announce departure: {}", err),
        }
    }

    async fn reply<T: Serialize>(&self, client: &Arc<Client>, message: &T) {
        let Some(payload) = encode(message) else {
            return;
        };
        if let Err(err) = client.send(payload).await {
            tracing::debug!(client_id = %client.id(), "reply not queued: {}", err);
        }
    }

    async fn reply_error(&self, client: &Arc<Client>, message: String) {
        self.reply(
            client,
            &ErrorMessage {
                r#type: MessageType::Error,
                message,
            },
        )
        .await;
    }
}

#[async_trait]
impl ClientHandler for ChatHandler {
    async fn on_message(&self, client: &Arc<Client>, message: Bytes) {
        match ClientCommand::parse(&message) {
            ClientCommand::Join { room_id } => match RoomId::new(room_id) {
                Ok(room_id) => self.join(client, room_id).await,
                Err(err) => self.reply_error(client, err.to_string()).await,
            },
            ClientCommand::Leave => self.leave(client).await,
            ClientCommand::Chat { content } => self.chat(client, content).await,
        }
    }

    async fn on_error(&self, client: &Arc<Client>, error: &TransportError) {
        tracing::warn!(client_id = %client.id(), "chat connection failed: {}", error);
    }
}

fn encode<T: Serialize>(message: &T) -> Option<Bytes> {
    match serde_json::to_vec(message) {
        Ok(json) => Some(Bytes::from(json)),
        Err(err) => {
            tracing::error!("failed to serialize message: {}", err);
            None
        }
    }
}
