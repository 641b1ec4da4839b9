//! Named broadcast group of clients.
//!
//! A room only indexes its members; the hub owns them. Members are held as
//! [`Weak`] references so a room can never keep a client alive or close it.

use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    client::Client,
    domain::{ClientId, RoomId},
    error::HubError,
};

#[derive(Debug)]
pub struct Room {
    id: RoomId,
    created_at: DateTime<Utc>,
    members: RwLock<HashMap<ClientId, Weak<Client>>>,
}

impl Room {
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            members: RwLock::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Add a client and point its room association here.
    ///
    /// Leaving a previous room is the caller's job (see [`crate::Hub::join_room`]).
    ///
    /// # Errors
    ///
    /// Returns `HubError::ClientAlreadyInRoom` if the client is already in this room.
    pub async fn add_client(&self, client: &Arc<Client>) -> Result<(), HubError> {
        let mut members = self.members.write().await;
        if client.room_id().await.as_ref() == Some(&self.id) {
            return Err(HubError::ClientAlreadyInRoom {
                client_id: client.id().clone(),
                room_id: self.id.clone(),
            });
        }
        members.insert(client.id().clone(), Arc::downgrade(client));
        client.set_room_id(Some(self.id.clone())).await;
        tracing::debug!(room_id = %self.id, client_id = %client.id(), "client joined room");
        Ok(())
    }

    /// Remove a member and clear its room association.
    ///
    /// # Errors
    ///
    /// Returns `HubError::ClientNotFound` if the client is not a member.
    pub async fn remove_client(&self, client_id: &ClientId) -> Result<(), HubError> {
        let mut members = self.members.write().await;
        let member = members
            .remove(client_id)
            .ok_or_else(|| HubError::ClientNotFound(client_id.clone()))?;
        if let Some(client) = member.upgrade() {
            client.clear_room_if(&self.id).await;
        }
        tracing::debug!(room_id = %self.id, %client_id, "client left room");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `HubError::ClientNotFound` if the client is not a live member.
    pub async fn get_client(&self, client_id: &ClientId) -> Result<Arc<Client>, HubError> {
        let members = self.members.read().await;
        members
            .get(client_id)
            .and_then(Weak::upgrade)
            .ok_or_else(|| HubError::ClientNotFound(client_id.clone()))
    }

    /// Send to one member.
    ///
    /// # Errors
    ///
    /// Returns `HubError::ClientNotFound` for a non-member and
    /// `HubError::ConnectionClosed` if the member is closed or its mailbox is full.
    pub async fn send_to_client(&self, client_id: &ClientId, message: Bytes) -> Result<(), HubError> {
        let client = self.get_client(client_id).await?;
        client.send(message).await
    }

    /// Send to every open member. Individual failures are ignored.
    ///
    /// Returns the number of members the message was enqueued for.
    pub async fn broadcast(&self, message: Bytes) -> usize {
        self.fan_out(message, None).await
    }

    /// Same as [`Room::broadcast`], skipping `exclude`.
    pub async fn broadcast_exclude(&self, message: Bytes, exclude: &ClientId) -> usize {
        self.fan_out(message, Some(exclude)).await
    }

    async fn fan_out(&self, message: Bytes, exclude: Option<&ClientId>) -> usize {
        let members = self.members.read().await;
        let mut delivered = 0;
        for (id, member) in members.iter() {
            if exclude == Some(id) {
                continue;
            }
            let Some(client) = member.upgrade() else {
                continue;
            };
            if client.is_closed().await {
                continue;
            }
            match client.send(message.clone()).await {
                Ok(()) => delivered += 1,
                Err(err) => {
                    tracing::debug!(room_id = %self.id, client_id = %id, "broadcast skipped: {}", err);
                }
            }
        }
        delivered
    }

    pub async fn client_count(&self) -> usize {
        self.members.read().await.len()
    }

    pub async fn client_ids(&self) -> Vec<ClientId> {
        let mut ids: Vec<_> = self.members.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Detach every member without closing any connection.
    pub async fn close(&self) {
        let mut members = self.members.write().await;
        for member in members.values() {
            if let Some(client) = member.upgrade() {
                client.clear_room_if(&self.id).await;
            }
        }
        members.clear();
        tracing::debug!(room_id = %self.id, "room closed");
    }
}
