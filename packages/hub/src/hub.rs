//! Central registry of clients and rooms.
//!
//! The hub is the single owner of every [`Client`]; rooms only index them.
//! Construct one explicitly and share it behind an `Arc`.

use std::{collections::HashMap, future::Future, sync::Arc};

use axum::{
    extract::ws::WebSocketUpgrade,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures_util::future::join_all;
use tokio::sync::RwLock;

use crate::{
    client::{Client, ClientHandler},
    config::HubConfig,
    connection::{AxumConnection, Connection},
    domain::{ClientId, RoomId, RoomIdFactory},
    error::HubError,
    room::Room,
};

#[derive(Default)]
struct HubState {
    clients: HashMap<ClientId, Arc<Client>>,
    rooms: HashMap<RoomId, Arc<Room>>,
}

pub struct Hub {
    config: Arc<HubConfig>,
    state: RwLock<HubState>,
}

impl Hub {
    /// Create a hub after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns `HubError::Config` if the configuration is inconsistent.
    pub fn new(config: HubConfig) -> Result<Self, HubError> {
        config.validate()?;
        if config.enable_compression {
            tracing::warn!("compression requested but not negotiated by the websocket transport");
        }
        Ok(Self {
            config: Arc::new(config),
            state: RwLock::new(HubState::default()),
        })
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Finish the WebSocket handshake and hand the upgraded connection to `on_upgrade`.
    ///
    /// # Errors
    ///
    /// Returns `HubError::Handshake` if the request origin is rejected.
    pub fn upgrade<F, Fut>(
        &self,
        ws: WebSocketUpgrade,
        request_headers: &HeaderMap,
        response_headers: Option<HeaderMap>,
        on_upgrade: F,
    ) -> Result<Response, HubError>
    where
        F: FnOnce(Arc<dyn Connection>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if !self.config.origin_allowed(request_headers) {
            return Err(HubError::Handshake("request origin not allowed".to_string()));
        }

        let mut response = ws
            .read_buffer_size(self.config.read_buffer_size)
            .write_buffer_size(self.config.write_buffer_size)
            .max_message_size(self.config.max_message_size)
            .on_failed_upgrade(|err| tracing::warn!("websocket upgrade failed: {}", err))
            .on_upgrade(move |socket| {
                let connection: Arc<dyn Connection> = Arc::new(AxumConnection::new(socket));
                on_upgrade(connection)
            })
            .into_response();
        if let Some(headers) = response_headers {
            response.headers_mut().extend(headers);
        }
        Ok(response)
    }

    /// Build a client sharing this hub's configuration. It is not registered yet.
    pub fn new_client(&self, id: ClientId, connection: Arc<dyn Connection>) -> Arc<Client> {
        Arc::new(Client::new(id, connection, self.config.clone()))
    }

    /// # Errors
    ///
    /// Returns `HubError::ClientAlreadyRegistered` if the id is taken.
    pub async fn register_client(&self, client: Arc<Client>) -> Result<(), HubError> {
        let mut state = self.state.write().await;
        if state.clients.contains_key(client.id()) {
            return Err(HubError::ClientAlreadyRegistered(client.id().clone()));
        }
        tracing::info!(client_id = %client.id(), total = state.clients.len() + 1, "client registered");
        state.clients.insert(client.id().clone(), client);
        Ok(())
    }

    /// Remove a client from its room and the registry, then close it.
    /// Unknown ids are ignored.
    ///
    /// Returns the room the client was removed from, if any.
    pub async fn unregister_client(&self, client_id: &ClientId) -> Option<RoomId> {
        let (client, left) = {
            let mut state = self.state.write().await;
            let client = state.clients.remove(client_id)?;
            let mut left = None;
            if let Some(room) = client.room_id().await.and_then(|id| state.rooms.get(&id).cloned()) {
                if room.remove_client(client_id).await.is_ok() {
                    left = Some(room.id().clone());
                }
            }
            tracing::info!(%client_id, total = state.clients.len(), "client unregistered");
            (client, left)
        };

        if let Err(err) = client.close().await {
            tracing::debug!(%client_id, "error closing client: {}", err);
        }
        left
    }

    /// # Errors
    ///
    /// Returns `HubError::ClientNotFound` for an unknown id.
    pub async fn get_client(&self, client_id: &ClientId) -> Result<Arc<Client>, HubError> {
        self.state
            .read()
            .await
            .clients
            .get(client_id)
            .cloned()
            .ok_or_else(|| HubError::ClientNotFound(client_id.clone()))
    }

    pub async fn get_or_create_room(&self, room_id: RoomId) -> Arc<Room> {
        let mut state = self.state.write().await;
        Self::room_entry(&mut state, room_id)
    }

    /// Create a room with a hub-assigned id.
    ///
    /// # Errors
    ///
    /// Propagates id generation failures.
    pub async fn create_room(&self) -> Result<Arc<Room>, HubError> {
        let room_id = RoomIdFactory::generate()?;
        Ok(self.get_or_create_room(room_id).await)
    }

    /// # Errors
    ///
    /// Returns `HubError::RoomNotFound` for an unknown id.
    pub async fn get_room(&self, room_id: &RoomId) -> Result<Arc<Room>, HubError> {
        self.state
            .read()
            .await
            .rooms
            .get(room_id)
            .cloned()
            .ok_or_else(|| HubError::RoomNotFound(room_id.clone()))
    }

    /// Detach every member and drop the room. Unknown ids are ignored.
    pub async fn remove_room(&self, room_id: &RoomId) {
        let mut state = self.state.write().await;
        if let Some(room) = state.rooms.remove(room_id) {
            room.close().await;
            tracing::info!(%room_id, "room removed");
        }
    }

    /// Move a client into `room_id`, leaving its current room first.
    /// The room is created if needed.
    ///
    /// # Errors
    ///
    /// Returns `HubError::ClientNotFound` for an unknown client and
    /// `HubError::ClientAlreadyInRoom` if it is already there.
    pub async fn join_room(&self, client_id: &ClientId, room_id: RoomId) -> Result<Arc<Room>, HubError> {
        let mut state = self.state.write().await;
        let client = state
            .clients
            .get(client_id)
            .cloned()
            .ok_or_else(|| HubError::ClientNotFound(client_id.clone()))?;

        match client.room_id().await {
            Some(current) if current == room_id => {
                return Err(HubError::ClientAlreadyInRoom {
                    client_id: client_id.clone(),
                    room_id,
                });
            }
            Some(current) => {
                if let Some(previous) = state.rooms.get(&current) {
                    if let Err(err) = previous.remove_client(client_id).await {
                        tracing::warn!(%client_id, room_id = %current, "client missing from its room: {}", err);
                    }
                }
            }
            None => {}
        }

        let room = Self::room_entry(&mut state, room_id);
        room.add_client(&client).await?;
        Ok(room)
    }

    /// # Errors
    ///
    /// Returns `HubError::ClientNotFound` for an unknown client and
    /// `HubError::ClientNotInRoom` if it belongs to no room.
    pub async fn leave_room(&self, client_id: &ClientId) -> Result<RoomId, HubError> {
        let state = self.state.write().await;
        let client = state
            .clients
            .get(client_id)
            .ok_or_else(|| HubError::ClientNotFound(client_id.clone()))?;
        let room_id = client
            .room_id()
            .await
            .ok_or_else(|| HubError::ClientNotInRoom(client_id.clone()))?;
        match state.rooms.get(&room_id) {
            Some(room) => room.remove_client(client_id).await?,
            None => client.set_room_id(None).await,
        }
        Ok(room_id)
    }

    /// # Errors
    ///
    /// Returns `HubError::ClientNotFound` for an unknown id, or the client's send error.
    pub async fn send_to_client(&self, client_id: &ClientId, message: Bytes) -> Result<(), HubError> {
        let client = self.get_client(client_id).await?;
        client.send(message).await
    }

    /// # Errors
    ///
    /// Returns `HubError::RoomNotFound` for an unknown id.
    pub async fn broadcast_to_room(&self, room_id: &RoomId, message: Bytes) -> Result<usize, HubError> {
        let room = self.get_room(room_id).await?;
        Ok(room.broadcast(message).await)
    }

    /// # Errors
    ///
    /// Returns `HubError::RoomNotFound` for an unknown id.
    pub async fn broadcast_to_room_exclude(
        &self,
        room_id: &RoomId,
        message: Bytes,
        exclude: &ClientId,
    ) -> Result<usize, HubError> {
        let room = self.get_room(room_id).await?;
        Ok(room.broadcast_exclude(message, exclude).await)
    }

    pub async fn room_count(&self) -> usize {
        self.state.read().await.rooms.len()
    }

    pub async fn client_count(&self) -> usize {
        self.state.read().await.clients.len()
    }

    pub async fn room_ids(&self) -> Vec<RoomId> {
        let mut ids: Vec<_> = self.state.read().await.rooms.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Run both pumps of a registered client and unregister it once the
    /// read pump stops.
    ///
    /// Returns the room the client was still in when it was unregistered.
    pub async fn serve_client(&self, client: Arc<Client>, handler: Arc<dyn ClientHandler>) -> Option<RoomId> {
        let client_id = client.id().clone();
        let writer = tokio::spawn(client.clone().write_pump());
        client.read_pump(handler).await;

        let left = self.unregister_client(&client_id).await;
        if let Err(err) = writer.await {
            tracing::warn!(%client_id, "write pump task failed: {}", err);
        }
        left
    }

    /// Close every client and room.
    pub async fn shutdown(&self) {
        let (clients, rooms) = {
            let mut state = self.state.write().await;
            let clients: Vec<_> = state.clients.drain().map(|(_, client)| client).collect();
            let rooms: Vec<_> = state.rooms.drain().map(|(_, room)| room).collect();
            (clients, rooms)
        };
        for room in &rooms {
            room.close().await;
        }
        // Each close is bounded by the write deadline; run them side by side.
        join_all(clients.iter().map(|client| async move {
            if let Err(err) = client.close().await {
                tracing::debug!(client_id = %client.id(), "error closing client: {}", err);
            }
        }))
        .await;
        tracing::info!(clients = clients.len(), rooms = rooms.len(), "hub shut down");
    }

    fn room_entry(state: &mut HubState, room_id: RoomId) -> Arc<Room> {
        state
            .rooms
            .entry(room_id)
            .or_insert_with_key(|id| {
                tracing::info!(room_id = %id, "room created");
                Arc::new(Room::new(id.clone()))
            })
            .clone()
    }
}
