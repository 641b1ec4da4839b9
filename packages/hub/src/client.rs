//! A single duplex connection with its read and write pumps.
//!
//! Each client owns a bounded mailbox. [`Client::send`] never waits: when the
//! mailbox is full or the client is closed the message is rejected with
//! [`HubError::ConnectionClosed`]. The write pump drains the mailbox onto the
//! connection and keeps the peer alive with pings, while the read pump hands
//! inbound data frames to a [`ClientHandler`].

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use axum::extract::ws::close_code;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use tokio::{
    sync::{
        Mutex,
        mpsc::{self, error::TrySendError},
    },
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::HubConfig,
    connection::{Connection, Frame},
    domain::{ClientId, RoomId},
    error::{HubError, TransportError},
};

/// Lifecycle of a client. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientStatus {
    /// Created, pumps not started yet.
    Connected,
    /// At least one pump is running.
    Active,
    /// Close in progress: cancelled, mailbox closed, connection closing.
    Closing,
    Closed,
}

impl ClientStatus {
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Closing | Self::Closed)
    }
}

/// Application callbacks invoked by the read pump.
#[async_trait]
pub trait ClientHandler: Send + Sync {
    /// Called for every inbound text or binary frame.
    async fn on_message(&self, client: &Arc<Client>, message: Bytes);

    /// Called when the read pump stops on anything other than an ordinary close.
    async fn on_error(&self, client: &Arc<Client>, error: &TransportError) {
        tracing::warn!(client_id = %client.id(), "connection error: {}", error);
    }
}

struct ClientState {
    status: ClientStatus,
    room_id: Option<RoomId>,
    /// Dropped on close, which closes the mailbox.
    outbound: Option<mpsc::Sender<Bytes>>,
}

pub struct Client {
    id: ClientId,
    connection: Arc<dyn Connection>,
    config: Arc<HubConfig>,
    state: Mutex<ClientState>,
    /// Taken by the write pump when it starts.
    mailbox: Mutex<Option<mpsc::Receiver<Bytes>>>,
    cancel: CancellationToken,
    dropped_messages: AtomicU64,
    connected_at: DateTime<Utc>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("connected_at", &self.connected_at)
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn new(id: ClientId, connection: Arc<dyn Connection>, config: Arc<HubConfig>) -> Self {
        let (outbound, mailbox) = mpsc::channel(config.mailbox_capacity.max(1));
        Self {
            id,
            connection,
            config,
            state: Mutex::new(ClientState {
                status: ClientStatus::Connected,
                room_id: None,
                outbound: Some(outbound),
            }),
            mailbox: Mutex::new(Some(mailbox)),
            cancel: CancellationToken::new(),
            dropped_messages: AtomicU64::new(0),
            connected_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &ClientId {
        &self.id
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    pub async fn status(&self) -> ClientStatus {
        self.state.lock().await.status
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.status.is_closed()
    }

    /// Number of messages rejected because the mailbox was full.
    pub fn dropped_messages(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    pub async fn room_id(&self) -> Option<RoomId> {
        self.state.lock().await.room_id.clone()
    }

    pub(crate) async fn set_room_id(&self, room_id: Option<RoomId>) {
        self.state.lock().await.room_id = room_id;
    }

    /// Clear the room association only if it still names `room_id`.
    pub(crate) async fn clear_room_if(&self, room_id: &RoomId) -> bool {
        let mut state = self.state.lock().await;
        if state.room_id.as_ref() == Some(room_id) {
            state.room_id = None;
            true
        } else {
            false
        }
    }

    /// Enqueue a message for the write pump without waiting.
    ///
    /// # Errors
    ///
    /// Returns `HubError::ConnectionClosed` if the client is closed or its
    /// mailbox is full.
    pub async fn send(&self, message: Bytes) -> Result<(), HubError> {
        let state = self.state.lock().await;
        let Some(outbound) = state.outbound.as_ref().filter(|_| !state.status.is_closed()) else {
            return Err(HubError::ConnectionClosed);
        };
        match outbound.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped_messages.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(client_id = %self.id, dropped, "mailbox full, message dropped");
                Err(HubError::ConnectionClosed)
            }
            Err(TrySendError::Closed(_)) => Err(HubError::ConnectionClosed),
        }
    }

    /// Close the client. Only the first call does any work.
    ///
    /// # Errors
    ///
    /// Returns the transport error raised while closing the connection.
    pub async fn close(&self) -> Result<(), HubError> {
        {
            let mut state = self.state.lock().await;
            if state.status.is_closed() {
                return Ok(());
            }
            state.status = ClientStatus::Closing;
            self.cancel.cancel();
            state.outbound = None;
        }

        // A peer that stopped reading can stall the close handshake forever.
        let deadline = self.config.write_deadline();
        let result = time::timeout(deadline, self.connection.close())
            .await
            .unwrap_or(Err(TransportError::WriteTimeout(deadline)));
        self.state.lock().await.status = ClientStatus::Closed;
        tracing::debug!(client_id = %self.id, "client closed");
        result.map_err(HubError::from)
    }

    /// Spawn both pumps on the current runtime.
    pub fn spawn_pumps(self: &Arc<Self>, handler: Arc<dyn ClientHandler>) -> (JoinHandle<()>, JoinHandle<()>) {
        let reader = tokio::spawn(self.clone().read_pump(handler));
        let writer = tokio::spawn(self.clone().write_pump());
        (reader, writer)
    }

    /// Read frames until the connection fails, the peer closes, or the
    /// client is closed. Closes the client before returning.
    pub async fn read_pump(self: Arc<Self>, handler: Arc<dyn ClientHandler>) {
        self.activate().await;
        let deadline = self.config.read_deadline();
        let limit = self.config.max_message_size;
        tracing::debug!(client_id = %self.id, "read pump started");

        loop {
            // A fresh timeout per frame: any frame, pongs included, extends the deadline.
            let read = tokio::select! {
                () = self.cancel.cancelled() => break,
                read = time::timeout(deadline, self.connection.read_frame()) => read,
            };
            let frame = match read {
                Ok(Ok(frame)) => frame,
                Ok(Err(err)) => {
                    self.report(&handler, err).await;
                    break;
                }
                Err(_) => {
                    self.report(&handler, TransportError::ReadTimeout(deadline)).await;
                    break;
                }
            };

            match frame {
                Frame::Text(payload) | Frame::Binary(payload) => {
                    if payload.len() > limit {
                        let err = TransportError::MessageTooLarge {
                            size: payload.len(),
                            limit,
                        };
                        self.report(&handler, err).await;
                        break;
                    }
                    handler.on_message(&self, payload).await;
                }
                Frame::Ping(_) | Frame::Pong(_) => {
                    tracing::trace!(client_id = %self.id, "keepalive frame received");
                }
                Frame::Close(frame) => {
                    let err = match frame {
                        Some(frame) => TransportError::Closed {
                            code: frame.code,
                            reason: frame.reason,
                        },
                        None => TransportError::Closed {
                            code: close_code::STATUS,
                            reason: String::new(),
                        },
                    };
                    self.report(&handler, err).await;
                    break;
                }
            }
        }

        tracing::debug!(client_id = %self.id, "read pump stopped");
        if let Err(err) = self.close().await {
            tracing::debug!(client_id = %self.id, "error closing connection: {}", err);
        }
    }

    /// Drain the mailbox onto the connection and send keepalive pings.
    /// Closes the client before returning.
    pub async fn write_pump(self: Arc<Self>) {
        let Some(mut mailbox) = self.mailbox.lock().await.take() else {
            tracing::warn!(client_id = %self.id, "write pump already started");
            return;
        };
        self.activate().await;
        let period = self.config.ping_period;
        let mut ticker = time::interval_at(time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::debug!(client_id = %self.id, "write pump started");

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                message = mailbox.recv() => {
                    let Some(first) = message else {
                        // Mailbox closed and drained.
                        let _ = self.write(Frame::Close(None)).await;
                        break;
                    };
                    let frames = batch(first, &mut mailbox);
                    if let Err(err) = self.write_all(frames).await {
                        tracing::debug!(client_id = %self.id, "write failed: {}", err);
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.write(Frame::Ping(Bytes::new())).await {
                        tracing::debug!(client_id = %self.id, "ping failed: {}", err);
                        break;
                    }
                }
            }
        }

        tracing::debug!(client_id = %self.id, "write pump stopped");
        if let Err(err) = self.close().await {
            tracing::debug!(client_id = %self.id, "error closing connection: {}", err);
        }
    }

    async fn write_all(&self, frames: Vec<Frame>) -> Result<(), TransportError> {
        for frame in frames {
            self.write(frame).await?;
        }
        Ok(())
    }

    async fn write(&self, frame: Frame) -> Result<(), TransportError> {
        let deadline = self.config.write_deadline();
        time::timeout(deadline, self.connection.write_frame(frame))
            .await
            .map_err(|_| TransportError::WriteTimeout(deadline))?
    }

    async fn activate(&self) {
        let mut state = self.state.lock().await;
        if state.status == ClientStatus::Connected {
            state.status = ClientStatus::Active;
        }
    }

    async fn report(self: &Arc<Self>, handler: &Arc<dyn ClientHandler>, err: TransportError) {
        if err.is_expected_close() {
            tracing::debug!(client_id = %self.id, "connection closed: {}", err);
        } else {
            handler.on_error(self, &err).await;
        }
    }

    #[cfg(test)]
    pub(crate) async fn drain_mailbox(&self) -> Vec<Bytes> {
        let mut drained = Vec::new();
        if let Some(mailbox) = self.mailbox.lock().await.as_mut() {
            while let Ok(message) = mailbox.try_recv() {
                drained.push(message);
            }
        }
        drained
    }
}

/// Turn the first message and those already queued behind it into frames.
///
/// Consecutive UTF-8 messages are joined with newlines into one text frame;
/// any other payload goes out unchanged as a binary frame of its own.
fn batch(first: Bytes, mailbox: &mut mpsc::Receiver<Bytes>) -> Vec<Frame> {
    let queued = mailbox.len();
    let messages = std::iter::once(first).chain(std::iter::from_fn(|| mailbox.try_recv().ok()).take(queued));

    let mut frames = Vec::new();
    let mut text: Option<BytesMut> = None;
    for message in messages {
        if std::str::from_utf8(&message).is_err() {
            if let Some(buf) = text.take() {
                frames.push(Frame::Text(buf.freeze()));
            }
            frames.push(Frame::Binary(message));
            continue;
        }
        match text.as_mut() {
            Some(buf) => {
                buf.extend_from_slice(b"\n");
                buf.extend_from_slice(&message);
            }
            None => text = Some(BytesMut::from(&message[..])),
        }
    }
    if let Some(buf) = text {
        frames.push(Frame::Text(buf.freeze()));
    }
    frames
}
