//! Test fixtures shared by the integration tests.

#![allow(dead_code)]

use std::{collections::VecDeque, net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use roomcast::{
    Hub, HubConfig,
    server::{build_router, state::AppState},
};
use tokio::{net::TcpStream, task::JoinHandle};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};

/// Chat server running in-process on an ephemeral port
pub struct TestServer {
    pub hub: Arc<Hub>,
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(HubConfig::default()).await
    }

    pub async fn start_with(config: HubConfig) -> Self {
        let hub = Arc::new(Hub::new(config).expect("valid config"));
        let app = build_router(Arc::new(AppState::new(hub.clone())));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get local address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server failed");
        });
        Self { hub, addr, handle }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self, query: &str) -> String {
        format!("ws://{}/ws?{}", self.addr, query)
    }

    /// Connect and wait until the hub has registered the client and, when
    /// `room` is given, placed it in that room.
    pub async fn connect(&self, client_id: &str, room: Option<&str>) -> TestClient {
        let query = match room {
            Some(room) => format!("client_id={client_id}&room={room}"),
            None => format!("client_id={client_id}"),
        };
        let (socket, _) = tokio_tungstenite::connect_async(self.ws_url(&query))
            .await
            .expect("Failed to connect");
        let id = roomcast::ClientId::new(client_id.to_string()).expect("valid client id");
        let (hub, id) = (&self.hub, &id);
        wait_until(|| async move {
            match hub.get_client(id).await {
                Ok(client) => room.is_none() || client.room_id().await.is_some(),
                Err(_) => false,
            }
        })
        .await;
        TestClient {
            socket,
            pending: VecDeque::new(),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Poll `condition` until it holds, failing the test after two seconds.
pub async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition().await {
        assert!(tokio::time::Instant::now() < deadline, "condition not met in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// WebSocket client side of a connection to the [`TestServer`]
pub struct TestClient {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    /// Messages that arrived batched in one frame
    pending: VecDeque<serde_json::Value>,
}

impl TestClient {
    /// Next JSON message, skipping control frames.
    pub async fn recv_json(&mut self) -> serde_json::Value {
        loop {
            if let Some(value) = self.pending.pop_front() {
                return value;
            }
            let message = tokio::time::timeout(Duration::from_secs(2), self.socket.next())
                .await
                .expect("Timed out waiting for a message")
                .expect("Stream ended")
                .expect("WebSocket error");
            if let Message::Text(text) = message {
                for line in text.as_str().lines() {
                    self.pending
                        .push_back(serde_json::from_str(line).expect("Failed to parse JSON"));
                }
            }
        }
    }

    /// Next binary message, skipping control frames.
    pub async fn recv_binary(&mut self) -> Vec<u8> {
        loop {
            let message = tokio::time::timeout(Duration::from_secs(2), self.socket.next())
                .await
                .expect("Timed out waiting for a message")
                .expect("Stream ended")
                .expect("WebSocket error");
            match message {
                Message::Binary(payload) => return payload.to_vec(),
                Message::Text(text) => panic!("expected binary message, got text: {}", text.as_str()),
                _ => {}
            }
        }
    }

    pub async fn send_text(&mut self, text: &str) {
        self.socket
            .send(Message::Text(text.into()))
            .await
            .expect("Failed to send message");
    }

    pub async fn close(&mut self) {
        self.socket.close(None).await.expect("Failed to close");
    }
}
