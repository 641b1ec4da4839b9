//! Duplex stream contract between a [`crate::Client`] and its transport.
//!
//! The client never sees the WebSocket library directly: it reads and writes
//! [`Frame`]s through the [`Connection`] trait and applies its own deadlines
//! around each call.

mod websocket;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportError;

pub use websocket::AxumConnection;

/// Close frame payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    pub code: u16,
    pub reason: String,
}

/// A single WebSocket frame as seen by the pumps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(Bytes),
    Binary(Bytes),
    Ping(Bytes),
    Pong(Bytes),
    Close(Option<CloseFrame>),
}

/// Duplex frame stream owned by exactly one client.
///
/// `read_frame` and `write_frame` are called concurrently from the read and
/// write pumps, so implementations must not serialize one behind the other.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connection: Send + Sync {
    /// Wait for the next frame. End of stream is reported as an abnormal closure.
    async fn read_frame(&self) -> Result<Frame, TransportError>;

    async fn write_frame(&self, frame: Frame) -> Result<(), TransportError>;

    /// Send a close frame if possible and release the transport.
    async fn close(&self) -> Result<(), TransportError>;
}
