//! Error types for the hub, its rooms and client connections.

use std::time::Duration;

use axum::extract::ws::close_code;
use thiserror::Error;

use crate::domain::{ClientId, RoomId, ValueObjectError};

/// Errors returned by [`crate::Hub`], [`crate::Room`] and [`crate::Client`] operations.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("websocket client not found: {0}")]
    ClientNotFound(ClientId),

    #[error("room not found: {0}")]
    RoomNotFound(RoomId),

    #[error("client '{client_id}' already in room '{room_id}'")]
    ClientAlreadyInRoom { client_id: ClientId, room_id: RoomId },

    #[error("client '{0}' is not in any room")]
    ClientNotInRoom(ClientId),

    #[error("client '{0}' is already registered")]
    ClientAlreadyRegistered(ClientId),

    /// The client is closed, or its mailbox is full.
    #[error("connection closed")]
    ConnectionClosed,

    #[error("websocket handshake failed: {0}")]
    Handshake(String),

    #[error(transparent)]
    InvalidId(#[from] ValueObjectError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Failures of the underlying duplex stream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection closed by peer (code {code}: {reason})")]
    Closed { code: u16, reason: String },

    #[error("no frame received within {0:?}")]
    ReadTimeout(Duration),

    #[error("frame not written within {0:?}")]
    WriteTimeout(Duration),

    #[error("message of {size} bytes exceeds the limit of {limit} bytes")]
    MessageTooLarge { size: usize, limit: usize },

    #[error("text frame payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("websocket transport error: {0}")]
    Io(String),
}

impl TransportError {
    /// Peer hung up without a close frame.
    pub fn abnormal_closure() -> Self {
        Self::Closed {
            code: close_code::ABNORMAL,
            reason: String::new(),
        }
    }

    /// Whether this error is an ordinary teardown rather than a failure.
    ///
    /// Normal closure, going-away, a close frame without status and an
    /// abnormal closure (stream ended without a close frame) are expected.
    pub fn is_expected_close(&self) -> bool {
        matches!(
            self,
            Self::Closed { code, .. }
                if matches!(
                    *code,
                    close_code::NORMAL | close_code::AWAY | close_code::STATUS | close_code::ABNORMAL
                )
        )
    }
}

impl From<axum::Error> for TransportError {
    fn from(err: axum::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Invalid [`crate::HubConfig`] values, rejected when the hub is created.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("ping period ({ping_period:?}) must be shorter than pong wait ({pong_wait:?})")]
    PingPeriodNotBelowPongWait {
        ping_period: Duration,
        pong_wait: Duration,
    },

    #[error("ping period must be greater than zero")]
    ZeroPingPeriod,

    #[error("mailbox capacity must be greater than zero")]
    ZeroMailboxCapacity,

    #[error("max message size must be greater than zero")]
    ZeroMaxMessageSize,
}
