//! In-memory WebSocket hub.
//!
//! A [`Hub`] owns every live [`Client`] and groups them into named [`Room`]s
//! for broadcast. Each client runs a read pump and a write pump over a
//! [`Connection`]; the axum adapter is [`AxumConnection`]. The `server`
//! module wires the hub into a small chat server.

pub mod client;
pub mod config;
pub mod connection;
pub mod domain;
pub mod error;
pub mod hub;
pub mod room;
pub mod server;

// Re-export entry points
pub use client::{Client, ClientHandler, ClientStatus};
pub use config::HubConfig;
pub use connection::{AxumConnection, CloseFrame, Connection, Frame};
pub use domain::{ClientId, RoomId};
pub use error::{ConfigError, HubError, TransportError};
pub use hub::Hub;
pub use room::Room;
pub use server::run_server;
