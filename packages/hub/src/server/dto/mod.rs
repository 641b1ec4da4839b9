//! Data transfer objects for the HTTP API and the WebSocket chat protocol.

pub mod http;
pub mod websocket;
