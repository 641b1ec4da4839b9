//! Handler modules for HTTP and WebSocket endpoints.

pub mod http;
pub mod websocket;

pub use http::{get_room_detail, get_rooms, get_stats, health_check};
pub use websocket::websocket_handler;
