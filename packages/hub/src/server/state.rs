//! Shared application state.

use std::sync::Arc;

use serde::Deserialize;

use crate::{hub::Hub, server::chat::ChatHandler};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    /// Generated when absent
    pub client_id: Option<String>,
    /// Room to join right after connecting
    pub room: Option<String>,
}

pub struct AppState {
    pub hub: Arc<Hub>,
    pub chat: Arc<ChatHandler>,
}

impl AppState {
    pub fn new(hub: Arc<Hub>) -> Self {
        let chat = Arc::new(ChatHandler::new(hub.clone()));
        Self { hub, chat }
    }
}
