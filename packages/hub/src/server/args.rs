//! Command line arguments for `roomcast-server`.

use std::time::Duration;

use clap::Parser;

use crate::config::{
    DEFAULT_MAILBOX_CAPACITY, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_READ_BUFFER_SIZE, DEFAULT_WRITE_BUFFER_SIZE,
    HubConfig,
};

#[derive(Debug, Clone, Parser)]
#[command(name = "roomcast-server", version, about = "WebSocket chat server with rooms")]
pub struct ServerArgs {
    /// Address to bind
    #[arg(long, env = "ROOMCAST_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "ROOMCAST_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Default log level when RUST_LOG is unset
    #[arg(long, env = "ROOMCAST_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, default_value_t = DEFAULT_READ_BUFFER_SIZE)]
    pub read_buffer_size: usize,

    #[arg(long, default_value_t = DEFAULT_WRITE_BUFFER_SIZE)]
    pub write_buffer_size: usize,

    #[arg(long)]
    pub enable_compression: bool,

    #[arg(long, default_value_t = 10)]
    pub handshake_timeout_secs: u64,

    /// Per-frame read timeout; 0 falls back to the pong wait
    #[arg(long, default_value_t = 60)]
    pub read_timeout_secs: u64,

    /// Per-frame write timeout; 0 means 10 seconds
    #[arg(long, default_value_t = 10)]
    pub write_timeout_secs: u64,

    #[arg(long, default_value_t = 60)]
    pub pong_wait_secs: u64,

    /// Must be shorter than the pong wait
    #[arg(long, default_value_t = 54)]
    pub ping_period_secs: u64,

    /// Largest inbound message in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_MESSAGE_SIZE)]
    pub max_message_size: usize,

    /// Outbound messages queued per client before sends are rejected
    #[arg(long, default_value_t = DEFAULT_MAILBOX_CAPACITY)]
    pub mailbox_capacity: usize,
}

impl ServerArgs {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn hub_config(&self) -> HubConfig {
        HubConfig::default()
            .with_read_buffer_size(self.read_buffer_size)
            .with_write_buffer_size(self.write_buffer_size)
            .with_enable_compression(self.enable_compression)
            .with_handshake_timeout(Duration::from_secs(self.handshake_timeout_secs))
            .with_read_timeout(Duration::from_secs(self.read_timeout_secs))
            .with_write_timeout(Duration::from_secs(self.write_timeout_secs))
            .with_pong_wait(Duration::from_secs(self.pong_wait_secs))
            .with_ping_period(Duration::from_secs(self.ping_period_secs))
            .with_max_message_size(self.max_message_size)
            .with_mailbox_capacity(self.mailbox_capacity)
    }
}
