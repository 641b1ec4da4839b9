//! WebSocket chat server with rooms.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin roomcast-server -- --port 8080
//! ```

use clap::Parser;
use roomcast::server::ServerArgs;
use roomcast_shared::logger::setup_logger;

#[tokio::main]
async fn main() {
    let args = ServerArgs::parse();
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    if let Err(e) = roomcast::run_server(args).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
