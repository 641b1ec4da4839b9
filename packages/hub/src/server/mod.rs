//! Demo chat server built on the hub.

mod args;
pub mod chat;
pub mod dto;
pub mod handler;
mod runner;
mod signal;
pub mod state;

pub use args::ServerArgs;
pub use runner::{ServerError, build_router, run as run_server};
