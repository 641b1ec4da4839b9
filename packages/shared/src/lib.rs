//! Shared utilities for roomcast.
//!
//! Logger initialization and time helpers used by the hub and its binaries.

pub mod logger;
pub mod time;
