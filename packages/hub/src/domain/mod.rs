//! Domain layer for the hub.
//!
//! Identifiers shared by clients, rooms and the hub registry.

pub mod error;
pub mod factory;
pub mod value_object;

pub use error::ValueObjectError;
pub use factory::RoomIdFactory;
pub use value_object::{ClientId, RoomId};
