//! Domain factories for creating value objects.

use super::{RoomId, error::ValueObjectError};

/// Factory for generating RoomId instances.
///
/// Used when the hub assigns the room identifier instead of the caller.
pub struct RoomIdFactory;

impl RoomIdFactory {
    /// Generate a new RoomId with a random UUID v4.
    ///
    /// # Errors
    ///
    /// This method should not fail in practice, but returns Result for consistency
    /// with the domain error handling pattern.
    pub fn generate() -> Result<RoomId, ValueObjectError> {
        let uuid = uuid::Uuid::new_v4();
        RoomId::new(uuid.to_string())
    }
}
