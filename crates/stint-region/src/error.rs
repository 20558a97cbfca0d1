//! Error types for region operations.

use stint_codec::SerializationError;

/// Error type for region operations.
#[derive(Debug, thiserror::Error)]
pub enum RegionError {
    /// No registered data serializer accepts the value.
    #[error("No data serializer for value stored under '{0}'")]
    NoSerializer(String),

    /// An entry could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),
}

/// Result type for region operations.
pub type Result<T> = std::result::Result<T, RegionError>;
