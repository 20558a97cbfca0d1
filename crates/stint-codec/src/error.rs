//! Error types for codec operations.

/// A codec tried to encode or decode a value and failed.
///
/// This is distinct from a codec declining a value: declining is reported
/// as `Ok(false)` / `Ok(None)` so a chain can move on to the next member.
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    /// Attribute payload could not be converted to or from JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Input ended before a complete value was read.
    #[error("Truncated input: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    /// A length-prefixed string was not valid UTF-8.
    #[error("Invalid UTF-8 in string field")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// A named field was absent from a structured value.
    #[error("Missing field '{0}'")]
    MissingField(String),

    /// A named field held a value of the wrong kind.
    #[error("Field '{field}' has the wrong type, expected {expected}")]
    FieldType {
        field: String,
        expected: &'static str,
    },

    /// A field decoded but its value is out of range.
    #[error("Invalid value for field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    /// A structured value was finished without a type name.
    #[error("Structured value has no type name")]
    MissingTypeName,

    /// A data frame carried a type tag outside the serializer's supported list.
    #[error("Unknown type tag {tag} for serializer {id:#010x}")]
    UnknownTypeTag { id: u32, tag: u8 },

    /// A data frame referenced a serializer id nobody registered.
    #[error("Unknown serializer id {0:#010x}")]
    UnknownSerializerId(u32),

    /// The wrapped serializer declined a value this codec was asked to handle.
    #[error("Value of type {0} is not handled by this codec")]
    Unsupported(&'static str),
}

/// Codec configuration is invalid. Raised at construction, never on first use.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A chain was composed from zero codecs.
    #[error("At least one codec is required to compose a chain")]
    EmptyChain,

    /// Two data serializers were registered under the same id.
    #[error("Data serializer id {0:#010x} is already registered")]
    DuplicateSerializerId(u32),
}
