//! Error types for expiration configuration.

/// Expiration configuration is invalid. Raised at construction.
#[derive(Debug, thiserror::Error)]
pub enum ExpiryError {
    /// A fixed-duration policy was requested without a duration.
    #[error("Fixed duration is required for a fixed-duration expiration policy")]
    MissingFixedDuration,
}

/// Result type for expiration configuration.
pub type Result<T> = std::result::Result<T, ExpiryError>;
