//! Error types for session and repository operations.

/// Error type for session and repository operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Session identifier is empty or blank.
    #[error("Invalid session id: {0:?}")]
    InvalidSessionId(String),

    /// Error from the backing repository.
    #[error("Repository error: {0}")]
    Repository(String),
}

/// Result type for session and repository operations.
pub type Result<T> = std::result::Result<T, Error>;
