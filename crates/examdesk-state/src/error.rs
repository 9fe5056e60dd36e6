//! Error types for client-side state.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, StateError>;

/// Errors that can occur while reading or writing client-side state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Reading or writing the backing store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A value could not be serialized for storage.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A login was attempted with an unusable token.
    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

impl From<std::io::Error> for StateError {
    fn from(e: std::io::Error) -> Self {
        StateError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for StateError {
    fn from(e: serde_json::Error) -> Self {
        StateError::Serialization(e.to_string())
    }
}
