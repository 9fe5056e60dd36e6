//! Error types for settings cache operations.

/// Error type for settings cache operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backend request failed.
    #[error("Settings fetch failed: {0}")]
    Fetch(#[from] examdesk_client::Error),

    /// The payload arrived but lacked the field this cache projects.
    #[error("Settings payload has no '{0}'")]
    MissingField(&'static str),

    /// Any other fetcher failure.
    #[error("Settings source error: {0}")]
    Source(String),
}

/// Result type for settings cache operations.
pub type Result<T> = std::result::Result<T, Error>;
