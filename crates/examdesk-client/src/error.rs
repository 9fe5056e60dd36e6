//! Client error types.

use thiserror::Error;

/// Client error type.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error code from server.
        code: String,
        /// Error message from server.
        message: String,
    },

    /// The server rejected the credential (401 or 403).
    #[error("Authentication rejected ({status}): {message}")]
    Auth {
        /// HTTP status code, 401 or 403.
        status: u16,
        /// Error message from server.
        message: String,
    },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The server answered 2xx but the payload reports failure.
    #[error("Unsuccessful response: {0}")]
    Unsuccessful(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification of a failed request.
///
/// Callers decide policy on this rather than on individual variants: only
/// [`FaultKind::AuthRejected`] proves a credential is invalid, everything
/// else is a delivery problem that may go away on retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// HTTP 401 or 403.
    AuthRejected,
    /// Any other non-success HTTP status.
    Status(u16),
    /// The request did not complete within its timeout.
    Timeout,
    /// The server could not be reached (DNS, refused, reset during connect).
    Unreachable,
    /// Malformed payloads, bad URLs, and anything else.
    Other,
}

impl Error {
    /// Classify this error.
    pub fn fault_kind(&self) -> FaultKind {
        match self {
            Error::Auth { .. } => FaultKind::AuthRejected,
            Error::Api { status, .. } if *status == 401 || *status == 403 => {
                FaultKind::AuthRejected
            }
            Error::Api { status, .. } => FaultKind::Status(*status),
            Error::NotFound(_) => FaultKind::Status(404),
            Error::Http(e) if e.is_timeout() => FaultKind::Timeout,
            Error::Http(e) if e.is_connect() => FaultKind::Unreachable,
            Error::Http(e) => match e.status() {
                Some(status) if status.as_u16() == 401 || status.as_u16() == 403 => {
                    FaultKind::AuthRejected
                }
                Some(status) => FaultKind::Status(status.as_u16()),
                None => FaultKind::Other,
            },
            _ => FaultKind::Other,
        }
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_)) || matches!(self, Error::Api { status: 404, .. })
    }

    /// Check if the server rejected the credential.
    pub fn is_auth_error(&self) -> bool {
        self.fault_kind() == FaultKind::AuthRejected
    }

    /// Check if the request timed out.
    pub fn is_timeout(&self) -> bool {
        self.fault_kind() == FaultKind::Timeout
    }

    /// Check if this is a server error.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Api { status, .. } if *status >= 500)
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error response from the server.
///
/// The backend is not consistent about field names, so everything is optional.
#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, alias = "error", alias = "detail")]
    pub message: Option<String>,
}
