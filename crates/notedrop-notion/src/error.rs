//! Error types for Notion API operations.

/// Result type alias for Notion API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the Notion API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP transport failure (connection, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The API answered with a non-success status.
    #[error("Notion API error: {status} {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        message: String,
    },
}

impl Error {
    /// Creates an API error from a status code and response body.
    #[must_use]
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }
}
