//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Notion API operation failed.
    #[error("Notion error: {0}")]
    Notion(#[from] notedrop_notion::Error),

    /// OAuth flow failed.
    #[error(transparent)]
    OAuth(#[from] notedrop_oauth::Error),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A host capability (menu, notifier, auth hop) failed.
    #[error("Host capability error: {0}")]
    Host(#[from] anyhow::Error),

    /// The object has no property of type `title`.
    ///
    /// Treated as a data integrity problem, never silently defaulted.
    #[error("No title property in data source {0}")]
    NoTitleProperty(String),

    /// Neither the data-source nor the legacy-database fetch succeeded.
    #[error("Database/Data source {id}: {status}")]
    DetailFetch {
        /// The requested identifier.
        id: String,
        /// HTTP status of the final (legacy) attempt.
        status: u16,
    },
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
