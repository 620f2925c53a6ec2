//! Error types for the OAuth sign-in flow.

/// Result type alias for OAuth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can abort the sign-in flow.
///
/// All of these are fatal to the flow and surfaced as user-facing messages;
/// none is retried automatically.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Client id is not configured.
    #[error("Notion Client ID is missing in Settings.")]
    MissingClientId,

    /// Proxy URL is not configured.
    #[error("OAuth proxy URL is missing in Settings.")]
    MissingProxyUrl,

    /// Proxy origin is not on the allow-list.
    #[error("OAuth proxy is not allowed.")]
    UntrustedProxy,

    /// Callback state did not match the issued state.
    #[error("Invalid OAuth state.")]
    StateMismatch,

    /// The provider reported an error on the callback.
    #[error("Notion OAuth error: {0}")]
    Provider(String),

    /// The callback carried no authorization code.
    #[error("No authorization code was received.")]
    MissingCode,

    /// The proxy rejected the exchange or returned no token.
    #[error("OAuth exchange failed: {0}")]
    Exchange(String),

    /// The exchange did not complete within the bounded wait.
    #[error("OAuth exchange timed out after {0} seconds")]
    Timeout(u64),

    /// The interactive browser hop failed or was canceled.
    #[error("Sign-in was canceled or blocked: {0}")]
    Launch(String),
}
