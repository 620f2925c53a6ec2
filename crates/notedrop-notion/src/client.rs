//! Authenticated HTTP gateway to the Notion REST API.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, Response};
use serde_json::Value;

use crate::error::Result;

/// Notion API version sent with every request.
pub const NOTION_VERSION: &str = "2025-09-03";

/// Base URL of the Notion REST API.
pub const NOTION_API: &str = "https://api.notion.com";

/// Thin authenticated wrapper over the Notion REST API.
///
/// Attaches the bearer token, the fixed API-version header, and a JSON
/// content type to every call. It does not interpret status codes: callers
/// decide success from the returned [`Response`]. No retries, no timeouts.
#[derive(Debug, Clone)]
pub struct NotionClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for NotionClient {
    fn default() -> Self {
        Self::new()
    }
}

impl NotionClient {
    /// Creates a client against the production Notion API.
    #[must_use]
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: NOTION_API.to_owned(),
        }
    }

    /// Creates a client against a custom base URL (used by tests).
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Issues a request against the API.
    ///
    /// `path` is resolved against the base URL unless it is already absolute.
    /// Extra headers are merged in after the defaults, so a caller can
    /// override them when it explicitly needs to.
    ///
    /// # Errors
    ///
    /// Returns an error only for transport failures; non-success statuses are
    /// returned as ordinary responses.
    pub async fn request(
        &self,
        token: &str,
        method: Method,
        path: &str,
        body: Option<&Value>,
        extra_headers: &[(&str, &str)],
    ) -> Result<Response> {
        let url = if path.starts_with("http") {
            path.to_owned()
        } else {
            format!("{}{path}", self.base_url)
        };

        let mut headers = HeaderMap::new();
        if let Ok(auth) = HeaderValue::from_str(&format!("Bearer {token}")) {
            headers.insert(AUTHORIZATION, auth);
        }
        headers.insert("Notion-Version", HeaderValue::from_static(NOTION_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in extra_headers {
            if let (Ok(name), Ok(value)) = (
                reqwest::header::HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.insert(name, value);
            }
        }

        let mut req = self.http.request(method, url).headers(headers);
        if let Some(body) = body {
            req = req.json(body);
        }
        Ok(req.send().await?)
    }

    /// Convenience GET against the API.
    ///
    /// # Errors
    ///
    /// Returns an error for transport failures.
    pub async fn get(&self, token: &str, path: &str) -> Result<Response> {
        self.request(token, Method::GET, path, None, &[]).await
    }

    /// Convenience POST with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error for transport failures.
    pub async fn post(&self, token: &str, path: &str, body: &Value) -> Result<Response> {
        self.request(token, Method::POST, path, Some(body), &[])
            .await
    }
}
