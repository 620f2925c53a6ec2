//! Authorization-URL construction, callback validation, and code exchange.

use std::time::Duration;

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

/// Compiled-in default OAuth client id, used when none is configured.
pub const DEFAULT_CLIENT_ID: &str = "305d872b-594c-805b-bbc6-0037cc398635";

/// Compiled-in default token-exchange proxy, used when none is configured.
pub const DEFAULT_PROXY_URL: &str = "https://my-notion-list.vercel.app/api/notion-token";

/// Notion's authorization endpoint.
const AUTHORIZE_URL: &str = "https://api.notion.com/v1/oauth/authorize";

/// Bounded wait for the code-for-token exchange, in seconds.
const EXCHANGE_TIMEOUT_SECS: u64 = 30;

/// Localhost origins allowed for development proxies.
const DEV_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:5173"];

/// OAuth configuration resolved from persisted settings plus defaults.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// Notion OAuth client id.
    pub client_id: String,
    /// Token-exchange proxy URL.
    pub proxy_url: String,
    /// Redirect URI registered for the extension.
    pub redirect_uri: String,
}

/// Generates a random `state` value for CSRF protection.
#[must_use]
pub fn generate_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Origins a proxy may live on by default: the compiled-in proxy's origin
/// plus the localhost dev origins.
fn default_trusted_origins() -> Vec<String> {
    let mut origins: Vec<String> = DEV_ORIGINS.iter().map(|o| (*o).to_owned()).collect();
    if let Ok(default) = Url::parse(DEFAULT_PROXY_URL) {
        origins.insert(0, default.origin().ascii_serialization());
    }
    origins
}

fn is_trusted_with(raw_url: &str, trusted_origins: &[String]) -> bool {
    let Ok(url) = Url::parse(raw_url) else {
        return false;
    };
    match url.scheme() {
        "https" => {}
        // http is only acceptable toward the loopback host
        "http" => {
            if !matches!(url.host_str(), Some("localhost" | "127.0.0.1")) {
                return false;
            }
        }
        _ => return false,
    }
    let origin = url.origin().ascii_serialization();
    trusted_origins.iter().any(|o| *o == origin)
}

/// Checks whether a proxy URL may receive an authorization code.
///
/// Only https (or http to the loopback host) is accepted, and the origin
/// must be the default proxy's origin or a localhost dev origin. This is the
/// security boundary: a code is never sent to an origin outside this set.
#[must_use]
pub fn is_trusted_proxy_url(raw_url: &str) -> bool {
    is_trusted_with(raw_url, &default_trusted_origins())
}

/// Shape of the proxy's exchange response.
#[derive(Debug, Deserialize, Default)]
struct ExchangeResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// The proxy-based sign-in flow.
#[derive(Debug, Clone)]
pub struct SignInFlow {
    http: reqwest::Client,
    config: OAuthConfig,
    trusted_origins: Vec<String>,
}

impl SignInFlow {
    /// Creates a flow from a resolved configuration.
    #[must_use]
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            trusted_origins: default_trusted_origins(),
        }
    }

    /// Replaces the trusted-origin allow-list (used by tests).
    #[must_use]
    pub fn with_trusted_origins(mut self, origins: Vec<String>) -> Self {
        self.trusted_origins = origins;
        self
    }

    /// Builds the authorization URL for the interactive consent page.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingClientId`] when no client id is configured.
    pub fn authorization_url(&self, state: &str) -> Result<Url> {
        if self.config.client_id.is_empty() {
            return Err(Error::MissingClientId);
        }
        let mut url = Url::parse(AUTHORIZE_URL)?;
        url.query_pairs_mut()
            .append_pair("owner", "user")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("state", state);
        Ok(url)
    }

    /// Validates the callback URL and extracts the authorization code.
    ///
    /// # Errors
    ///
    /// Returns an error when the state does not match, the provider reported
    /// an error, or no code is present.
    pub fn validate_callback(callback_url: &str, expected_state: &str) -> Result<String> {
        let parsed = Url::parse(callback_url)?;
        let param = |name: &str| {
            parsed
                .query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
        };

        match param("state") {
            Some(state) if state == expected_state => {}
            _ => return Err(Error::StateMismatch),
        }
        if let Some(err) = param("error") {
            return Err(Error::Provider(err));
        }
        param("code")
            .filter(|c| !c.is_empty())
            .ok_or(Error::MissingCode)
    }

    /// Exchanges the authorization code for an access token via the proxy.
    ///
    /// The only network call in the system with a bounded wait: the request
    /// is abandoned after [`EXCHANGE_TIMEOUT_SECS`].
    ///
    /// # Errors
    ///
    /// Fails fast, before any request is issued, when the proxy URL is
    /// missing or its origin is untrusted. Otherwise fails on transport
    /// errors, timeout, a non-success status, or a missing token.
    pub async fn exchange_code(&self, code: &str) -> Result<String> {
        let proxy_url = self.config.proxy_url.as_str();
        if proxy_url.is_empty() {
            return Err(Error::MissingProxyUrl);
        }
        if !is_trusted_with(proxy_url, &self.trusted_origins) {
            return Err(Error::UntrustedProxy);
        }

        let body = json!({
            "code": code,
            "redirect_uri": self.config.redirect_uri,
        });
        let request = self.http.post(proxy_url).json(&body).send();
        let res = tokio::time::timeout(Duration::from_secs(EXCHANGE_TIMEOUT_SECS), request)
            .await
            .map_err(|_| Error::Timeout(EXCHANGE_TIMEOUT_SECS))??;

        let status = res.status();
        let data: ExchangeResponse = res.json().await.unwrap_or_default();
        if !status.is_success() {
            return Err(Error::Exchange(
                data.error.unwrap_or_else(|| status.to_string()),
            ));
        }
        let token = data
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Exchange("proxy did not return access_token".to_owned()))?;
        debug!("exchanged authorization code for access token");
        Ok(token)
    }
}
