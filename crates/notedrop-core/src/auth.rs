//! Credential and auth-method persistence.
//!
//! Every cache in the system is implicitly keyed to "whatever token is
//! currently stored": changing the token resets the directory-list cache
//! here, and the command layer wipes the per-id detail caches alongside.

use std::fmt;
use std::str::FromStr;

use notedrop_oauth::{DEFAULT_CLIENT_ID, DEFAULT_PROXY_URL};
use tracing::debug;

use crate::Result;
use crate::storage::{StorageAreas, keys};

/// How the stored token was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// Integration token pasted by the user.
    Token,
    /// OAuth sign-in.
    OAuth,
}

impl AuthMethod {
    /// Persisted string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::OAuth => "oauth",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "token" => Ok(Self::Token),
            "oauth" => Ok(Self::OAuth),
            _ => Err(()),
        }
    }
}

/// Persisted OAuth settings with compiled-in defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthSettings {
    /// OAuth client id.
    pub client_id: String,
    /// Token-exchange proxy URL.
    pub proxy_url: String,
}

/// Credential, auth-method, and OAuth-settings store.
#[derive(Clone)]
pub struct AuthStore {
    storage: StorageAreas,
}

impl AuthStore {
    /// Creates a store over the given areas.
    #[must_use]
    pub fn new(storage: StorageAreas) -> Self {
        Self { storage }
    }

    /// Reads the stored bearer token; blank counts as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub async fn token(&self) -> Result<Option<String>> {
        let raw = self.storage.device.get(keys::TOKEN).await?;
        Ok(raw
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty()))
    }

    /// Stores or clears the bearer token.
    ///
    /// The token is trimmed and an empty value removes it. The directory-list
    /// cache is reset in the same operation, since a different credential
    /// sees a different set of data sources.
    ///
    /// # Errors
    ///
    /// Returns an error if a storage write fails.
    pub async fn set_token(&self, token: Option<&str>) -> Result<()> {
        let normalized = token.map(str::trim).unwrap_or_default();
        if normalized.is_empty() {
            self.storage.device.remove(keys::TOKEN).await?;
        } else {
            self.storage.device.set(keys::TOKEN, normalized).await?;
        }
        self.storage
            .device
            .remove(keys::DATA_SOURCES_LIST_CACHE)
            .await?;
        debug!(cleared = normalized.is_empty(), "token updated");
        Ok(())
    }

    /// Reads the stored auth method; unknown values count as unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub async fn auth_method(&self) -> Result<Option<AuthMethod>> {
        let raw = self.storage.device.get(keys::AUTH_METHOD).await?;
        Ok(raw.and_then(|m| m.parse().ok()))
    }

    /// Stores or clears the auth method.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage write fails.
    pub async fn set_auth_method(&self, method: Option<AuthMethod>) -> Result<()> {
        match method {
            Some(method) => {
                self.storage
                    .device
                    .set(keys::AUTH_METHOD, method.as_str())
                    .await
            }
            None => self.storage.device.remove(keys::AUTH_METHOD).await,
        }
    }

    /// Reads OAuth settings, falling back to the compiled-in defaults for
    /// blank or absent values.
    ///
    /// # Errors
    ///
    /// Returns an error if a storage read fails.
    pub async fn oauth_settings(&self) -> Result<OAuthSettings> {
        let stored_client_id = self.storage.profile.get(keys::OAUTH_CLIENT_ID).await?;
        let stored_proxy_url = self.storage.profile.get(keys::OAUTH_PROXY_URL).await?;
        let pick = |stored: Option<String>, default: &str| {
            stored
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_owned())
        };
        Ok(OAuthSettings {
            client_id: pick(stored_client_id, DEFAULT_CLIENT_ID),
            proxy_url: pick(stored_proxy_url, DEFAULT_PROXY_URL),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> AuthStore {
        AuthStore::new(StorageAreas::in_memory())
    }

    #[tokio::test]
    async fn token_round_trip_trims() {
        let auth = store();
        assert_eq!(auth.token().await.unwrap(), None);

        auth.set_token(Some("  secret  ")).await.unwrap();
        assert_eq!(auth.token().await.unwrap().as_deref(), Some("secret"));
    }

    #[tokio::test]
    async fn blank_token_clears() {
        let auth = store();
        auth.set_token(Some("secret")).await.unwrap();
        auth.set_token(Some("   ")).await.unwrap();
        assert_eq!(auth.token().await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_token_resets_directory_cache() {
        let areas = StorageAreas::in_memory();
        areas
            .device
            .set(keys::DATA_SOURCES_LIST_CACHE, "{\"ts\":1,\"sources\":[]}")
            .await
            .unwrap();
        let auth = AuthStore::new(areas.clone());

        auth.set_token(Some("secret")).await.unwrap();
        assert_eq!(
            areas.device.get(keys::DATA_SOURCES_LIST_CACHE).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn auth_method_rejects_unknown_values() {
        let areas = StorageAreas::in_memory();
        areas.device.set(keys::AUTH_METHOD, "magic").await.unwrap();
        let auth = AuthStore::new(areas);
        assert_eq!(auth.auth_method().await.unwrap(), None);
    }

    #[tokio::test]
    async fn auth_method_round_trips() {
        let auth = store();
        auth.set_auth_method(Some(AuthMethod::OAuth)).await.unwrap();
        assert_eq!(auth.auth_method().await.unwrap(), Some(AuthMethod::OAuth));

        auth.set_auth_method(None).await.unwrap();
        assert_eq!(auth.auth_method().await.unwrap(), None);
    }

    #[tokio::test]
    async fn oauth_settings_fall_back_to_defaults() {
        let auth = store();
        let settings = auth.oauth_settings().await.unwrap();
        assert_eq!(settings.client_id, DEFAULT_CLIENT_ID);
        assert_eq!(settings.proxy_url, DEFAULT_PROXY_URL);
    }

    #[tokio::test]
    async fn oauth_settings_use_stored_overrides() {
        let areas = StorageAreas::in_memory();
        areas
            .profile
            .set(keys::OAUTH_CLIENT_ID, "my-client")
            .await
            .unwrap();
        areas
            .profile
            .set(keys::OAUTH_PROXY_URL, " http://localhost:3000/api ")
            .await
            .unwrap();
        let auth = AuthStore::new(areas);

        let settings = auth.oauth_settings().await.unwrap();
        assert_eq!(settings.client_id, "my-client");
        assert_eq!(settings.proxy_url, "http://localhost:3000/api");
    }
}
