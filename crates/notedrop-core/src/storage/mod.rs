//! Persisted key-value storage.
//!
//! Cache components depend on the [`KeyValueStore`] abstraction, never on a
//! concrete browser or database API, which keeps the TTL and trust-boundary
//! logic unit-testable. Two physical areas exist:
//!
//! - **device**: scoped to the local browser instance, never synced. Holds
//!   the credential, the directory-list cache, and the per-id detail caches
//!   (these can be large and are implicitly keyed to the stored token).
//! - **profile**: synced across the user's devices. Holds the data-source
//!   order, the active set, per-source template orders, and OAuth settings.

mod memory;
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Persisted storage keys.
pub mod keys {
    /// Bearer token (device area).
    pub const TOKEN: &str = "notion_token";
    /// How the token was obtained (device area).
    pub const AUTH_METHOD: &str = "notion_auth_method";
    /// Directory-list cache blob (device area).
    pub const DATA_SOURCES_LIST_CACHE: &str = "notion_data_sources_list_cache";
    /// Per-id detail cache blobs (device area), suffixed with the id.
    pub const SELECTED_DB_CACHE_PREFIX: &str = "notion_selected_db_cache_";
    /// User-defined data-source order (profile area).
    pub const DATA_SOURCE_ORDER: &str = "notion_data_source_order";
    /// Active data-source ids (profile area).
    pub const ACTIVE_DATA_SOURCE_IDS: &str = "notion_active_data_source_ids";
    /// Whether the user ever customized the active set (profile area).
    pub const ACTIVE_SELECTION_CONFIGURED: &str = "notion_active_data_source_selection_configured";
    /// Per-source template order (profile area), suffixed with the id.
    pub const TEMPLATE_ORDER_PREFIX: &str = "notion_template_order_";
    /// OAuth client id override (profile area).
    pub const OAUTH_CLIENT_ID: &str = "notion_oauth_client_id";
    /// OAuth proxy URL override (profile area).
    pub const OAUTH_PROXY_URL: &str = "notion_oauth_proxy_url";
}

/// An asynchronous string key-value store.
///
/// Values are opaque strings; components store JSON blobs. A malformed blob
/// is always treated as cache-absent by readers, never as an error.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads a value, `None` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes a key; absent keys are not an error.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Lists all present keys.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Removes every key.
    async fn remove_all(&self) -> Result<()>;
}

/// The two storage areas every component receives.
#[derive(Clone)]
pub struct StorageAreas {
    /// Device-local area (credential and caches).
    pub device: Arc<dyn KeyValueStore>,
    /// Profile-synced area (ordering, active set, OAuth settings).
    pub profile: Arc<dyn KeyValueStore>,
}

impl StorageAreas {
    /// Creates areas over two in-memory stores (tests, ephemeral hosts).
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            device: Arc::new(MemoryStore::new()),
            profile: Arc::new(MemoryStore::new()),
        }
    }
}
