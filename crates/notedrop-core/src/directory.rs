//! Data-source directory: discovery, ordering, and the active set.
//!
//! Discovery walks the search endpoint with cursor pagination and a
//! three-tier query fallback, caching the resulting listing. On top of the
//! listing sit two persisted user choices: a sparse ordering and an opt-out
//! active set.

use chrono::Utc;
use notedrop_notion::types::{DataSourceSummary, SearchResponse};
use notedrop_notion::{NotionClient, parse};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::Result;
use crate::ids::{normalize_ids, sort_ids_by_order};
use crate::storage::{StorageAreas, keys};

/// Directory-list cache TTL. Effectively no auto-expiration; user refresh
/// controls updates.
const DIRECTORY_CACHE_TTL_MS: i64 = i64::MAX;

/// Page size for search requests.
const SEARCH_PAGE_SIZE: u32 = 100;

/// Persisted directory cache blob.
#[derive(Debug, Serialize, Deserialize)]
struct DirectoryCache {
    ts: i64,
    sources: Vec<DataSourceSummary>,
}

/// The set of data sources reachable by the current credential, plus the
/// user's persisted ordering and active selection over them.
#[derive(Clone)]
pub struct Directory {
    client: NotionClient,
    storage: StorageAreas,
    cache_ttl_ms: i64,
}

impl Directory {
    /// Creates a directory over the given gateway and storage areas.
    #[must_use]
    pub fn new(client: NotionClient, storage: StorageAreas) -> Self {
        Self {
            client,
            storage,
            cache_ttl_ms: DIRECTORY_CACHE_TTL_MS,
        }
    }

    /// Overrides the listing-cache TTL (used by tests).
    #[must_use]
    pub const fn with_cache_ttl_ms(mut self, ttl_ms: i64) -> Self {
        self.cache_ttl_ms = ttl_ms;
        self
    }

    /// Lists all data sources and legacy databases the credential can reach.
    ///
    /// Unless forced, a cached unexpired listing is returned verbatim.
    /// Otherwise the search endpoint is queried with three payload shapes in
    /// order, stopping at the first that yields any results: unfiltered,
    /// filtered to `data_source`, filtered to `database`. Different
    /// integration generations expose objects differently under the same
    /// call, hence the fallback. Whichever path produced the result, it is
    /// cached with a fresh timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a storage failure. A non-ok
    /// search response merely ends that query's pagination.
    pub async fn search_data_sources(
        &self,
        token: &str,
        force_refresh: bool,
    ) -> Result<Vec<DataSourceSummary>> {
        if !force_refresh && let Some(cached) = self.cached_listing().await? {
            return Ok(cached);
        }

        let mut sources: Vec<DataSourceSummary> = Vec::new();
        let filters: [Option<&str>; 3] = [None, Some("data_source"), Some("database")];
        for filter in filters {
            self.run_search_query(token, filter, &mut sources).await?;
            if !sources.is_empty() {
                break;
            }
        }

        let blob = serde_json::to_string(&DirectoryCache {
            ts: Utc::now().timestamp_millis(),
            sources: sources.clone(),
        })?;
        self.storage
            .device
            .set(keys::DATA_SOURCES_LIST_CACHE, &blob)
            .await?;
        debug!(count = sources.len(), "directory listing refreshed");
        Ok(sources)
    }

    /// Reads the cached listing if present, parseable, and unexpired.
    async fn cached_listing(&self) -> Result<Option<Vec<DataSourceSummary>>> {
        let Some(raw) = self.storage.device.get(keys::DATA_SOURCES_LIST_CACHE).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<DirectoryCache>(&raw) {
            Ok(cached)
                if Utc::now().timestamp_millis().saturating_sub(cached.ts)
                    < self.cache_ttl_ms =>
            {
                Ok(Some(cached.sources))
            }
            Ok(_) => Ok(None),
            Err(_) => {
                // malformed cache counts as absent
                Ok(None)
            }
        }
    }

    /// Follows one search payload through its cursor pages, deduplicating by
    /// object id and keeping the first-seen name.
    async fn run_search_query(
        &self,
        token: &str,
        filter: Option<&str>,
        sources: &mut Vec<DataSourceSummary>,
    ) -> Result<()> {
        let mut cursor: Option<String> = None;
        loop {
            let mut body: Value = json!({ "page_size": SEARCH_PAGE_SIZE });
            if let Some(filter) = filter {
                body["filter"] = json!({ "property": "object", "value": filter });
            }
            if let Some(cursor) = &cursor {
                body["start_cursor"] = json!(cursor);
            }

            let res = self.client.post(token, "/v1/search", &body).await?;
            if !res.status().is_success() {
                warn!(status = res.status().as_u16(), ?filter, "search query failed");
                return Ok(());
            }

            let data: SearchResponse = res.json().await.map_err(notedrop_notion::Error::from)?;
            for result in &data.results {
                if result.object != "data_source" && result.object != "database" {
                    continue;
                }
                if sources.iter().any(|s| s.id == result.id) {
                    continue;
                }
                sources.push(DataSourceSummary {
                    id: result.id.clone(),
                    name: parse::display_title(result),
                });
            }

            if !data.has_more {
                return Ok(());
            }
            match data.next_cursor {
                Some(next) => cursor = Some(next),
                None => return Ok(()),
            }
        }
    }

    /// Reads the persisted data-source order.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub async fn data_source_order(&self) -> Result<Vec<String>> {
        let raw = self.storage.profile.get(keys::DATA_SOURCE_ORDER).await?;
        let order: Vec<String> = raw
            .and_then(|r| serde_json::from_str(&r).ok())
            .unwrap_or_default();
        Ok(normalize_ids(order))
    }

    /// Persists the data-source order, normalized.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage write fails.
    pub async fn set_data_source_order(&self, order: &[String]) -> Result<()> {
        let normalized = normalize_ids(order);
        let blob = serde_json::to_string(&normalized)?;
        self.storage
            .profile
            .set(keys::DATA_SOURCE_ORDER, &blob)
            .await
    }

    /// Reads the stored active ids; `None` when never written.
    async fn stored_active_ids(&self) -> Result<Option<Vec<String>>> {
        let raw = self
            .storage
            .profile
            .get(keys::ACTIVE_DATA_SOURCE_IDS)
            .await?;
        Ok(raw
            .and_then(|r| serde_json::from_str::<Vec<String>>(&r).ok())
            .map(normalize_ids))
    }

    /// Whether the user ever explicitly customized the active set.
    async fn selection_configured(&self) -> Result<bool> {
        let raw = self
            .storage
            .profile
            .get(keys::ACTIVE_SELECTION_CONFIGURED)
            .await?;
        Ok(raw.and_then(|r| serde_json::from_str::<bool>(&r).ok()) == Some(true))
    }

    /// Persists the active set and the configured flag.
    ///
    /// `configured = false` marks a default-cache-warm rather than a user
    /// action, so first-run behavior stays "everything on".
    ///
    /// # Errors
    ///
    /// Returns an error if a storage write fails.
    pub async fn set_active_data_source_ids(
        &self,
        ids: &[String],
        configured: bool,
    ) -> Result<()> {
        let normalized = normalize_ids(ids);
        let blob = serde_json::to_string(&normalized)?;
        self.storage
            .profile
            .set(keys::ACTIVE_DATA_SOURCE_IDS, &blob)
            .await?;
        self.storage
            .profile
            .set(
                keys::ACTIVE_SELECTION_CONFIGURED,
                if configured { "true" } else { "false" },
            )
            .await
    }

    /// Resolves the active subset of the available ids.
    ///
    /// While the selection is unconfigured, every available id is active and
    /// the set is persisted without flipping the configured flag. Once
    /// configured, the stored set is intersected with the available ids and
    /// pruned entries are persisted away, so a disabled source stays sticky
    /// across discovery changes.
    ///
    /// # Errors
    ///
    /// Returns an error if a storage operation fails.
    pub async fn get_active_data_source_ids(&self, available: &[String]) -> Result<Vec<String>> {
        let available = normalize_ids(available);
        let stored = self.stored_active_ids().await?;
        let configured = self.selection_configured().await?;

        if !configured {
            self.set_active_data_source_ids(&available, false).await?;
            return Ok(available);
        }

        let Some(stored) = stored else {
            // configured but never written: distinct from an empty selection
            self.set_active_data_source_ids(&available, true).await?;
            return Ok(available);
        };

        let active: Vec<String> = stored
            .iter()
            .filter(|id| available.contains(id))
            .cloned()
            .collect();
        if active != stored {
            self.set_active_data_source_ids(&active, true).await?;
        }
        Ok(active)
    }

    /// Composes discovery, persisted order, and the active set into the
    /// ordered-active id sequence.
    ///
    /// Discovered ids are sorted by the persisted order; when the sorted
    /// sequence differs from the stored order (new or vanished ids) the
    /// corrected order is persisted, which is how new sources append and
    /// removed ones drop out without user action. Filtering to active ids
    /// happens after sorting so ordering stays stable as activity toggles.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery or a storage operation fails.
    pub async fn get_ordered_data_source_ids(
        &self,
        token: &str,
        force_refresh: bool,
    ) -> Result<Vec<String>> {
        let sources = self.search_data_sources(token, force_refresh).await?;
        let source_ids = normalize_ids(sources.iter().map(|s| s.id.as_str()));
        let saved_order = self.data_source_order().await?;
        let sorted = sort_ids_by_order(&source_ids, &saved_order);

        if sorted != saved_order {
            self.set_data_source_order(&sorted).await?;
        }

        let active = self.get_active_data_source_ids(&sorted).await?;
        Ok(sorted.into_iter().filter(|id| active.contains(id)).collect())
    }
}
