//! Per-data-source detail cache.
//!
//! A detail record resolves everything page creation and menu building need
//! about one data source: its canonical id, display name, icon, title
//! property, and template list. Records are cached wholesale with a
//! timestamp; the read path applies a trust boundary (an entry with zero
//! templates is more likely a previous partial failure than ground truth and
//! is refetched) and every failure on the fetch path collapses to "detail
//! unavailable now" rather than an error.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use notedrop_notion::types::{
    DataSourceObject, DatabaseObject, NotionIcon, PageObject, Template, TemplatesResponse,
};
use notedrop_notion::{NotionClient, parse};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::directory::Directory;
use crate::error::{Error, Result};
use crate::ids::normalize_ids;
use crate::storage::{StorageAreas, keys};

/// Detail-cache TTL. Effectively no auto-expiration; user refresh controls
/// updates.
const DETAIL_CACHE_TTL_MS: i64 = i64::MAX;

/// Concurrent page-icon fetches per batch during template enrichment.
const ICON_BATCH_SIZE: usize = 4;

/// Resolved metadata and templates for one data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceDetail {
    /// The originally requested identifier (may be a legacy database id).
    pub id: String,
    /// Canonical data-source id used for all subsequent API calls.
    #[serde(default)]
    pub data_source_id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Icon, if any.
    #[serde(default)]
    pub icon: Option<NotionIcon>,
    /// Key of the property of type `title`; always names a real property.
    #[serde(default)]
    pub title_property_key: String,
    /// Templates, deduplicated by id, discovery order before user reorder.
    #[serde(default)]
    pub templates: Vec<Template>,
}

/// The slice of a detail record UI surfaces consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    /// Requested identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Icon, if any.
    pub icon: Option<NotionIcon>,
    /// Templates in discovery order.
    pub templates: Vec<Template>,
}

/// Persisted cache blob: the detail plus its write timestamp.
#[derive(Debug, Serialize, Deserialize)]
struct CachedDetail {
    #[serde(flatten)]
    detail: DataSourceDetail,
    ts: i64,
}

/// Outcome of detail resolution, before templates are attached.
struct ResolvedDetail {
    data_source_id: String,
    name: String,
    icon: Option<NotionIcon>,
    title_property_key: String,
}

/// A template entry before icon enrichment.
struct RawTemplate {
    id: String,
    name: String,
    icon: Option<NotionIcon>,
    page_id: Option<String>,
}

/// Cache of resolved data-source details keyed by requested id.
#[derive(Clone)]
pub struct DetailCache {
    client: NotionClient,
    storage: StorageAreas,
    directory: Arc<Directory>,
    cache_ttl_ms: i64,
}

impl DetailCache {
    /// Creates a cache over the given gateway, storage, and directory.
    #[must_use]
    pub fn new(client: NotionClient, storage: StorageAreas, directory: Arc<Directory>) -> Self {
        Self {
            client,
            storage,
            directory,
            cache_ttl_ms: DETAIL_CACHE_TTL_MS,
        }
    }

    /// Overrides the cache TTL (used by tests).
    #[must_use]
    pub const fn with_cache_ttl_ms(mut self, ttl_ms: i64) -> Self {
        self.cache_ttl_ms = ttl_ms;
        self
    }

    fn cache_key(id: &str) -> String {
        format!("{}{id}", keys::SELECTED_DB_CACHE_PREFIX)
    }

    /// Reads the cached detail for an id, refreshing when it is absent,
    /// expired, for a different id, or structurally empty.
    ///
    /// An entry within TTL but with zero templates is explicitly distrusted:
    /// it triggers a refetch instead of being returned as-is. Missing name
    /// and canonical-id fields are default-filled on the way out. `None`
    /// means "detail unavailable now", never "no such data source".
    pub async fn get_cached_selected_db(&self, token: &str, id: &str) -> Option<DataSourceDetail> {
        let raw = match self.storage.device.get(&Self::cache_key(id)).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(id, %err, "detail cache read failed; treating as miss");
                None
            }
        };

        if let Some(raw) = raw
            && let Ok(cached) = serde_json::from_str::<CachedDetail>(&raw)
            && cached.detail.id == id
            && Utc::now().timestamp_millis().saturating_sub(cached.ts) < self.cache_ttl_ms
        {
            if cached.detail.templates.is_empty() {
                // zero templates is more likely a failed fetch than truth
                return self.fetch_and_cache_selected_db(token, id).await;
            }
            let mut detail = cached.detail;
            if detail.name.is_empty() {
                detail.name = parse::UNTITLED.to_owned();
            }
            if detail.data_source_id.is_empty() {
                detail.data_source_id = detail.id.clone();
            }
            return Some(detail);
        }

        self.fetch_and_cache_selected_db(token, id).await
    }

    /// Resolves full detail for an id, caches it with a fresh timestamp, and
    /// returns it.
    ///
    /// On any failure anywhere in the chain this returns `None` and leaves
    /// any prior cache entry untouched.
    pub async fn fetch_and_cache_selected_db(
        &self,
        token: &str,
        id: &str,
    ) -> Option<DataSourceDetail> {
        match self.fetch_detail(token, id).await {
            Ok(detail) => Some(detail),
            Err(err) => {
                warn!(id, %err, "detail fetch failed");
                None
            }
        }
    }

    async fn fetch_detail(&self, token: &str, id: &str) -> Result<DataSourceDetail> {
        let resolved = self.resolve_detail(token, id).await?;
        let templates = self
            .list_templates(token, &resolved.data_source_id)
            .await;

        // pagination overlap can repeat ids; keep the first-seen record
        let mut unique: Vec<Template> = Vec::with_capacity(templates.len());
        for template in templates {
            if !unique.iter().any(|t| t.id == template.id) {
                unique.push(template);
            }
        }

        let detail = DataSourceDetail {
            id: id.to_owned(),
            data_source_id: resolved.data_source_id,
            name: resolved.name,
            icon: resolved.icon,
            title_property_key: resolved.title_property_key,
            templates: unique,
        };

        let blob = serde_json::to_string(&CachedDetail {
            detail: detail.clone(),
            ts: Utc::now().timestamp_millis(),
        })?;
        self.storage
            .device
            .set(&Self::cache_key(id), &blob)
            .await?;
        debug!(id, templates = detail.templates.len(), "detail cached");
        Ok(detail)
    }

    /// Resolves name, icon, title-property key, and the canonical
    /// data-source id, trying the modern endpoint first and falling back to
    /// the legacy database object.
    async fn resolve_detail(&self, token: &str, id: &str) -> Result<ResolvedDetail> {
        let res = self
            .client
            .get(token, &format!("/v1/data_sources/{id}"))
            .await
            .map_err(Error::from)?;
        if res.status().is_success() {
            let data_source: DataSourceObject =
                res.json().await.map_err(notedrop_notion::Error::from)?;
            let title_property_key = parse::title_property_key(&data_source.properties)
                .ok_or_else(|| Error::NoTitleProperty(id.to_owned()))?;
            return Ok(ResolvedDetail {
                data_source_id: id.to_owned(),
                name: parse::title_or_untitled(data_source.title.as_deref()),
                icon: parse::parse_icon(data_source.icon.as_ref()),
                title_property_key,
            });
        }

        let res = self
            .client
            .get(token, &format!("/v1/databases/{id}"))
            .await
            .map_err(Error::from)?;
        if !res.status().is_success() {
            return Err(Error::DetailFetch {
                id: id.to_owned(),
                status: res.status().as_u16(),
            });
        }

        let database: DatabaseObject = res.json().await.map_err(notedrop_notion::Error::from)?;
        // bridge the legacy object to the modern model: the first listed
        // data source is canonical, the requested id is the last resort
        let data_source_id = database
            .data_sources
            .iter()
            .find_map(|d| d.id.clone())
            .unwrap_or_else(|| id.to_owned());
        let title_property_key = parse::title_property_key(&database.properties)
            .ok_or_else(|| Error::NoTitleProperty(id.to_owned()))?;
        Ok(ResolvedDetail {
            data_source_id,
            name: parse::title_or_untitled(database.title.as_deref()),
            icon: parse::parse_icon(database.icon.as_ref()),
            title_property_key,
        })
    }

    /// Lists a data source's templates with icons enriched from their pages.
    ///
    /// Template absence is never fatal to selection: every failure path here
    /// collapses to an empty list.
    async fn list_templates(&self, token: &str, data_source_id: &str) -> Vec<Template> {
        match self.templates_for_id(token, data_source_id).await {
            Ok(Some(raw)) => self.enrich_icons(token, raw).await,
            Ok(None) => {
                // the endpoint rejected the id; it may be a legacy database
                match self.legacy_data_source_id(token, data_source_id).await {
                    Some(fallback_id) => {
                        match self.templates_for_id(token, &fallback_id).await {
                            Ok(Some(raw)) => self.enrich_icons(token, raw).await,
                            Ok(None) => Vec::new(),
                            Err(err) => {
                                warn!(data_source_id, %err, "template fallback failed");
                                Vec::new()
                            }
                        }
                    }
                    None => Vec::new(),
                }
            }
            Err(err) => {
                warn!(data_source_id, %err, "template listing failed");
                Vec::new()
            }
        }
    }

    /// Resolves the underlying data-source id of a legacy database, if any.
    async fn legacy_data_source_id(&self, token: &str, id: &str) -> Option<String> {
        let res = self
            .client
            .get(token, &format!("/v1/databases/{id}"))
            .await
            .ok()?;
        if !res.status().is_success() {
            return None;
        }
        let database: DatabaseObject = res.json().await.ok()?;
        database.data_sources.iter().find_map(|d| d.id.clone())
    }

    /// Pages through the templates endpoint; `Ok(None)` on a non-ok status
    /// so the caller can try the legacy fallback.
    async fn templates_for_id(
        &self,
        token: &str,
        id: &str,
    ) -> Result<Option<Vec<RawTemplate>>> {
        let mut all = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let path = cursor.as_ref().map_or_else(
                || format!("/v1/data_sources/{id}/templates"),
                |c| format!("/v1/data_sources/{id}/templates?start_cursor={c}"),
            );
            let res = self.client.get(token, &path).await.map_err(Error::from)?;
            if !res.status().is_success() {
                return Ok(None);
            }

            let data: TemplatesResponse =
                res.json().await.map_err(notedrop_notion::Error::from)?;
            for entry in data.entries() {
                let Some(template_id) = entry.template_id() else {
                    continue;
                };
                all.push(RawTemplate {
                    id: template_id.to_owned(),
                    name: entry
                        .name
                        .clone()
                        .filter(|n| !n.is_empty())
                        .unwrap_or_else(|| parse::UNTITLED.to_owned()),
                    icon: parse::parse_icon(entry.icon.as_ref()),
                    page_id: entry.page_id().map(str::to_owned),
                });
            }

            if !data.has_more {
                return Ok(Some(all));
            }
            match data.next_cursor {
                Some(next) => cursor = Some(next),
                None => return Ok(Some(all)),
            }
        }
    }

    /// Second icon pass: the template's live page icon takes precedence over
    /// the listing icon, which is sometimes stale or absent. Bounded to
    /// batches of [`ICON_BATCH_SIZE`] concurrent fetches.
    async fn enrich_icons(&self, token: &str, raw: Vec<RawTemplate>) -> Vec<Template> {
        let mut enriched = Vec::with_capacity(raw.len());
        for batch in raw.chunks(ICON_BATCH_SIZE) {
            let resolved = join_all(batch.iter().map(|template| async {
                let page_id = template.page_id.as_deref().unwrap_or(&template.id);
                let page_icon = self.page_icon(token, page_id).await;
                Template {
                    id: template.id.clone(),
                    name: template.name.clone(),
                    icon: page_icon.or_else(|| template.icon.clone()),
                }
            }))
            .await;
            enriched.extend(resolved);
        }
        enriched
    }

    /// Fetches a page's icon, absorbing every failure into `None`.
    async fn page_icon(&self, token: &str, page_id: &str) -> Option<NotionIcon> {
        let res = self
            .client
            .get(token, &format!("/v1/pages/{page_id}"))
            .await
            .ok()?;
        if !res.status().is_success() {
            return None;
        }
        let page: PageObject = res.json().await.ok()?;
        parse::parse_icon(page.icon.as_ref())
    }

    /// Projects one id's detail to the UI slice, honoring force-refresh.
    pub async fn get_database_info(
        &self,
        token: &str,
        id: &str,
        force_refresh: bool,
    ) -> Option<DatabaseInfo> {
        let cached = if force_refresh {
            self.fetch_and_cache_selected_db(token, id).await
        } else {
            self.get_cached_selected_db(token, id).await
        }?;
        Some(DatabaseInfo {
            id: cached.id,
            name: cached.name,
            icon: cached.icon,
            templates: cached.templates,
        })
    }

    /// Resolves detail for every ordered-active data source, in parallel,
    /// dropping any that is unavailable: the UI never sees a broken entry,
    /// only a shorter list.
    ///
    /// # Errors
    ///
    /// Returns an error if directory discovery or a storage operation fails.
    pub async fn get_all_database_infos(
        &self,
        token: &str,
        force_refresh: bool,
    ) -> Result<Vec<DatabaseInfo>> {
        let ordered_ids = self
            .directory
            .get_ordered_data_source_ids(token, force_refresh)
            .await?;
        let infos = join_all(
            ordered_ids
                .iter()
                .map(|id| self.get_database_info(token, id, force_refresh)),
        )
        .await;
        Ok(infos.into_iter().flatten().collect())
    }

    /// Removes the directory cache and every per-id detail entry.
    ///
    /// Triggered on explicit hard-sync and on token changes.
    ///
    /// # Errors
    ///
    /// Returns an error if a storage operation fails.
    pub async fn clear_notion_caches(&self) -> Result<()> {
        let all_keys = self.storage.device.keys().await?;
        for key in all_keys {
            if key == keys::DATA_SOURCES_LIST_CACHE
                || key.starts_with(keys::SELECTED_DB_CACHE_PREFIX)
            {
                self.storage.device.remove(&key).await?;
            }
        }
        debug!("notion caches cleared");
        Ok(())
    }

    /// Removes only the named detail entries.
    ///
    /// Triggered when data sources are deactivated, so a later reactivation
    /// fetches fresh data instead of serving a stale record.
    ///
    /// # Errors
    ///
    /// Returns an error if a storage operation fails.
    pub async fn clear_selected_db_caches(&self, ids: &[String]) -> Result<()> {
        for id in normalize_ids(ids) {
            self.storage.device.remove(&Self::cache_key(&id)).await?;
        }
        Ok(())
    }
}
