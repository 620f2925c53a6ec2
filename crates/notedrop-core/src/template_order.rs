//! Per-data-source template ordering.
//!
//! Order lives in the profile area so it follows the user across devices,
//! unlike the device-local caches it reorders.

use notedrop_notion::Template;

use crate::Result;
use crate::ids::normalize_ids;
use crate::storage::{StorageAreas, keys};

/// Store for the user's per-data-source template order.
#[derive(Clone)]
pub struct TemplateOrderStore {
    storage: StorageAreas,
}

impl TemplateOrderStore {
    /// Creates a store over the given areas.
    #[must_use]
    pub fn new(storage: StorageAreas) -> Self {
        Self { storage }
    }

    fn order_key(data_source_id: &str) -> String {
        format!("{}{data_source_id}", keys::TEMPLATE_ORDER_PREFIX)
    }

    /// Reads the stored template order for a data source. Absent or
    /// malformed entries count as "no preference".
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub async fn template_order(&self, data_source_id: &str) -> Result<Vec<String>> {
        let raw = self
            .storage
            .profile
            .get(&Self::order_key(data_source_id))
            .await?;
        Ok(raw
            .and_then(|blob| serde_json::from_str::<Vec<String>>(&blob).ok())
            .unwrap_or_default())
    }

    /// Persists a template order for a data source, normalized.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage write fails.
    pub async fn set_template_order(
        &self,
        data_source_id: &str,
        template_ids: &[String],
    ) -> Result<()> {
        let blob = serde_json::to_string(&normalize_ids(template_ids))?;
        self.storage
            .profile
            .set(&Self::order_key(data_source_id), &blob)
            .await
    }

    /// Applies a data source's stored order to its templates.
    ///
    /// An empty stored order leaves discovery order untouched. Otherwise
    /// ordered templates come first in stored order and unordered ones keep
    /// their relative discovery order after them.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub async fn sort_templates(
        &self,
        data_source_id: &str,
        templates: Vec<Template>,
    ) -> Result<Vec<Template>> {
        let order = self.template_order(data_source_id).await?;
        if order.is_empty() {
            return Ok(templates);
        }
        let mut sorted = templates;
        sorted.sort_by_key(|t| {
            order
                .iter()
                .position(|id| *id == t.id)
                .unwrap_or(usize::MAX)
        });
        Ok(sorted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(id: &str) -> Template {
        Template {
            id: id.to_owned(),
            name: id.to_uppercase(),
            icon: None,
        }
    }

    fn ids(templates: &[Template]) -> Vec<&str> {
        templates.iter().map(|t| t.id.as_str()).collect()
    }

    #[tokio::test]
    async fn order_round_trips_normalized() {
        let store = TemplateOrderStore::new(StorageAreas::in_memory());
        store
            .set_template_order("ds1", &["t2".to_owned(), " t1 ".to_owned(), "t2".to_owned()])
            .await
            .unwrap();
        assert_eq!(
            store.template_order("ds1").await.unwrap(),
            vec!["t2".to_owned(), "t1".to_owned()]
        );
    }

    #[tokio::test]
    async fn empty_order_keeps_discovery_order() {
        let store = TemplateOrderStore::new(StorageAreas::in_memory());
        let sorted = store
            .sort_templates("ds1", vec![template("b"), template("a")])
            .await
            .unwrap();
        assert_eq!(ids(&sorted), vec!["b", "a"]);
    }

    #[tokio::test]
    async fn stored_order_wins_and_unordered_trail() {
        let store = TemplateOrderStore::new(StorageAreas::in_memory());
        store
            .set_template_order("ds1", &["c".to_owned(), "a".to_owned()])
            .await
            .unwrap();

        let sorted = store
            .sort_templates(
                "ds1",
                vec![template("a"), template("b"), template("c"), template("d")],
            )
            .await
            .unwrap();
        assert_eq!(ids(&sorted), vec!["c", "a", "b", "d"]);
    }

    #[tokio::test]
    async fn orders_are_scoped_per_data_source() {
        let store = TemplateOrderStore::new(StorageAreas::in_memory());
        store
            .set_template_order("ds1", &["b".to_owned()])
            .await
            .unwrap();

        let other = store
            .sort_templates("ds2", vec![template("a"), template("b")])
            .await
            .unwrap();
        assert_eq!(ids(&other), vec!["a", "b"]);
    }
}
