//! Wire-level response types and shared domain types.
//!
//! The wire structs are deliberately tolerant: Notion's response shapes vary
//! between workspace generations (see the templates endpoint in particular),
//! so every field that can be absent defaults instead of failing the parse.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A data source or legacy database discovered by search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceSummary {
    /// Opaque Notion object id.
    pub id: String,
    /// Display name (falls back to "Untitled").
    pub name: String,
}

/// A page template attached to a data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Template id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Resolved icon, if any.
    #[serde(default)]
    pub icon: Option<NotionIcon>,
}

/// Normalized Notion icon variant.
///
/// The wire-level `external` and `custom_emoji` variants are folded into
/// [`NotionIcon::File`] since both only carry a URL. "No icon" is represented
/// as `Option::None` by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotionIcon {
    /// A plain emoji icon.
    Emoji {
        /// The emoji character(s).
        emoji: String,
    },
    /// A file-backed icon (uploaded, external, or custom emoji).
    File {
        /// The file reference.
        file: FileRef,
    },
}

/// URL of a file-backed icon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    /// Resolvable URL of the file.
    pub url: String,
}

/// A fragment of Notion rich text. Only the rendered text is of interest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RichText {
    /// Plain-text rendering of the fragment.
    #[serde(default)]
    pub plain_text: String,
}

/// Response of `POST /v1/search`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    /// Matched objects.
    #[serde(default)]
    pub results: Vec<SearchResult>,
    /// Whether another page of results exists.
    #[serde(default)]
    pub has_more: bool,
    /// Cursor for the next page, when `has_more`.
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// One object in a search response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResult {
    /// Object kind (`data_source`, `database`, `page`, ...).
    #[serde(default)]
    pub object: String,
    /// Object id.
    #[serde(default)]
    pub id: String,
    /// Title rich text, present on data sources and databases.
    #[serde(default)]
    pub title: Option<Vec<RichText>>,
    /// Property map, present on pages; may hold the title property.
    #[serde(default)]
    pub properties: Option<serde_json::Map<String, Value>>,
}

/// Response of `GET /v1/data_sources/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataSourceObject {
    /// Title rich text.
    #[serde(default)]
    pub title: Option<Vec<RichText>>,
    /// Raw icon object.
    #[serde(default)]
    pub icon: Option<Value>,
    /// Typed properties, in declared order.
    #[serde(default)]
    pub properties: serde_json::Map<String, Value>,
}

/// Response of `GET /v1/databases/{id}` (legacy object).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseObject {
    /// Title rich text.
    #[serde(default)]
    pub title: Option<Vec<RichText>>,
    /// Raw icon object.
    #[serde(default)]
    pub icon: Option<Value>,
    /// Typed properties, in declared order.
    #[serde(default)]
    pub properties: serde_json::Map<String, Value>,
    /// Data sources backing this database; first entry with an id is the
    /// canonical one.
    #[serde(default)]
    pub data_sources: Vec<DataSourceRef>,
}

/// Reference to a data source inside a legacy database object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataSourceRef {
    /// Data source id, when present.
    #[serde(default)]
    pub id: Option<String>,
}

/// Response of `GET /v1/data_sources/{id}/templates`.
///
/// Older workspaces answer with a `templates` array instead of `results`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplatesResponse {
    /// Template entries (modern shape).
    #[serde(default)]
    pub results: Option<Vec<TemplateEntry>>,
    /// Template entries (older shape).
    #[serde(default)]
    pub templates: Option<Vec<TemplateEntry>>,
    /// Whether another page of results exists.
    #[serde(default)]
    pub has_more: bool,
    /// Cursor for the next page, when `has_more`.
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl TemplatesResponse {
    /// Entries regardless of which field the workspace answered with.
    #[must_use]
    pub fn entries(&self) -> &[TemplateEntry] {
        self.results
            .as_deref()
            .or(self.templates.as_deref())
            .unwrap_or_default()
    }
}

/// One raw template entry from the listing endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateEntry {
    /// Template id (modern shape).
    #[serde(default)]
    pub id: Option<String>,
    /// Template id (older shape).
    #[serde(default)]
    pub template_id: Option<String>,
    /// Template name.
    #[serde(default)]
    pub name: Option<String>,
    /// Raw icon object from the listing; may be stale relative to the page.
    #[serde(default)]
    pub icon: Option<Value>,
    /// Originating page id (flat shape).
    #[serde(default)]
    pub page_id: Option<String>,
    /// Originating page (nested shape).
    #[serde(default)]
    pub page: Option<PageRef>,
}

impl TemplateEntry {
    /// Template id regardless of shape; `None` when the entry carries neither.
    #[must_use]
    pub fn template_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or(self.template_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Originating page id regardless of shape.
    #[must_use]
    pub fn page_id(&self) -> Option<&str> {
        self.page_id
            .as_deref()
            .or_else(|| self.page.as_ref().and_then(|p| p.id.as_deref()))
            .filter(|id| !id.is_empty())
    }
}

/// Reference to a page inside a template entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageRef {
    /// Page id, when present.
    #[serde(default)]
    pub id: Option<String>,
}

/// Response of `GET /v1/pages/{id}`; only the icon is of interest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageObject {
    /// Raw icon object.
    #[serde(default)]
    pub icon: Option<Value>,
}

/// Response of `POST /v1/pages`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatedPage {
    /// URL of the created page, when returned.
    #[serde(default)]
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn templates_response_accepts_both_shapes() {
        let modern: TemplatesResponse = serde_json::from_value(json!({
            "results": [{"id": "t1", "name": "Note"}],
            "has_more": false
        }))
        .unwrap();
        assert_eq!(modern.entries().len(), 1);

        let older: TemplatesResponse = serde_json::from_value(json!({
            "templates": [{"template_id": "t2"}]
        }))
        .unwrap();
        assert_eq!(older.entries()[0].template_id(), Some("t2"));
    }

    #[test]
    fn template_entry_page_id_prefers_flat_shape() {
        let entry: TemplateEntry = serde_json::from_value(json!({
            "id": "t1",
            "page_id": "p1",
            "page": {"id": "p2"}
        }))
        .unwrap();
        assert_eq!(entry.page_id(), Some("p1"));

        let nested: TemplateEntry =
            serde_json::from_value(json!({"id": "t1", "page": {"id": "p2"}})).unwrap();
        assert_eq!(nested.page_id(), Some("p2"));
    }

    #[test]
    fn icon_serializes_in_cache_shape() {
        let emoji = NotionIcon::Emoji {
            emoji: "📄".to_owned(),
        };
        assert_eq!(
            serde_json::to_value(&emoji).unwrap(),
            json!({"type": "emoji", "emoji": "📄"})
        );

        let file = NotionIcon::File {
            file: FileRef {
                url: "https://example.com/a.png".to_owned(),
            },
        };
        assert_eq!(
            serde_json::to_value(&file).unwrap(),
            json!({"type": "file", "file": {"url": "https://example.com/a.png"}})
        );
    }
}
