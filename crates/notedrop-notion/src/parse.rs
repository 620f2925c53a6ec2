//! Pure parsers for heterogeneous Notion object shapes.
//!
//! Search results, data sources, and legacy databases all carry their display
//! title differently, and icons come in four wire variants. These helpers
//! flatten that variance into plain strings and [`NotionIcon`].

use serde_json::Value;

use crate::types::{FileRef, NotionIcon, RichText, SearchResult};

/// Fallback title used whenever an object has no usable title text.
pub const UNTITLED: &str = "Untitled";

/// Joins rich-text fragments into a trimmed plain string.
#[must_use]
pub fn plain_text(rich: &[RichText]) -> String {
    rich.iter()
        .map(|t| t.plain_text.as_str())
        .collect::<String>()
        .trim()
        .to_owned()
}

/// Joins rich-text fragments, falling back to [`UNTITLED`] when empty.
#[must_use]
pub fn title_or_untitled(rich: Option<&[RichText]>) -> String {
    let joined = rich.map(plain_text).unwrap_or_default();
    if joined.is_empty() {
        UNTITLED.to_owned()
    } else {
        joined
    }
}

/// Extracts a display title from a search result.
///
/// Data sources and databases carry a top-level `title` array; pages bury
/// theirs inside the property of type `title`. Falls back to [`UNTITLED`].
#[must_use]
pub fn display_title(result: &SearchResult) -> String {
    if let Some(title) = &result.title {
        let joined = plain_text(title);
        if !joined.is_empty() {
            return joined;
        }
    }
    if let Some(props) = &result.properties {
        for prop in props.values() {
            if prop.get("type").and_then(Value::as_str) == Some("title")
                && let Some(fragments) = prop.get("title").and_then(Value::as_array)
            {
                let joined: String = fragments
                    .iter()
                    .filter_map(|t| t.get("plain_text").and_then(Value::as_str))
                    .collect();
                let joined = joined.trim();
                if !joined.is_empty() {
                    return joined.to_owned();
                }
            }
        }
    }
    UNTITLED.to_owned()
}

/// Finds the key of the first property of type `title`, in declared order.
#[must_use]
pub fn title_property_key(properties: &serde_json::Map<String, Value>) -> Option<String> {
    properties
        .iter()
        .find(|(_, prop)| prop.get("type").and_then(Value::as_str) == Some("title"))
        .map(|(key, _)| key.clone())
}

/// Normalizes a raw icon object into a [`NotionIcon`].
///
/// `external` and `custom_emoji` fold into [`NotionIcon::File`] since both
/// only carry a URL. Anything unrecognized is `None`.
#[must_use]
pub fn parse_icon(raw: Option<&Value>) -> Option<NotionIcon> {
    let icon = raw?.as_object()?;
    let kind = icon.get("type").and_then(Value::as_str)?;
    match kind {
        "emoji" => {
            let emoji = icon.get("emoji").and_then(Value::as_str)?;
            (!emoji.is_empty()).then(|| NotionIcon::Emoji {
                emoji: emoji.to_owned(),
            })
        }
        "file" | "external" | "custom_emoji" => {
            let url = icon.get(kind)?.get("url").and_then(Value::as_str)?;
            (!url.is_empty()).then(|| NotionIcon::File {
                file: FileRef {
                    url: url.to_owned(),
                },
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rich(parts: &[&str]) -> Vec<RichText> {
        parts
            .iter()
            .map(|p| RichText {
                plain_text: (*p).to_owned(),
            })
            .collect()
    }

    #[test]
    fn plain_text_joins_and_trims() {
        assert_eq!(plain_text(&rich(&[" My ", "Notes "])), "My Notes");
        assert_eq!(plain_text(&[]), "");
    }

    #[test]
    fn display_title_prefers_top_level_title() {
        let result: SearchResult = serde_json::from_value(json!({
            "object": "data_source",
            "id": "ds1",
            "title": [{"plain_text": "Reading List"}]
        }))
        .unwrap();
        assert_eq!(display_title(&result), "Reading List");
    }

    #[test]
    fn display_title_falls_back_to_title_property() {
        let result: SearchResult = serde_json::from_value(json!({
            "object": "page",
            "id": "p1",
            "properties": {
                "Tags": {"type": "multi_select"},
                "Name": {"type": "title", "title": [{"plain_text": "Clipped"}]}
            }
        }))
        .unwrap();
        assert_eq!(display_title(&result), "Clipped");
    }

    #[test]
    fn display_title_defaults_to_untitled() {
        let result: SearchResult =
            serde_json::from_value(json!({"object": "database", "id": "db1", "title": []}))
                .unwrap();
        assert_eq!(display_title(&result), UNTITLED);
    }

    #[test]
    fn title_property_key_takes_first_in_declared_order() {
        let props: serde_json::Map<String, Value> = serde_json::from_value(json!({
            "Status": {"type": "status"},
            "Name": {"type": "title"},
            "Alias": {"type": "title"}
        }))
        .unwrap();
        assert_eq!(title_property_key(&props).as_deref(), Some("Name"));

        let none: serde_json::Map<String, Value> =
            serde_json::from_value(json!({"Status": {"type": "status"}})).unwrap();
        assert_eq!(title_property_key(&none), None);
    }

    #[test]
    fn parse_icon_handles_all_variants() {
        assert_eq!(
            parse_icon(Some(&json!({"type": "emoji", "emoji": "🔥"}))),
            Some(NotionIcon::Emoji {
                emoji: "🔥".to_owned()
            })
        );
        let as_file = |url: &str| {
            Some(NotionIcon::File {
                file: FileRef {
                    url: url.to_owned(),
                },
            })
        };
        assert_eq!(
            parse_icon(Some(&json!({"type": "file", "file": {"url": "https://a/f.png"}}))),
            as_file("https://a/f.png")
        );
        assert_eq!(
            parse_icon(Some(
                &json!({"type": "external", "external": {"url": "https://a/e.png"}})
            )),
            as_file("https://a/e.png")
        );
        assert_eq!(
            parse_icon(Some(
                &json!({"type": "custom_emoji", "custom_emoji": {"url": "https://a/c.png"}})
            )),
            as_file("https://a/c.png")
        );
    }

    #[test]
    fn parse_icon_rejects_malformed_input() {
        assert_eq!(parse_icon(None), None);
        assert_eq!(parse_icon(Some(&json!(null))), None);
        assert_eq!(parse_icon(Some(&json!("emoji"))), None);
        assert_eq!(parse_icon(Some(&json!({"type": "emoji"}))), None);
        assert_eq!(parse_icon(Some(&json!({"type": "file", "file": {}}))), None);
        assert_eq!(parse_icon(Some(&json!({"type": "sticker"}))), None);
    }
}
