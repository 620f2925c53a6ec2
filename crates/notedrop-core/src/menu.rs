//! Context-menu projection and event handling.
//!
//! The menu is a projection of cached state, never a fetch trigger in itself:
//! `refresh` reads the ordered-active ids and their cached details, computes
//! the item list as pure data, then applies it through the injected
//! [`MenuSink`]. Click and shown events are decoded from the composite menu
//! ids alone, since the browser menu API surfaces nothing but the clicked id.

use std::sync::Arc;

use notedrop_notion::types::{NotionIcon, Template};
use notedrop_notion::{NotionClient, create_page};
use tracing::{debug, error};

use crate::auth::AuthStore;
use crate::capabilities::{MenuSink, Notifier, SettingsOpener};
use crate::detail::{DataSourceDetail, DetailCache};
use crate::directory::Directory;
use crate::error::Result;
use crate::template_order::TemplateOrderStore;

/// Id of the root menu entry.
pub const ROOT_MENU_ID: &str = "notion-save-root";

/// Id of the "configure" leaf shown when no data source is active.
const CONFIGURE_MENU_ID: &str = "notion-config-options";

/// Id prefix of per-data-source parent entries.
const DATA_SOURCE_MENU_PREFIX: &str = "notion-ds-";

/// Id prefix of template leaf entries.
const TEMPLATE_MENU_PREFIX: &str = "notion_tpl_";

/// Separator between the data-source and template ids in a leaf id. Notion
/// ids are UUID-shaped and cannot contain it.
const MENU_SEPARATOR: &str = "::";

/// Root title shown when no selection preview is active.
const ROOT_MENU_BASE_TITLE: &str = "Save to Notion";

/// Title of the configure leaf.
const CONFIGURE_MENU_TITLE: &str = "Configure data sources in Settings";

/// Visible-character cap for the selection preview in the root title.
const LABEL_MAX_CHARS: usize = 20;

/// Leaf glyph for templates without an emoji icon.
const TEMPLATE_GLYPH: &str = "\u{1f4c4}";

/// One entry of the projected menu, in creation order (parents first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    /// Composite menu id, decodable via [`MenuKey::decode`].
    pub id: String,
    /// Parent entry id; `None` for the root.
    pub parent_id: Option<String>,
    /// Display title.
    pub title: String,
}

/// Typed identity of a menu entry.
///
/// All id construction and parsing lives here; [`MenuKey::decode`] returns
/// `None` for anything malformed so spurious click events die quietly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuKey {
    /// The root entry.
    Root,
    /// The "configure" leaf of the empty-state menu.
    Configure,
    /// A per-data-source parent entry.
    DataSource(String),
    /// A template leaf.
    Template {
        /// Id the data source's detail is cached under.
        data_source_id: String,
        /// Template id.
        template_id: String,
    },
}

impl MenuKey {
    /// Encodes this key as a menu id.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Root => ROOT_MENU_ID.to_owned(),
            Self::Configure => CONFIGURE_MENU_ID.to_owned(),
            Self::DataSource(id) => format!("{DATA_SOURCE_MENU_PREFIX}{id}"),
            Self::Template {
                data_source_id,
                template_id,
            } => format!("{TEMPLATE_MENU_PREFIX}{data_source_id}{MENU_SEPARATOR}{template_id}"),
        }
    }

    /// Decodes a menu id back to its key; `None` for foreign or malformed ids.
    #[must_use]
    pub fn decode(id: &str) -> Option<Self> {
        if id == ROOT_MENU_ID {
            return Some(Self::Root);
        }
        if id == CONFIGURE_MENU_ID {
            return Some(Self::Configure);
        }
        if let Some(rest) = id.strip_prefix(DATA_SOURCE_MENU_PREFIX) {
            return (!rest.is_empty()).then(|| Self::DataSource(rest.to_owned()));
        }
        let rest = id.strip_prefix(TEMPLATE_MENU_PREFIX)?;
        let (data_source_id, template_id) = rest.split_once(MENU_SEPARATOR)?;
        if data_source_id.is_empty() || template_id.is_empty() {
            return None;
        }
        Some(Self::Template {
            data_source_id: data_source_id.to_owned(),
            template_id: template_id.to_owned(),
        })
    }
}

/// Collapses whitespace and caps the selection preview at
/// [`LABEL_MAX_CHARS`] visible characters, appending `...` when cut.
#[must_use]
pub fn truncate_label(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= LABEL_MAX_CHARS {
        return collapsed;
    }
    let mut cut: String = collapsed.chars().take(LABEL_MAX_CHARS).collect();
    cut.push_str("...");
    cut
}

fn template_title(template: &Template) -> String {
    match &template.icon {
        Some(NotionIcon::Emoji { emoji }) => format!("{emoji} {}", template.name),
        _ => format!("{TEMPLATE_GLYPH} {}", template.name),
    }
}

/// Projects the menu for the given details, parents before children.
///
/// A single surviving data source hangs its template leaves directly under
/// the root; with several, each gets a named parent entry under the root.
#[must_use]
pub fn project_menu(details: &[DataSourceDetail]) -> Vec<MenuItem> {
    let mut items = vec![MenuItem {
        id: MenuKey::Root.encode(),
        parent_id: None,
        title: ROOT_MENU_BASE_TITLE.to_owned(),
    }];

    let single = details.len() == 1;
    for detail in details {
        let parent_id = if single {
            MenuKey::Root.encode()
        } else {
            let id = MenuKey::DataSource(detail.id.clone()).encode();
            items.push(MenuItem {
                id: id.clone(),
                parent_id: Some(MenuKey::Root.encode()),
                title: detail.name.clone(),
            });
            id
        };
        for template in &detail.templates {
            items.push(MenuItem {
                id: MenuKey::Template {
                    data_source_id: detail.id.clone(),
                    template_id: template.id.clone(),
                }
                .encode(),
                parent_id: Some(parent_id.clone()),
                title: template_title(template),
            });
        }
    }
    items
}

/// Projects the no-data-source menu: the root plus a configure leaf.
#[must_use]
pub fn project_empty_menu() -> Vec<MenuItem> {
    vec![
        MenuItem {
            id: MenuKey::Root.encode(),
            parent_id: None,
            title: ROOT_MENU_BASE_TITLE.to_owned(),
        },
        MenuItem {
            id: MenuKey::Configure.encode(),
            parent_id: Some(MenuKey::Root.encode()),
            title: CONFIGURE_MENU_TITLE.to_owned(),
        },
    ]
}

/// The context-menu state machine over cached state.
#[derive(Clone)]
pub struct ContextMenu {
    client: NotionClient,
    auth: AuthStore,
    directory: Arc<Directory>,
    details: DetailCache,
    template_order: TemplateOrderStore,
    sink: Arc<dyn MenuSink>,
    notifier: Arc<dyn Notifier>,
    settings: Arc<dyn SettingsOpener>,
}

impl ContextMenu {
    /// Wires the menu to its stores and host capabilities.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: NotionClient,
        auth: AuthStore,
        directory: Arc<Directory>,
        details: DetailCache,
        template_order: TemplateOrderStore,
        sink: Arc<dyn MenuSink>,
        notifier: Arc<dyn Notifier>,
        settings: Arc<dyn SettingsOpener>,
    ) -> Self {
        Self {
            client,
            auth,
            directory,
            details,
            template_order,
            sink,
            notifier,
            settings,
        }
    }

    /// Rebuilds the menu from current state.
    ///
    /// Teardown is unconditional; a missing credential leaves the menu
    /// empty, an empty active set builds the configure menu, and all detail
    /// fetches failing leaves the menu cleared with no error surfaced.
    ///
    /// # Errors
    ///
    /// Returns an error if a storage operation or the menu sink fails.
    pub async fn refresh(&self) -> Result<()> {
        self.sink.remove_all().await?;

        let Some(token) = self.auth.token().await? else {
            debug!("no credential; menu left empty");
            return Ok(());
        };

        let ids = self
            .directory
            .get_ordered_data_source_ids(&token, false)
            .await?;
        if ids.is_empty() {
            return self.apply(&project_empty_menu()).await;
        }

        let fetched = futures::future::join_all(
            ids.iter()
                .map(|id| self.details.get_cached_selected_db(&token, id)),
        )
        .await;
        let mut details = Vec::new();
        for mut detail in fetched.into_iter().flatten() {
            let templates = std::mem::take(&mut detail.templates);
            detail.templates = self
                .template_order
                .sort_templates(&detail.id, templates)
                .await?;
            details.push(detail);
        }
        if details.is_empty() {
            debug!("all detail fetches failed; menu left cleared");
            return Ok(());
        }

        self.apply(&project_menu(&details)).await
    }

    async fn apply(&self, items: &[MenuItem]) -> Result<()> {
        for item in items {
            self.sink.create(item).await?;
        }
        Ok(())
    }

    /// Retitles the root with a preview of the current selection and asks
    /// the sink to refresh in place. Presentation only, no cache effect; an
    /// empty selection leaves the menu untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the menu sink fails.
    pub async fn handle_shown(&self, selection: &str) -> Result<()> {
        let label = truncate_label(selection);
        if label.is_empty() {
            return Ok(());
        }
        self.sink
            .update_title(ROOT_MENU_ID, &format!("Save '{label}' to Notion"))
            .await?;
        self.sink.refresh().await?;
        Ok(())
    }

    /// Handles a menu click.
    ///
    /// Template leaves create a page from the current selection; anything
    /// unparseable, a missing selection, a missing credential, or a cold
    /// detail cache is a silent no-op. Page-creation failure is logged and
    /// surfaced through the notifier, never retried.
    ///
    /// # Errors
    ///
    /// Returns an error if a storage read or a host capability fails.
    pub async fn handle_click(&self, menu_id: &str, selection: Option<&str>) -> Result<()> {
        match MenuKey::decode(menu_id) {
            Some(MenuKey::Configure) => {
                self.settings.open_settings().await?;
                Ok(())
            }
            Some(MenuKey::Template {
                data_source_id,
                template_id,
            }) => {
                self.create_from_selection(&data_source_id, &template_id, selection)
                    .await
            }
            _ => Ok(()),
        }
    }

    async fn create_from_selection(
        &self,
        data_source_id: &str,
        template_id: &str,
        selection: Option<&str>,
    ) -> Result<()> {
        let Some(text) = selection.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(());
        };
        let Some(token) = self.auth.token().await? else {
            return Ok(());
        };
        // the detail should be warm from the build; a miss here is a race
        // with token or cache invalidation
        let Some(detail) = self
            .details
            .get_cached_selected_db(&token, data_source_id)
            .await
        else {
            return Ok(());
        };

        match create_page(
            &self.client,
            &token,
            &detail.data_source_id,
            &detail.title_property_key,
            text,
            template_id,
        )
        .await
        {
            Ok(page) => {
                debug!(url = page.url.as_deref().unwrap_or(""), "page created");
                Ok(())
            }
            Err(err) => {
                error!(data_source_id, template_id, %err, "page creation failed");
                self.notifier
                    .notify("Notion", "Could not save the selection to Notion.")
                    .await?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{StorageAreas, keys};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum SinkEvent {
        RemoveAll,
        Create(MenuItem),
        UpdateTitle(String, String),
        Refresh,
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<SinkEvent>>,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<SinkEvent> {
            self.events.lock().unwrap().clone()
        }

        fn created(&self) -> Vec<MenuItem> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    SinkEvent::Create(item) => Some(item),
                    _ => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl MenuSink for RecordingSink {
        async fn remove_all(&self) -> anyhow::Result<()> {
            self.events.lock().unwrap().push(SinkEvent::RemoveAll);
            Ok(())
        }

        async fn create(&self, item: &MenuItem) -> anyhow::Result<()> {
            self.events
                .lock()
                .unwrap()
                .push(SinkEvent::Create(item.clone()));
            Ok(())
        }

        async fn update_title(&self, id: &str, title: &str) -> anyhow::Result<()> {
            self.events
                .lock()
                .unwrap()
                .push(SinkEvent::UpdateTitle(id.to_owned(), title.to_owned()));
            Ok(())
        }

        async fn refresh(&self) -> anyhow::Result<()> {
            self.events.lock().unwrap().push(SinkEvent::Refresh);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSettings {
        opened: Mutex<usize>,
    }

    #[async_trait]
    impl SettingsOpener for RecordingSettings {
        async fn open_settings(&self) -> anyhow::Result<()> {
            *self.opened.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        messages: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, _title: &str, message: &str) -> anyhow::Result<()> {
            self.messages.lock().unwrap().push(message.to_owned());
            Ok(())
        }
    }

    struct Fixture {
        menu: ContextMenu,
        storage: StorageAreas,
        sink: Arc<RecordingSink>,
        settings: Arc<RecordingSettings>,
        notifier: Arc<RecordingNotifier>,
    }

    fn fixture(server: &MockServer) -> Fixture {
        let storage = StorageAreas::in_memory();
        let client = NotionClient::with_base_url(server.uri());
        let directory = Arc::new(Directory::new(client.clone(), storage.clone()));
        let details = DetailCache::new(client.clone(), storage.clone(), directory.clone());
        let sink = Arc::new(RecordingSink::default());
        let settings = Arc::new(RecordingSettings::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let menu = ContextMenu::new(
            client,
            AuthStore::new(storage.clone()),
            directory,
            details,
            TemplateOrderStore::new(storage.clone()),
            sink.clone(),
            notifier.clone(),
            settings.clone(),
        );
        Fixture {
            menu,
            storage,
            sink,
            settings,
            notifier,
        }
    }

    async fn seed_detail(storage: &StorageAreas, id: &str, name: &str, templates: &[(&str, &str)]) {
        let blob = json!({
            "id": id,
            "dataSourceId": id,
            "name": name,
            "icon": null,
            "titlePropertyKey": "Name",
            "templates": templates
                .iter()
                .map(|(tid, tname)| json!({"id": tid, "name": tname, "icon": null}))
                .collect::<Vec<_>>(),
            "ts": chrono::Utc::now().timestamp_millis(),
        });
        storage
            .device
            .set(
                &format!("{}{id}", keys::SELECTED_DB_CACHE_PREFIX),
                &blob.to_string(),
            )
            .await
            .unwrap();
    }

    async fn seed_directory(storage: &StorageAreas, ids: &[&str]) {
        let sources: Vec<_> = ids
            .iter()
            .map(|id| json!({"id": id, "name": id.to_uppercase()}))
            .collect();
        let blob = json!({"ts": chrono::Utc::now().timestamp_millis(), "sources": sources});
        storage
            .device
            .set(keys::DATA_SOURCES_LIST_CACHE, &blob.to_string())
            .await
            .unwrap();
    }

    #[test]
    fn menu_key_round_trips() {
        for key in [
            MenuKey::Root,
            MenuKey::Configure,
            MenuKey::DataSource("ds1".to_owned()),
            MenuKey::Template {
                data_source_id: "ds1".to_owned(),
                template_id: "t1".to_owned(),
            },
        ] {
            assert_eq!(MenuKey::decode(&key.encode()), Some(key));
        }
    }

    #[test]
    fn menu_key_rejects_malformed_ids() {
        assert_eq!(MenuKey::decode("someone-elses-menu"), None);
        assert_eq!(MenuKey::decode("notion_tpl_no-separator"), None);
        assert_eq!(MenuKey::decode("notion_tpl_::t1"), None);
        assert_eq!(MenuKey::decode("notion_tpl_ds1::"), None);
        assert_eq!(MenuKey::decode("notion-ds-"), None);
    }

    #[test]
    fn truncate_label_collapses_and_caps() {
        assert_eq!(truncate_label("  hello   world  "), "hello world");
        assert_eq!(truncate_label(""), "");
        assert_eq!(
            truncate_label("a very long selection indeed"),
            "a very long selectio..."
        );
    }

    #[test]
    fn single_source_hangs_leaves_under_root() {
        let detail = DataSourceDetail {
            id: "ds1".to_owned(),
            data_source_id: "ds1".to_owned(),
            name: "Notes".to_owned(),
            icon: None,
            title_property_key: "Name".to_owned(),
            templates: vec![
                Template {
                    id: "t1".to_owned(),
                    name: "Note".to_owned(),
                    icon: Some(NotionIcon::Emoji {
                        emoji: "🔥".to_owned(),
                    }),
                },
                Template {
                    id: "t2".to_owned(),
                    name: "Task".to_owned(),
                    icon: None,
                },
            ],
        };

        let items = project_menu(&[detail]);
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].id, ROOT_MENU_ID);
        assert_eq!(items[1].parent_id.as_deref(), Some(ROOT_MENU_ID));
        assert_eq!(items[1].title, "🔥 Note");
        assert_eq!(items[2].title, "📄 Task");
    }

    #[test]
    fn multiple_sources_get_named_parents() {
        let detail = |id: &str, name: &str| DataSourceDetail {
            id: id.to_owned(),
            data_source_id: id.to_owned(),
            name: name.to_owned(),
            icon: None,
            title_property_key: "Name".to_owned(),
            templates: vec![Template {
                id: "t1".to_owned(),
                name: "Note".to_owned(),
                icon: None,
            }],
        };

        let items = project_menu(&[detail("ds1", "Notes"), detail("ds2", "Tasks")]);
        assert_eq!(items[1].id, "notion-ds-ds1");
        assert_eq!(items[1].title, "Notes");
        assert_eq!(items[2].parent_id.as_deref(), Some("notion-ds-ds1"));
        assert_eq!(items[2].id, "notion_tpl_ds1::t1");
        assert_eq!(items[3].id, "notion-ds-ds2");
    }

    #[tokio::test]
    async fn refresh_without_token_only_clears() {
        let server = MockServer::start().await;
        let fx = fixture(&server);
        fx.menu.refresh().await.unwrap();
        assert_eq!(fx.sink.events(), vec![SinkEvent::RemoveAll]);
    }

    #[tokio::test]
    async fn refresh_with_no_active_sources_builds_configure_menu() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/search"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"results": [], "has_more": false})),
            )
            .mount(&server)
            .await;

        let fx = fixture(&server);
        fx.storage.device.set(keys::TOKEN, "tok").await.unwrap();
        fx.menu.refresh().await.unwrap();

        let created = fx.sink.created();
        assert_eq!(created.len(), 2);
        assert_eq!(created[1].id, CONFIGURE_MENU_ID);
    }

    #[tokio::test]
    async fn refresh_builds_from_cached_state_and_applies_template_order() {
        let server = MockServer::start().await;
        let fx = fixture(&server);
        fx.storage.device.set(keys::TOKEN, "tok").await.unwrap();
        seed_directory(&fx.storage, &["ds1"]).await;
        seed_detail(&fx.storage, "ds1", "Notes", &[("t1", "Note"), ("t2", "Task")]).await;
        fx.storage
            .profile
            .set(
                &format!("{}ds1", keys::TEMPLATE_ORDER_PREFIX),
                r#"["t2","t1"]"#,
            )
            .await
            .unwrap();

        fx.menu.refresh().await.unwrap();
        let created = fx.sink.created();
        assert_eq!(created.len(), 3);
        assert_eq!(created[1].id, "notion_tpl_ds1::t2");
        assert_eq!(created[2].id, "notion_tpl_ds1::t1");
        // the projection ran from cache only
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn shown_event_retitles_root_and_refreshes_in_place() {
        let server = MockServer::start().await;
        let fx = fixture(&server);
        fx.menu.handle_shown("  buy   milk  ").await.unwrap();
        assert_eq!(
            fx.sink.events(),
            vec![
                SinkEvent::UpdateTitle(
                    ROOT_MENU_ID.to_owned(),
                    "Save 'buy milk' to Notion".to_owned()
                ),
                SinkEvent::Refresh,
            ]
        );
    }

    #[tokio::test]
    async fn shown_event_with_blank_selection_leaves_menu_untouched() {
        let server = MockServer::start().await;
        let fx = fixture(&server);
        fx.menu.handle_shown("   ").await.unwrap();
        fx.menu.handle_shown("").await.unwrap();
        assert!(fx.sink.events().is_empty());
    }

    #[tokio::test]
    async fn configure_click_opens_settings() {
        let server = MockServer::start().await;
        let fx = fixture(&server);
        fx.menu.handle_click(CONFIGURE_MENU_ID, None).await.unwrap();
        assert_eq!(*fx.settings.opened.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn template_click_creates_page_with_resolved_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/pages"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"url": "https://notion.so/p1"})),
            )
            .mount(&server)
            .await;

        let fx = fixture(&server);
        fx.storage.device.set(keys::TOKEN, "tok").await.unwrap();
        seed_detail(&fx.storage, "ds1", "Notes", &[("t1", "Note")]).await;

        fx.menu
            .handle_click("notion_tpl_ds1::t1", Some("buy milk"))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let body: serde_json::Value = requests[0].body_json().unwrap();
        assert_eq!(body["parent"]["data_source_id"], "ds1");
        assert_eq!(
            body["properties"]["Name"]["title"][0]["text"]["content"],
            "buy milk"
        );
        assert_eq!(body["template"]["template_id"], "t1");
        assert!(fx.notifier.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn template_click_without_selection_is_a_noop() {
        let server = MockServer::start().await;
        let fx = fixture(&server);
        fx.storage.device.set(keys::TOKEN, "tok").await.unwrap();
        seed_detail(&fx.storage, "ds1", "Notes", &[("t1", "Note")]).await;

        fx.menu
            .handle_click("notion_tpl_ds1::t1", Some("   "))
            .await
            .unwrap();
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn page_creation_failure_notifies_and_does_not_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/pages"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "bad"})))
            .mount(&server)
            .await;

        let fx = fixture(&server);
        fx.storage.device.set(keys::TOKEN, "tok").await.unwrap();
        seed_detail(&fx.storage, "ds1", "Notes", &[("t1", "Note")]).await;

        fx.menu
            .handle_click("notion_tpl_ds1::t1", Some("buy milk"))
            .await
            .unwrap();
        assert_eq!(fx.notifier.messages.lock().unwrap().len(), 1);
    }
}
