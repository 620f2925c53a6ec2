//! Command router: the message surface UI surfaces talk to.
//!
//! Commands arrive as tagged JSON messages and answer with a JSON value, so
//! a host can route them straight off its messaging channel. Read commands
//! absorb failures into empty defaults; mutating commands rebuild the menu
//! before responding and answer `{ok: false, error}` on failure.

use std::collections::HashSet;
use std::sync::Arc;

use notedrop_notion::NotionClient;
use notedrop_oauth::{OAuthConfig, SignInFlow, generate_state};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use crate::auth::{AuthMethod, AuthStore};
use crate::capabilities::{AuthFlowLauncher, MenuSink, Notifier, SettingsOpener};
use crate::detail::DetailCache;
use crate::directory::Directory;
use crate::error::Result;
use crate::ids::normalize_ids;
use crate::menu::ContextMenu;
use crate::storage::StorageAreas;
use crate::template_order::TemplateOrderStore;

/// Sign-in failure message when the user backed out of the consent page.
const OAUTH_CANCELED_MESSAGE: &str = "Sign-in canceled.";

/// Sign-in failure message for everything else.
const OAUTH_FAILED_MESSAGE: &str = "Could not sign in to Notion. Check OAuth configuration.";

/// A message from a UI surface.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    /// Store or clear the integration token.
    SetToken {
        /// New token; `None` or blank clears it.
        token: Option<String>,
    },
    /// Read the stored token.
    GetToken,
    /// Read how the stored token was obtained.
    GetAuthMethod,
    /// Read the redirect URI the host registered for OAuth.
    GetOauthRedirectUri,
    /// Run the interactive OAuth sign-in.
    StartOauth,
    /// Rebuild the context menu.
    RefreshMenu,
    /// Wipe every Notion cache and rebuild the menu.
    HardSync,
    /// Open the settings surface.
    OpenOptions,
    /// List every reachable data source plus the active-id set.
    GetDatabases,
    /// Resolve the active-id set against the current listing.
    GetActiveDataSourceIds,
    /// Replace the active-id set.
    SetActiveDataSourceIds {
        /// Requested active ids; filtered to discovered ids.
        ids: Vec<String>,
    },
    /// Read the persisted data-source order.
    GetDataSourceOrder,
    /// Replace the persisted data-source order.
    SetDataSourceOrder {
        /// New order.
        order: Vec<String>,
    },
    /// Resolve detail for every ordered-active data source.
    GetAllDatabaseInfos {
        /// Bypass caches when set.
        #[serde(default, rename = "forceRefresh")]
        force_refresh: bool,
    },
    /// Resolve detail for one data source.
    GetDatabaseInfo {
        /// Data source (or legacy database) id.
        #[serde(rename = "databaseId")]
        database_id: String,
        /// Bypass caches when set.
        #[serde(default, rename = "forceRefresh")]
        force_refresh: bool,
    },
    /// Replace one data source's template order.
    SetTemplateOrder {
        /// Data source id.
        #[serde(rename = "databaseId")]
        database_id: String,
        /// New order.
        #[serde(default)]
        order: Vec<String>,
    },
    /// Read one data source's template order.
    GetTemplateOrder {
        /// Data source id.
        #[serde(rename = "databaseId")]
        database_id: String,
    },
}

/// The assembled service behind the command surface.
#[derive(Clone)]
pub struct Service {
    auth: AuthStore,
    directory: Arc<Directory>,
    details: DetailCache,
    template_order: TemplateOrderStore,
    menu: ContextMenu,
    settings: Arc<dyn SettingsOpener>,
    launcher: Arc<dyn AuthFlowLauncher>,
}

impl Service {
    /// Wires the full service from storage areas and host capabilities.
    #[must_use]
    pub fn new(
        client: NotionClient,
        storage: StorageAreas,
        sink: Arc<dyn MenuSink>,
        notifier: Arc<dyn Notifier>,
        settings: Arc<dyn SettingsOpener>,
        launcher: Arc<dyn AuthFlowLauncher>,
    ) -> Self {
        let auth = AuthStore::new(storage.clone());
        let directory = Arc::new(Directory::new(client.clone(), storage.clone()));
        let details = DetailCache::new(client.clone(), storage.clone(), directory.clone());
        let template_order = TemplateOrderStore::new(storage);
        let menu = ContextMenu::new(
            client,
            auth.clone(),
            directory.clone(),
            details.clone(),
            template_order.clone(),
            sink,
            notifier,
            settings.clone(),
        );
        Self {
            auth,
            directory,
            details,
            template_order,
            menu,
            settings,
            launcher,
        }
    }

    /// The context menu, for wiring host menu events.
    #[must_use]
    pub const fn menu(&self) -> &ContextMenu {
        &self.menu
    }

    /// Handles one command, always answering with a JSON value.
    pub async fn handle(&self, command: Command) -> Value {
        match command {
            Command::SetToken { token } => {
                ok_or_flag(self.set_token(token.as_deref()).await)
            }
            Command::GetToken => match self.auth.token().await {
                Ok(token) => json!({"token": token}),
                Err(err) => absorbed(&err, json!({"token": null})),
            },
            Command::GetAuthMethod => match self.auth.auth_method().await {
                Ok(method) => {
                    json!({"method": method.map_or("", AuthMethod::as_str)})
                }
                Err(err) => absorbed(&err, json!({"method": ""})),
            },
            Command::GetOauthRedirectUri => {
                json!({"redirectUri": self.launcher.redirect_uri()})
            }
            Command::StartOauth => match self.start_oauth().await {
                Ok(()) => json!({"ok": true}),
                Err(message) => json!({"ok": false, "error": message}),
            },
            Command::RefreshMenu => ok_or_flag(self.menu.refresh().await),
            Command::HardSync => ok_or_flag(self.hard_sync().await),
            Command::OpenOptions => {
                ok_or_flag(self.settings.open_settings().await.map_err(Into::into))
            }
            Command::GetDatabases => match self.list_databases().await {
                Ok(response) => response,
                Err(err) => absorbed(&err, json!({"databases": []})),
            },
            Command::GetActiveDataSourceIds => match self.active_ids().await {
                Ok(active) => json!({"activeIds": active}),
                Err(err) => absorbed(&err, json!({"activeIds": []})),
            },
            Command::SetActiveDataSourceIds { ids } => {
                match self.set_active_ids(&ids).await {
                    Ok(active) => json!({"ok": true, "activeIds": active}),
                    Err(err) => absorbed(&err, json!({"ok": false})),
                }
            }
            Command::GetDataSourceOrder => match self.directory.data_source_order().await {
                Ok(order) => json!({"order": order}),
                Err(err) => absorbed(&err, json!({"order": []})),
            },
            Command::SetDataSourceOrder { order } => {
                ok_or_flag(self.set_order(&order).await)
            }
            Command::GetAllDatabaseInfos { force_refresh } => {
                match self.all_database_infos(force_refresh).await {
                    Ok(databases) => json!({"databases": databases}),
                    Err(err) => absorbed(&err, json!({"databases": []})),
                }
            }
            Command::GetDatabaseInfo {
                database_id,
                force_refresh,
            } => match self.auth.token().await {
                Ok(Some(token)) => {
                    let info = self
                        .details
                        .get_database_info(&token, &database_id, force_refresh)
                        .await;
                    json!({"database": info})
                }
                Ok(None) => json!({"database": null}),
                Err(err) => absorbed(&err, json!({"database": null})),
            },
            Command::SetTemplateOrder { database_id, order } => {
                ok_or_flag(self.set_template_order(&database_id, &order).await)
            }
            Command::GetTemplateOrder { database_id } => {
                match self.template_order.template_order(&database_id).await {
                    Ok(order) => json!({"order": order}),
                    Err(err) => absorbed(&err, json!({"order": []})),
                }
            }
        }
    }

    async fn set_token(&self, token: Option<&str>) -> Result<()> {
        let method = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|_| AuthMethod::Token);
        self.auth.set_token(token).await?;
        self.auth.set_auth_method(method).await?;
        self.menu.refresh().await
    }

    async fn start_oauth(&self) -> std::result::Result<(), String> {
        let settings = self
            .auth
            .oauth_settings()
            .await
            .map_err(|_| OAUTH_FAILED_MESSAGE.to_owned())?;
        let flow = SignInFlow::new(OAuthConfig {
            client_id: settings.client_id,
            proxy_url: settings.proxy_url,
            redirect_uri: self.launcher.redirect_uri(),
        });

        let state = generate_state();
        let auth_url = flow
            .authorization_url(&state)
            .map_err(|err| err.to_string())?;
        let callback = self
            .launcher
            .launch(auth_url.as_str())
            .await
            .map_err(|err| oauth_error_message(&err.to_string()))?;
        let code = SignInFlow::validate_callback(&callback, &state)
            .map_err(|err| err.to_string())?;
        let token = flow
            .exchange_code(&code)
            .await
            .map_err(|err| err.to_string())?;

        let finish = async {
            self.auth.set_token(Some(&token)).await?;
            self.auth.set_auth_method(Some(AuthMethod::OAuth)).await?;
            self.menu.refresh().await
        };
        finish.await.map_err(|_| OAUTH_FAILED_MESSAGE.to_owned())
    }

    async fn hard_sync(&self) -> Result<()> {
        self.details.clear_notion_caches().await?;
        self.menu.refresh().await
    }

    async fn list_databases(&self) -> Result<Value> {
        let Some(token) = self.auth.token().await? else {
            return Ok(json!({"databases": []}));
        };
        let sources = self.directory.search_data_sources(&token, false).await?;
        let all_ids: Vec<String> = sources.iter().map(|s| s.id.clone()).collect();
        let active = self.directory.get_active_data_source_ids(&all_ids).await?;
        Ok(json!({"databases": sources, "activeIds": active}))
    }

    async fn active_ids(&self) -> Result<Vec<String>> {
        let Some(token) = self.auth.token().await? else {
            return Ok(Vec::new());
        };
        let sources = self.directory.search_data_sources(&token, false).await?;
        let all_ids: Vec<String> = sources.iter().map(|s| s.id.clone()).collect();
        self.directory.get_active_data_source_ids(&all_ids).await
    }

    /// Activates exactly the requested ids that actually exist, clears the
    /// detail caches of the ones this deactivates, and rebuilds the menu.
    async fn set_active_ids(&self, requested: &[String]) -> Result<Vec<String>> {
        let requested = normalize_ids(requested);
        let Some(token) = self.auth.token().await? else {
            // no listing to validate against; persist as-is
            self.directory
                .set_active_data_source_ids(&requested, true)
                .await?;
            return Ok(requested);
        };

        let sources = self.directory.search_data_sources(&token, false).await?;
        let all_ids: Vec<String> = sources.iter().map(|s| s.id.clone()).collect();
        let allowed: HashSet<&str> = all_ids.iter().map(String::as_str).collect();
        let next_active: Vec<String> = requested
            .into_iter()
            .filter(|id| allowed.contains(id.as_str()))
            .collect();

        let prev_active = self.directory.get_active_data_source_ids(&all_ids).await?;
        let next_set: HashSet<&str> = next_active.iter().map(String::as_str).collect();
        let disabled: Vec<String> = prev_active
            .into_iter()
            .filter(|id| !next_set.contains(id.as_str()))
            .collect();

        self.directory
            .set_active_data_source_ids(&next_active, true)
            .await?;
        self.details.clear_selected_db_caches(&disabled).await?;
        self.menu.refresh().await?;
        Ok(next_active)
    }

    async fn set_order(&self, order: &[String]) -> Result<()> {
        self.directory.set_data_source_order(order).await?;
        self.menu.refresh().await
    }

    async fn all_database_infos(&self, force_refresh: bool) -> Result<Value> {
        let Some(token) = self.auth.token().await? else {
            return Ok(json!([]));
        };
        let infos = self
            .details
            .get_all_database_infos(&token, force_refresh)
            .await?;
        Ok(serde_json::to_value(infos)?)
    }

    async fn set_template_order(&self, database_id: &str, order: &[String]) -> Result<()> {
        self.template_order
            .set_template_order(database_id, order)
            .await?;
        self.menu.refresh().await
    }
}

fn ok_or_flag(result: Result<()>) -> Value {
    match result {
        Ok(()) => json!({"ok": true}),
        Err(err) => absorbed(&err, json!({"ok": false})),
    }
}

fn absorbed(err: &crate::Error, fallback: Value) -> Value {
    warn!(%err, "command failed");
    fallback
}

fn oauth_error_message(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    if ["canceled", "cancelado", "blocked", "bloqueado"]
        .iter()
        .any(|needle| lowered.contains(needle))
    {
        OAUTH_CANCELED_MESSAGE.to_owned()
    } else {
        OAUTH_FAILED_MESSAGE.to_owned()
    }
}
