//! Host capabilities injected into the core.
//!
//! The browser owns the context-menu tree, notifications, the settings
//! surface, and the interactive OAuth hop. The core receives each as a trait
//! object so every component is testable against fakes.

use async_trait::async_trait;

use crate::menu::MenuItem;

/// The browser's context-menu tree.
#[async_trait]
pub trait MenuSink: Send + Sync {
    /// Removes every menu entry owned by the extension.
    async fn remove_all(&self) -> anyhow::Result<()>;

    /// Creates one menu entry; parents are always created before children.
    async fn create(&self, item: &MenuItem) -> anyhow::Result<()>;

    /// Retitles an existing entry in place.
    async fn update_title(&self, id: &str, title: &str) -> anyhow::Result<()>;

    /// Requests a refresh-in-place so a retitle renders before the menu is
    /// read. Distinct from a full rebuild.
    async fn refresh(&self) -> anyhow::Result<()>;
}

/// Optional user-facing notifications.
///
/// The only acceptable surface for page-creation failures, which happen from
/// an arbitrary page's context menu where no in-UI error can be shown.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Shows a notification, if the user has them enabled.
    async fn notify(&self, title: &str, message: &str) -> anyhow::Result<()>;
}

/// Opens the extension's settings surface.
#[async_trait]
pub trait SettingsOpener: Send + Sync {
    /// Opens the options page.
    async fn open_settings(&self) -> anyhow::Result<()>;
}

/// The interactive OAuth browser hop.
#[async_trait]
pub trait AuthFlowLauncher: Send + Sync {
    /// Redirect URI registered for this extension instance.
    fn redirect_uri(&self) -> String;

    /// Opens the consent page and resolves with the callback URL.
    async fn launch(&self, auth_url: &str) -> anyhow::Result<String>;
}

/// A notifier that drops every notification (for hosts without permission).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _title: &str, _message: &str) -> anyhow::Result<()> {
        Ok(())
    }
}
