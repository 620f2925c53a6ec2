//! # notedrop-core
//!
//! The data-source synchronization and caching layer behind the notedrop
//! extension.
//!
//! This crate provides:
//! - Identifier normalization and sparse-order sorting
//! - An injectable key-value storage abstraction with memory and `SQLite`
//!   backends, split into a device-local and a profile-synced area
//! - Credential and auth-method persistence
//! - Data-source directory discovery with a cached listing, persisted
//!   user ordering, and a sticky active set
//! - A per-data-source detail cache (title property, icon, templates) with a
//!   staleness trust boundary and force-refresh bypass
//! - A persisted per-data-source template order
//! - Context-menu projection as a pure function of the cached state
//! - The command router consumed by UI surfaces
//!
//! Browser capabilities (menu tree, notifications, settings surface, the
//! interactive OAuth hop) are injected traits, never ambient globals.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod capabilities;
pub mod command;
pub mod detail;
pub mod directory;
mod error;
pub mod ids;
pub mod menu;
pub mod storage;
pub mod template_order;

pub use auth::{AuthMethod, AuthStore};
pub use capabilities::{AuthFlowLauncher, MenuSink, Notifier, SettingsOpener};
pub use command::{Command, Service};
pub use detail::{DataSourceDetail, DatabaseInfo, DetailCache};
pub use directory::Directory;
pub use error::{Error, Result};
pub use ids::{normalize_ids, sort_ids_by_order};
pub use menu::{ContextMenu, MenuItem, MenuKey};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore, StorageAreas};
pub use template_order::TemplateOrderStore;
