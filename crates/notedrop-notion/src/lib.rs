//! # notedrop-notion
//!
//! Notion API gateway for the notedrop extension core.
//!
//! This crate provides:
//! - An authenticated HTTP client adding the bearer token and API-version
//!   headers to every call ([`NotionClient`])
//! - Pure parsers for the heterogeneous Notion object shapes (titles, icons)
//! - Wire-level response types for the handful of endpoints notedrop uses
//! - Page creation ([`create_page`])
//!
//! It is pure transport plus parsing: no caching, no persistence. Callers
//! decide success by inspecting the returned response status.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod client;
mod error;
pub mod pages;
pub mod parse;
pub mod types;

pub use client::{NOTION_API, NOTION_VERSION, NotionClient};
pub use error::{Error, Result};
pub use pages::create_page;
pub use types::{DataSourceSummary, NotionIcon, Template};
