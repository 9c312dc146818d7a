//! Status page for Prometheus-style monitoring servers.
//!
//! The page reads three endpoints of the monitored server
//! (`/api/v1/status/runtimeinfo`, `/api/v1/status/buildinfo` and
//! `/api/v1/alertmanagers`), waits for all of them, and renders each response
//! as a key/value table. A static rule table decides titles, value
//! formatting and which fields are hidden or expanded into rows of their own.
//!
//! # Modules
//!
//! ## Fetching (`fetch`, `view`)
//!
//! [`fetch_status`] issues the three reads once and returns their combined
//! state. [`StatusView`] is the long-lived form: activate it to start the
//! reads, subscribe to its change counter to re-render, deactivate it to
//! drop whatever is still in flight.
//!
//! ```rust,ignore
//! use status_view::{fetch_status, render_page, ClientConfig, FieldFormatter, HttpClient};
//!
//! let client = HttpClient::new("http://localhost:9090", ClientConfig::new())?;
//! let state = fetch_status(&client, "").await;
//! let html = render_page(&state, &FieldFormatter::status_page());
//! ```
//!
//! ## Formatting (`format`, `render`)
//!
//! [`FieldFormatter`] turns a response into rows; [`render_page`] turns the
//! combined state into HTML.
//!
//! ## Client (`client`)
//!
//! [`HttpClient`], the HTTP implementation of [`StatusSource`].
//!
//! ## Config (`config`)
//!
//! File and environment configuration for deployments.
//!
//! # Features
//!
//! - `client` - HTTP client (enabled by default)
//! - `config` - Configuration loading (enabled by default)

pub mod error;
pub mod fetch;
pub mod format;
pub mod render;
pub mod view;

#[cfg(feature = "client")]
pub mod client;

#[cfg(feature = "config")]
pub mod config;

// Re-export commonly used types
pub use error::{Result, StatusError};
pub use fetch::{
    fetch_status, read_endpoint, CombinedFetch, FetchState, PageState, StatusEndpoint,
    StatusPayload, StatusSource,
};
pub use format::{FieldDisplay, FieldFormatter, FieldRule, Row, RowsTransform, ValueTransform};
pub use render::{render_document, render_page};
pub use view::StatusView;

#[cfg(feature = "client")]
pub use client::{ClientAuth, ClientConfig, HttpClient};

#[cfg(feature = "config")]
pub use config::{AppConfig, ListenConfig};
