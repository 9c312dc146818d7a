//! HTTP server for the monitoring status page.
//!
//! Serves the page rendered by [`status_view`] at `/status` (full document)
//! and `/status/fragment` (body only), plus `/health`.

pub mod handlers;
pub mod routes;

pub use routes::{create_router, AppState};
