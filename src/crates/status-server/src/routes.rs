//! Route definitions for the status server.

use axum::{routing::get, Router};
use status_view::StatusSource;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn StatusSource>,
    pub path_prefix: Arc<str>,
}

impl AppState {
    pub fn new(source: Arc<dyn StatusSource>, path_prefix: impl Into<Arc<str>>) -> Self {
        Self {
            source,
            path_prefix: path_prefix.into(),
        }
    }
}

/// Build the router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status_page))
        .route("/status/fragment", get(handlers::status_fragment))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
