//! Request handlers.
//!
//! Every status request mounts a fresh [`StatusView`], waits for its three
//! reads and renders the result. Failed reads still produce the error page,
//! served with `502 Bad Gateway`.

use axum::{extract::State, http::StatusCode, response::Html};
use status_view::{render_document, PageState, StatusView};

use crate::routes::AppState;

/// Handler for GET /health
pub async fn health() -> &'static str {
    "ok"
}

/// Handler for GET /status
pub async fn status_page(State(state): State<AppState>) -> (StatusCode, Html<String>) {
    let (code, body) = render_status(&state).await;
    (code, Html(render_document(&body)))
}

/// Handler for GET /status/fragment
///
/// Same content as `/status` without the surrounding document.
pub async fn status_fragment(State(state): State<AppState>) -> (StatusCode, Html<String>) {
    let (code, body) = render_status(&state).await;
    (code, Html(body))
}

async fn render_status(state: &AppState) -> (StatusCode, String) {
    let mut view = StatusView::with_shared_source(state.source.clone(), &*state.path_prefix);
    view.activate();

    let fetch = view.settled().await;
    let code = match fetch.page_state() {
        PageState::Failed(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::OK,
    };

    (code, view.render())
}
