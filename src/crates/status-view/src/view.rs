//! Status view lifecycle.
//!
//! A [`StatusView`] owns the three reads of one page visit. Activating it
//! spawns the reads on the tokio runtime; each completion updates its slot
//! and bumps a [`watch`] counter so callers can re-render. Deactivating it
//! aborts outstanding reads, and a generation counter makes sure a result
//! that still lands afterwards is dropped instead of touching the state.
//!
//! # Example
//!
//! ```rust,ignore
//! use status_view::{ClientConfig, HttpClient, StatusView};
//!
//! let client = HttpClient::new("http://localhost:9090", ClientConfig::new())?;
//! let mut view = StatusView::new(client, "");
//! view.activate();
//! view.settled().await;
//! println!("{}", view.render());
//! ```

use crate::fetch::{read_endpoint, CombinedFetch, StatusEndpoint, StatusSource};
use crate::format::FieldFormatter;
use crate::render::render_page;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

struct Shared {
    generation: u64,
    active: bool,
    fetch: CombinedFetch,
}

/// One mounted status page.
pub struct StatusView<S: StatusSource + ?Sized + 'static> {
    source: Arc<S>,
    path_prefix: String,
    formatter: FieldFormatter,
    shared: Arc<Mutex<Shared>>,
    changes: Arc<watch::Sender<u64>>,
    tasks: Vec<JoinHandle<()>>,
}

impl<S: StatusSource + ?Sized + 'static> StatusView<S> {
    /// Create an inactive view reading from `source` under `path_prefix`.
    pub fn new(source: S, path_prefix: impl Into<String>) -> Self
    where
        S: Sized,
    {
        Self::with_shared_source(Arc::new(source), path_prefix)
    }

    /// Create an inactive view over a shared, possibly type-erased, source.
    pub fn with_shared_source(source: Arc<S>, path_prefix: impl Into<String>) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            source,
            path_prefix: path_prefix.into(),
            formatter: FieldFormatter::status_page(),
            shared: Arc::new(Mutex::new(Shared {
                generation: 0,
                active: false,
                fetch: CombinedFetch::pending(),
            })),
            changes: Arc::new(changes),
            tasks: Vec::new(),
        }
    }

    /// Use a different rule table.
    pub fn with_formatter(mut self, formatter: FieldFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Path prefix the endpoints are read under.
    pub fn path_prefix(&self) -> &str {
        &self.path_prefix
    }

    /// Whether the view is mounted.
    pub fn is_active(&self) -> bool {
        self.shared.lock().active
    }

    /// Reset every slot to pending and issue the three reads.
    ///
    /// Must be called from within a tokio runtime. Activating an active view
    /// discards its outstanding reads first.
    pub fn activate(&mut self) {
        self.abort_tasks();

        let generation = {
            let mut shared = self.shared.lock();
            shared.generation += 1;
            shared.active = true;
            shared.fetch = CombinedFetch::pending();
            shared.generation
        };
        self.notify();

        tracing::debug!(
            path_prefix = %self.path_prefix,
            generation,
            "activating status view"
        );

        for endpoint in StatusEndpoint::ALL {
            let source = Arc::clone(&self.source);
            let shared = Arc::clone(&self.shared);
            let changes = Arc::clone(&self.changes);
            let path = endpoint.path_with_prefix(&self.path_prefix);

            self.tasks.push(tokio::spawn(async move {
                let state = read_endpoint(&*source, endpoint, &path).await;

                let mut guard = shared.lock();
                if guard.generation != generation {
                    tracing::debug!(%endpoint, generation, "discarding stale status result");
                    return;
                }
                guard.fetch.set(endpoint, state);
                drop(guard);

                changes.send_modify(|n| *n += 1);
            }));
        }
    }

    /// Stop the view; outstanding reads are aborted and their results ignored.
    pub fn deactivate(&mut self) {
        let was_active = {
            let mut shared = self.shared.lock();
            shared.generation += 1;
            std::mem::replace(&mut shared.active, false)
        };
        self.abort_tasks();

        if was_active {
            tracing::debug!(path_prefix = %self.path_prefix, "deactivated status view");
            self.notify();
        }
    }

    /// Current state of the three reads.
    pub fn snapshot(&self) -> CombinedFetch {
        self.shared.lock().fetch.clone()
    }

    /// Render the current state.
    pub fn render(&self) -> String {
        render_page(&self.shared.lock().fetch, &self.formatter)
    }

    /// Receiver that changes whenever the state does.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Wait until no read is pending, or the view is deactivated.
    pub async fn settled(&self) -> CombinedFetch {
        let mut changes = self.subscribe();
        loop {
            {
                let shared = self.shared.lock();
                if !shared.active || !shared.fetch.is_pending() {
                    return shared.fetch.clone();
                }
            }
            if changes.changed().await.is_err() {
                return self.snapshot();
            }
        }
    }

    fn notify(&self) {
        self.changes.send_modify(|n| *n += 1);
    }

    fn abort_tasks(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl<S: StatusSource + ?Sized + 'static> Drop for StatusView<S> {
    fn drop(&mut self) {
        self.deactivate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, StatusError};
    use crate::fetch::{FetchState, PageState, StatusPayload};
    use crate::render::LOADING_INDICATOR;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Source whose reads block until their gate is opened.
    #[derive(Default)]
    struct GatedSource {
        failures: HashMap<String, String>,
        gates: HashMap<String, Arc<Notify>>,
        calls: AtomicUsize,
    }

    impl GatedSource {
        fn gate(&mut self, endpoint: StatusEndpoint) -> Arc<Notify> {
            let notify = Arc::new(Notify::new());
            self.gates
                .insert(endpoint.path_with_prefix(""), Arc::clone(&notify));
            notify
        }

        fn fail(&mut self, endpoint: StatusEndpoint, message: &str) {
            self.failures
                .insert(endpoint.path_with_prefix(""), message.to_string());
        }
    }

    #[async_trait]
    impl StatusSource for GatedSource {
        async fn fetch(&self, path: &str) -> Result<StatusPayload> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = self.gates.get(path) {
                gate.notified().await;
            }
            if let Some(message) = self.failures.get(path) {
                return Err(StatusError::Decode(message.clone()));
            }
            Ok(json!({ "path": path }).as_object().cloned().unwrap())
        }
    }

    async fn wait_until<S, F>(view: &StatusView<S>, mut pred: F)
    where
        S: StatusSource + ?Sized + 'static,
        F: FnMut(&CombinedFetch) -> bool,
    {
        let mut changes = view.subscribe();
        tokio::time::timeout(Duration::from_secs(5), async {
            while !pred(&view.snapshot()) {
                changes.changed().await.unwrap();
            }
        })
        .await
        .expect("view state never matched");
    }

    #[tokio::test]
    async fn test_inactive_view_renders_spinner() {
        let view = StatusView::new(GatedSource::default(), "");
        assert!(!view.is_active());
        assert_eq!(view.render(), LOADING_INDICATOR);
    }

    #[tokio::test]
    async fn test_activate_renders_sections_once_settled() {
        let mut source = GatedSource::default();
        let gate = source.gate(StatusEndpoint::BuildInfo);
        let mut view = StatusView::new(source, "");

        view.activate();
        assert!(view.is_active());
        wait_until(&view, |f| !f.runtime_info.is_pending() && !f.alertmanagers.is_pending()).await;
        assert_eq!(view.render(), LOADING_INDICATOR);

        gate.notify_one();
        let settled = view.settled().await;

        assert!(matches!(settled.page_state(), PageState::Ready(_)));
        let html = view.render();
        assert!(html.contains("<h2>Runtime Information</h2>"));
        assert!(html.contains("<h2>Build Information</h2>"));
        assert!(html.contains("<h2>Alertmanagers</h2>"));
    }

    #[tokio::test]
    async fn test_failure_shown_while_others_pending() {
        let mut source = GatedSource::default();
        let _runtime_gate = source.gate(StatusEndpoint::RuntimeInfo);
        let _build_gate = source.gate(StatusEndpoint::BuildInfo);
        source.fail(StatusEndpoint::Alertmanagers, "bad gateway");
        let mut view = StatusView::new(source, "");

        view.activate();
        wait_until(&view, |f| !f.alertmanagers.is_pending()).await;

        let html = view.render();
        assert!(html.contains("Error fetching status: Decode error: bad gateway"));
        assert!(!html.contains("<h2>"));
        assert!(!html.contains("fa-spinner"));
    }

    #[tokio::test]
    async fn test_deactivate_discards_late_results() {
        let mut source = GatedSource::default();
        let gates: Vec<_> = StatusEndpoint::ALL.iter().map(|e| source.gate(*e)).collect();
        let mut view = StatusView::new(source, "");

        view.activate();
        view.deactivate();
        for gate in &gates {
            gate.notify_one();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(!view.is_active());
        assert_eq!(view.snapshot(), CombinedFetch::pending());
        assert_eq!(view.settled().await, CombinedFetch::pending());
    }

    #[tokio::test]
    async fn test_reactivation_refetches() {
        let source = Arc::new(GatedSource::default());
        let mut view = StatusView::with_shared_source(Arc::clone(&source), "");

        view.activate();
        view.settled().await;
        view.deactivate();
        view.activate();
        let settled = view.settled().await;

        assert!(!settled.is_pending());
        assert_eq!(source.calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_prefix_applied_to_reads() {
        let mut view = StatusView::new(GatedSource::default(), "/prom");
        view.activate();
        let settled = view.settled().await;

        match settled.get(StatusEndpoint::Alertmanagers) {
            FetchState::Success(payload) => {
                assert_eq!(payload["path"], "/prom/api/v1/alertmanagers");
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_render_twice_identical() {
        let mut view = StatusView::new(GatedSource::default(), "");
        view.activate();
        view.settled().await;

        assert_eq!(view.render(), view.render());
    }

    struct PanickingSource;

    #[async_trait]
    impl StatusSource for PanickingSource {
        async fn fetch(&self, path: &str) -> Result<StatusPayload> {
            if path.ends_with("/alertmanagers") {
                panic!("alertmanager list exploded");
            }
            Ok(json!({ "path": path }).as_object().cloned().unwrap())
        }
    }

    #[tokio::test]
    async fn test_panicking_read_settles_with_error() {
        let mut view = StatusView::new(PanickingSource, "");
        view.activate();

        let settled = tokio::time::timeout(Duration::from_secs(5), view.settled())
            .await
            .expect("view never settled after a panicking read");

        assert_eq!(
            settled.page_state(),
            PageState::Failed("Reading alertmanagers panicked: alertmanager list exploded")
        );
        let html = view.render();
        assert!(html.contains("Error fetching status: Reading alertmanagers panicked"));
        assert!(!html.contains("<h2>"));
    }
}
