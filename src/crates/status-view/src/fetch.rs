//! Status endpoints, per-endpoint fetch state and the combined page state.

use crate::error::Result;
use async_trait::async_trait;
use futures::FutureExt;
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;

/// Decoded `data` object of a status response, in server field order.
pub type StatusPayload = Map<String, Value>;

/// One of the three endpoints the status page reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusEndpoint {
    RuntimeInfo,
    BuildInfo,
    Alertmanagers,
}

impl StatusEndpoint {
    /// All endpoints in page order.
    pub const ALL: [StatusEndpoint; 3] = [Self::RuntimeInfo, Self::BuildInfo, Self::Alertmanagers];

    /// API path, relative to the path prefix.
    pub fn path(&self) -> &'static str {
        match self {
            Self::RuntimeInfo => "/api/v1/status/runtimeinfo",
            Self::BuildInfo => "/api/v1/status/buildinfo",
            Self::Alertmanagers => "/api/v1/alertmanagers",
        }
    }

    /// Section heading.
    pub fn title(&self) -> &'static str {
        match self {
            Self::RuntimeInfo => "Runtime Information",
            Self::BuildInfo => "Build Information",
            Self::Alertmanagers => "Alertmanagers",
        }
    }

    /// Path including the prefix, e.g. `/prometheus/api/v1/alertmanagers`.
    pub fn path_with_prefix(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.path())
    }
}

impl fmt::Display for StatusEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RuntimeInfo => write!(f, "runtimeinfo"),
            Self::BuildInfo => write!(f, "buildinfo"),
            Self::Alertmanagers => write!(f, "alertmanagers"),
        }
    }
}

/// Where status responses come from.
///
/// `path` already carries the path prefix; implementations resolve it
/// against their own origin.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Read one endpoint and return its `data` object.
    async fn fetch(&self, path: &str) -> Result<StatusPayload>;
}

/// State of a single read.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FetchState {
    /// Not completed yet.
    #[default]
    Pending,
    /// Completed with a payload.
    Success(StatusPayload),
    /// Failed; holds the error message shown to the user.
    Failure(String),
}

impl FetchState {
    /// Build the state from a completed read.
    pub fn from_result(result: Result<StatusPayload>) -> Self {
        match result {
            Ok(payload) => Self::Success(payload),
            Err(e) => Self::Failure(e.to_string()),
        }
    }

    /// Whether the read is still outstanding.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// State of all three reads.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CombinedFetch {
    pub runtime_info: FetchState,
    pub build_info: FetchState,
    pub alertmanagers: FetchState,
}

impl CombinedFetch {
    /// All reads pending.
    pub fn pending() -> Self {
        Self::default()
    }

    /// State slot for an endpoint.
    pub fn get(&self, endpoint: StatusEndpoint) -> &FetchState {
        match endpoint {
            StatusEndpoint::RuntimeInfo => &self.runtime_info,
            StatusEndpoint::BuildInfo => &self.build_info,
            StatusEndpoint::Alertmanagers => &self.alertmanagers,
        }
    }

    /// Replace the state slot for an endpoint.
    pub fn set(&mut self, endpoint: StatusEndpoint, state: FetchState) {
        match endpoint {
            StatusEndpoint::RuntimeInfo => self.runtime_info = state,
            StatusEndpoint::BuildInfo => self.build_info = state,
            StatusEndpoint::Alertmanagers => self.alertmanagers = state,
        }
    }

    /// Whether any read is still outstanding.
    pub fn is_pending(&self) -> bool {
        StatusEndpoint::ALL.iter().any(|e| self.get(*e).is_pending())
    }

    /// Aggregate state: the first failure in page order wins, then loading,
    /// then the three payloads.
    pub fn page_state(&self) -> PageState<'_> {
        let failure = StatusEndpoint::ALL.iter().find_map(|e| match self.get(*e) {
            FetchState::Failure(message) => Some(message.as_str()),
            _ => None,
        });
        if let Some(message) = failure {
            return PageState::Failed(message);
        }

        match (&self.runtime_info, &self.build_info, &self.alertmanagers) {
            (FetchState::Success(runtime), FetchState::Success(build), FetchState::Success(am)) => {
                PageState::Ready([runtime, build, am])
            }
            _ => PageState::Loading,
        }
    }
}

/// What the page shows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageState<'a> {
    /// At least one read outstanding, none failed.
    Loading,
    /// A read failed; the first failure's message.
    Failed(&'a str),
    /// Payloads in [`StatusEndpoint::ALL`] order.
    Ready([&'a StatusPayload; 3]),
}

/// Read one endpoint and turn the outcome into its slot state.
///
/// A source that panics yields a failure instead of leaving the slot pending.
pub async fn read_endpoint<S>(source: &S, endpoint: StatusEndpoint, path: &str) -> FetchState
where
    S: StatusSource + ?Sized,
{
    match AssertUnwindSafe(source.fetch(path)).catch_unwind().await {
        Ok(result) => {
            if let Err(e) = &result {
                tracing::warn!(%endpoint, path, error = %e, "status read failed");
            }
            FetchState::from_result(result)
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!(%endpoint, path, panic = %message, "status read panicked");
            FetchState::Failure(format!("Reading {} panicked: {}", endpoint, message))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Issue the three reads concurrently and wait for all of them.
pub async fn fetch_status<S>(source: &S, path_prefix: &str) -> CombinedFetch
where
    S: StatusSource + ?Sized,
{
    let runtime_path = StatusEndpoint::RuntimeInfo.path_with_prefix(path_prefix);
    let build_path = StatusEndpoint::BuildInfo.path_with_prefix(path_prefix);
    let am_path = StatusEndpoint::Alertmanagers.path_with_prefix(path_prefix);

    let (runtime_info, build_info, alertmanagers) = tokio::join!(
        read_endpoint(source, StatusEndpoint::RuntimeInfo, &runtime_path),
        read_endpoint(source, StatusEndpoint::BuildInfo, &build_path),
        read_endpoint(source, StatusEndpoint::Alertmanagers, &am_path),
    );

    let combined = CombinedFetch {
        runtime_info,
        build_info,
        alertmanagers,
    };

    if let PageState::Failed(message) = combined.page_state() {
        tracing::warn!(path_prefix, error = message, "status fetch failed");
    }

    combined
}
