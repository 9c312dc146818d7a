//! HTTP client for status endpoints.
//!
//! [`HttpClient`] is the production [`StatusSource`]: it resolves endpoint
//! paths against a server base URL, applies the configured timeout, headers
//! and credentials, and unwraps the API envelope
//! (`{"status":"success","data":{...}}`).
//!
//! # Example
//!
//! ```rust,ignore
//! use status_view::client::{ClientConfig, HttpClient};
//! use std::time::Duration;
//!
//! let config = ClientConfig::new()
//!     .with_timeout(Duration::from_secs(10))
//!     .with_user_agent("status-view");
//!
//! let client = HttpClient::new("http://localhost:9090", config)?;
//! let runtime = client.fetch("/api/v1/status/runtimeinfo").await?;
//! ```

use crate::error::{Result, StatusError};
use crate::fetch::{StatusPayload, StatusSource};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Credentials sent with every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientAuth {
    /// HTTP basic authentication.
    Basic { username: String, password: String },
    /// Bearer token.
    Bearer { token: String },
}

/// Configuration for the status HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Request timeout duration.
    #[serde(default = "default_timeout")]
    pub timeout: Duration,

    /// Maximum number of retries for failed requests.
    #[serde(default)]
    pub max_retries: u32,

    /// Initial delay between retries.
    #[serde(default = "default_retry_delay")]
    pub retry_delay: Duration,

    /// Backoff multiplier for retry delays.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f32,

    /// User agent string.
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Credentials.
    #[serde(default)]
    pub auth: Option<ClientAuth>,

    /// Default headers to include in all requests.
    #[serde(default)]
    pub default_headers: Vec<(String, String)>,
}

impl ClientConfig {
    /// Create a new client configuration with defaults.
    pub fn new() -> Self {
        Self {
            timeout: default_timeout(),
            max_retries: 0,
            retry_delay: default_retry_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            user_agent: None,
            auth: None,
            default_headers: Vec::new(),
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum number of retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the retry delay.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f32) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Set the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the credentials.
    pub fn with_auth(mut self, auth: ClientAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Add a default header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((key.into(), value.into()));
        self
    }

    /// Check that the retry settings can drive a backoff loop.
    pub fn validate(&self) -> Result<()> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(StatusError::Config(format!(
                "Backoff multiplier must be a finite number of at least 1.0, got {}",
                self.backoff_multiplier
            )));
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_backoff_multiplier() -> f32 {
    2.0
}

/// Upper bound for the delay between two retries.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

fn next_retry_delay(delay: Duration, multiplier: f32) -> Duration {
    Duration::try_from_secs_f32(delay.as_secs_f32() * multiplier)
        .unwrap_or(MAX_RETRY_DELAY)
        .min(MAX_RETRY_DELAY)
}

/// API response envelope.
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    status: String,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default, rename = "errorType")]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client bound to one server.
pub struct HttpClient {
    config: ClientConfig,
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// Create a client for the server at `base_url`.
    pub fn new(base_url: &str, config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let parsed = Url::parse(base_url)?;
        if parsed.cannot_be_a_base() {
            return Err(StatusError::InvalidUrl(format!(
                "{} cannot be used as a base URL",
                base_url
            )));
        }

        let mut builder = Client::builder().timeout(config.timeout);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent);
        }
        let client = builder.build()?;

        Ok(Self {
            config,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Server base URL, without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Absolute URL for a server path.
    pub fn url_for(&self, path: &str) -> Result<Url> {
        Ok(Url::parse(&format!("{}{}", self.base_url, path))?)
    }

    /// Send a GET request for a server path.
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = self.url_for(path)?;
        let mut req = self.client.get(url);

        for (key, value) in &self.config.default_headers {
            req = req.header(key, value);
        }
        req = match &self.config.auth {
            Some(ClientAuth::Basic { username, password }) => req.basic_auth(username, Some(password)),
            Some(ClientAuth::Bearer { token }) => req.bearer_auth(token),
            None => req,
        };

        self.send_with_retry(req).await
    }

    /// Send a request builder with retry logic.
    async fn send_with_retry(&self, req: RequestBuilder) -> Result<Response> {
        let mut attempts = 0;
        let mut delay = self.config.retry_delay;

        loop {
            let request = req
                .try_clone()
                .ok_or_else(|| StatusError::Decode("request body cannot be cloned".to_string()))?;

            match request.send().await {
                Ok(response) => {
                    if !response.status().is_server_error() || attempts >= self.config.max_retries {
                        return Ok(response);
                    }
                    tracing::debug!(
                        status = response.status().as_u16(),
                        attempt = attempts + 1,
                        "retrying status request"
                    );
                }
                Err(e) => {
                    if attempts >= self.config.max_retries || (!e.is_timeout() && !e.is_connect()) {
                        return Err(StatusError::Http(e));
                    }
                    tracing::debug!(error = %e, attempt = attempts + 1, "retrying status request");
                }
            }

            attempts += 1;
            tokio::time::sleep(delay).await;
            delay = next_retry_delay(delay, self.config.backoff_multiplier);
        }
    }
}

#[async_trait]
impl StatusSource for HttpClient {
    async fn fetch(&self, path: &str) -> Result<StatusPayload> {
        let response = self.get(path).await?;
        let status = response.status();
        let url = response.url().to_string();
        let body = response.text().await?;

        tracing::debug!(%url, status = status.as_u16(), bytes = body.len(), "status response");
        decode_envelope(status, &url, &body)
    }
}

fn decode_envelope(status: reqwest::StatusCode, url: &str, body: &str) -> Result<StatusPayload> {
    let envelope = serde_json::from_str::<ApiEnvelope>(body);

    if let Ok(envelope) = &envelope {
        if envelope.status == "error" {
            return Err(StatusError::Api {
                error_type: envelope
                    .error_type
                    .clone()
                    .unwrap_or_else(|| "error".to_string()),
                message: envelope.error.clone().unwrap_or_default(),
            });
        }
    }

    if !status.is_success() {
        return Err(StatusError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    match envelope?.data {
        Some(Value::Object(data)) => Ok(data),
        Some(other) => Err(StatusError::Decode(format!(
            "expected an object in response data from {}, got {}",
            url, other
        ))),
        None => Err(StatusError::Decode(format!(
            "missing response data from {}",
            url
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{fetch_status, PageState, StatusEndpoint};

    // ------------------------------------------------------------------------
    // Client Configuration Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_client_config_default_values() {
        let config = ClientConfig::default();

        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.retry_delay, Duration::from_secs(1));
        assert_eq!(config.backoff_multiplier, 2.0);
        assert!(config.user_agent.is_none());
        assert!(config.auth.is_none());
        assert!(config.default_headers.is_empty());
    }

    #[test]
    fn test_client_config_rejects_bad_backoff() {
        for multiplier in [-1.0, 0.5, f32::NAN, f32::INFINITY] {
            let config = ClientConfig::new().with_backoff_multiplier(multiplier);
            assert!(
                matches!(config.validate(), Err(StatusError::Config(_))),
                "multiplier {} accepted",
                multiplier
            );
            assert!(HttpClient::new("http://localhost:9090", config).is_err());
        }

        assert!(ClientConfig::new().with_backoff_multiplier(1.0).validate().is_ok());
    }

    #[test]
    fn test_next_retry_delay_is_capped() {
        assert_eq!(
            next_retry_delay(Duration::from_millis(500), 2.0),
            Duration::from_secs(1)
        );
        assert_eq!(next_retry_delay(Duration::from_secs(40), 2.0), MAX_RETRY_DELAY);
        assert_eq!(next_retry_delay(Duration::from_secs(1), f32::MAX), MAX_RETRY_DELAY);
        assert_eq!(next_retry_delay(Duration::from_secs(1), f32::NAN), MAX_RETRY_DELAY);
        assert_eq!(next_retry_delay(Duration::from_secs(1), -3.0), MAX_RETRY_DELAY);
    }

    #[test]
    fn test_client_config_builder_pattern() {
        let config = ClientConfig::new()
            .with_timeout(Duration::from_secs(10))
            .with_max_retries(2)
            .with_retry_delay(Duration::from_millis(500))
            .with_backoff_multiplier(1.5)
            .with_user_agent("status-view/0.1")
            .with_header("X-Scope-OrgID", "tenant-1");

        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.retry_delay, Duration::from_millis(500));
        assert_eq!(config.backoff_multiplier, 1.5);
        assert_eq!(config.user_agent.as_deref(), Some("status-view/0.1"));
        assert_eq!(
            config.default_headers,
            vec![("X-Scope-OrgID".to_string(), "tenant-1".to_string())]
        );
    }

    #[test]
    fn test_client_config_deserialize_partial() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"max_retries": 2, "auth": {"type": "bearer", "token": "abc"}}"#,
        )
        .unwrap();

        assert_eq!(config.max_retries, 2);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(
            config.auth,
            Some(ClientAuth::Bearer {
                token: "abc".to_string()
            })
        );
    }

    // ------------------------------------------------------------------------
    // URL Resolution Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_url_for_joins_base_and_path() {
        let client = HttpClient::new("http://localhost:9090/", ClientConfig::new()).unwrap();
        assert_eq!(client.base_url(), "http://localhost:9090");
        assert_eq!(
            client.url_for("/prom/api/v1/alertmanagers").unwrap().as_str(),
            "http://localhost:9090/prom/api/v1/alertmanagers"
        );
    }

    #[test]
    fn test_new_rejects_invalid_base_url() {
        assert!(matches!(
            HttpClient::new("not a url", ClientConfig::new()),
            Err(StatusError::InvalidUrl(_))
        ));
        assert!(matches!(
            HttpClient::new("mailto:ops@example.com", ClientConfig::new()),
            Err(StatusError::InvalidUrl(_))
        ));
    }

    // ------------------------------------------------------------------------
    // Envelope Decoding Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_decode_success_envelope_keeps_order() {
        let body = r#"{"status":"success","data":{"zeta":1,"alpha":2}}"#;
        let data = decode_envelope(reqwest::StatusCode::OK, "http://x", body).unwrap();
        let keys: Vec<_> = data.keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_decode_error_envelope() {
        let body = r#"{"status":"error","errorType":"unavailable","error":"TSDB not ready"}"#;
        let err = decode_envelope(reqwest::StatusCode::SERVICE_UNAVAILABLE, "http://x", body)
            .unwrap_err();
        assert_eq!(err.to_string(), "unavailable: TSDB not ready");
    }

    #[test]
    fn test_decode_non_success_status_without_envelope() {
        let err = decode_envelope(reqwest::StatusCode::NOT_FOUND, "http://x/api", "404 page not found")
            .unwrap_err();
        assert!(matches!(err, StatusError::UnexpectedStatus { status: 404, .. }));
    }

    #[test]
    fn test_decode_rejects_non_object_data() {
        let body = r#"{"status":"success","data":[1,2,3]}"#;
        let err = decode_envelope(reqwest::StatusCode::OK, "http://x", body).unwrap_err();
        assert!(matches!(err, StatusError::Decode(_)));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_envelope(reqwest::StatusCode::OK, "http://x", "<html>").unwrap_err();
        assert!(matches!(err, StatusError::Decode(_)));
    }

    // ------------------------------------------------------------------------
    // Mock Server Tests
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_fetch_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/status/buildinfo")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"success","data":{"version":"2.15.0","branch":"HEAD"}}"#)
            .create_async()
            .await;

        let client = HttpClient::new(&server.url(), ClientConfig::new()).unwrap();
        let data = client.fetch("/api/v1/status/buildinfo").await.unwrap();

        assert_eq!(data["version"], "2.15.0");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_sends_headers_and_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/alertmanagers")
            .match_header("authorization", "Bearer secret")
            .match_header("x-scope-orgid", "tenant-1")
            .with_status(200)
            .with_body(r#"{"status":"success","data":{"activeAlertmanagers":[]}}"#)
            .create_async()
            .await;

        let config = ClientConfig::new()
            .with_auth(ClientAuth::Bearer {
                token: "secret".to_string(),
            })
            .with_header("X-Scope-OrgID", "tenant-1");
        let client = HttpClient::new(&server.url(), config).unwrap();

        assert!(client.fetch("/api/v1/alertmanagers").await.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_retries_server_errors() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/status/runtimeinfo")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let config = ClientConfig::new()
            .with_max_retries(2)
            .with_retry_delay(Duration::from_millis(1));
        let client = HttpClient::new(&server.url(), config).unwrap();

        let err = client.fetch("/api/v1/status/runtimeinfo").await.unwrap_err();

        assert!(matches!(err, StatusError::UnexpectedStatus { status: 503, .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_does_not_retry_client_errors() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/status/runtimeinfo")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let config = ClientConfig::new()
            .with_max_retries(3)
            .with_retry_delay(Duration::from_millis(1));
        let client = HttpClient::new(&server.url(), config).unwrap();

        assert!(client.fetch("/api/v1/status/runtimeinfo").await.is_err());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_status_with_one_failing_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let _runtime = server
            .mock("GET", "/prom/api/v1/status/runtimeinfo")
            .with_status(200)
            .with_body(r#"{"status":"success","data":{"CWD":"/"}}"#)
            .create_async()
            .await;
        let _build = server
            .mock("GET", "/prom/api/v1/status/buildinfo")
            .with_status(500)
            .with_body(r#"{"status":"error","errorType":"internal","error":"boom"}"#)
            .create_async()
            .await;
        let _am = server
            .mock("GET", "/prom/api/v1/alertmanagers")
            .with_status(200)
            .with_body(r#"{"status":"success","data":{"activeAlertmanagers":[]}}"#)
            .create_async()
            .await;

        let client = HttpClient::new(&server.url(), ClientConfig::new()).unwrap();
        let combined = fetch_status(&client, "/prom").await;

        assert!(!combined.get(StatusEndpoint::RuntimeInfo).is_pending());
        assert_eq!(combined.page_state(), PageState::Failed("internal: boom"));
    }
}
