//! Configuration loading for status page deployments.
//!
//! Configuration is layered: a TOML, YAML or JSON file (format picked from
//! the extension), then `STATUS_VIEW_*` environment variables, then whatever
//! the caller overrides explicitly (the binary applies CLI flags last).
//!
//! # Example
//!
//! ```rust,ignore
//! use status_view::config::{AppConfig, ENV_PREFIX};
//!
//! let mut config: AppConfig = status_view::config::load_config_file("status.toml")?;
//! config.apply_env(ENV_PREFIX)?;
//! config.validate()?;
//! ```

use crate::client::ClientConfig;
use crate::error::{Result, StatusError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Prefix of the environment variables read by [`AppConfig::apply_env`].
pub const ENV_PREFIX: &str = "STATUS_VIEW_";

/// Get an environment variable as a string.
fn get_env(key: &str) -> Result<String> {
    std::env::var(key).map_err(|e| {
        StatusError::Config(format!("Environment variable '{}' not found: {}", key, e))
    })
}

/// Get an environment variable and parse it to the specified type.
fn get_env_parse<T: std::str::FromStr>(key: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    let value = get_env(key)?;
    value.parse::<T>().map_err(|e| {
        StatusError::Config(format!(
            "Failed to parse environment variable '{}': {}",
            key, e
        ))
    })
}

/// Load configuration from a YAML file.
fn load_yaml_config<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let content = std::fs::read_to_string(path.as_ref())?;
    serde_yaml::from_str(&content).map_err(|e| {
        StatusError::Config(format!(
            "Failed to parse YAML config from {:?}: {}",
            path.as_ref(),
            e
        ))
    })
}

/// Load configuration from a JSON file.
fn load_json_config<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let content = std::fs::read_to_string(path.as_ref())?;
    serde_json::from_str(&content).map_err(|e| {
        StatusError::Config(format!(
            "Failed to parse JSON config from {:?}: {}",
            path.as_ref(),
            e
        ))
    })
}

/// Load configuration from a TOML file.
fn load_toml_config<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let content = std::fs::read_to_string(path.as_ref())?;
    toml::from_str(&content).map_err(|e| {
        StatusError::Config(format!(
            "Failed to parse TOML config from {:?}: {}",
            path.as_ref(),
            e
        ))
    })
}

/// Load configuration from a file (auto-detect format from extension).
pub fn load_config_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| {
            StatusError::Config(format!("Unable to determine file extension for {:?}", path))
        })?;

    match extension.to_lowercase().as_str() {
        "toml" => load_toml_config(path),
        "yaml" | "yml" => load_yaml_config(path),
        "json" => load_json_config(path),
        _ => Err(StatusError::Config(format!(
            "Unsupported config file extension: {}",
            extension
        ))),
    }
}

/// Address the status server listens on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_server_url() -> String {
    "http://localhost:9090".to_string()
}

/// Complete configuration of a status page deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the monitored server.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Path prefix the API is mounted under; empty for none.
    #[serde(default)]
    pub path_prefix: String,

    #[serde(default)]
    pub listen: ListenConfig,

    #[serde(default)]
    pub client: ClientConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            path_prefix: String::new(),
            listen: ListenConfig::default(),
            client: ClientConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, or start from defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                tracing::debug!(?path, "loading configuration file");
                load_config_file(path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Override fields from `{prefix}SERVER_URL`, `{prefix}PATH_PREFIX`,
    /// `{prefix}HOST` and `{prefix}PORT`.
    pub fn apply_env(&mut self, prefix: &str) -> Result<()> {
        if let Ok(url) = get_env(&format!("{}SERVER_URL", prefix)) {
            self.server_url = url;
        }
        if let Ok(path_prefix) = get_env(&format!("{}PATH_PREFIX", prefix)) {
            self.path_prefix = path_prefix;
        }
        if let Ok(host) = get_env(&format!("{}HOST", prefix)) {
            self.listen.host = host;
        }
        let port_key = format!("{}PORT", prefix);
        if std::env::var_os(&port_key).is_some() {
            self.listen.port = get_env_parse(&port_key)?;
        }
        Ok(())
    }

    /// Check the server URL and path prefix.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.server_url).map_err(|e| {
            StatusError::Config(format!("Invalid server URL '{}': {}", self.server_url, e))
        })?;

        if !self.path_prefix.is_empty()
            && (!self.path_prefix.starts_with('/') || self.path_prefix.ends_with('/'))
        {
            return Err(StatusError::Config(format!(
                "Path prefix '{}' must start with '/' and must not end with '/'",
                self.path_prefix
            )));
        }

        self.client.validate()?;

        Ok(())
    }
}
