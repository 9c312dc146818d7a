//! Field formatting rules for status tables.
//!
//! Every field of a status response is looked up in a static rule table. A
//! rule decides the row title, how the raw JSON value is turned into display
//! text, whether the field is dropped, or whether it expands into rows of its
//! own (the alertmanager endpoint list). Fields without a rule fall back to
//! [`FieldRule::DEFAULT`]: the field name as title and the value unchanged.
//!
//! # Example
//!
//! ```rust
//! use status_view::format::{FieldFormatter, Row};
//! use serde_json::json;
//!
//! let payload = json!({ "reloadConfigSuccess": true });
//! let rows = FieldFormatter::status_page().rows(payload.as_object().unwrap());
//!
//! assert_eq!(
//!     rows[0],
//!     Row::Field {
//!         title: "Configuration reload".to_string(),
//!         value: "Successful".to_string(),
//!     }
//! );
//! ```

use crate::fetch::StatusPayload;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use url::Url;

/// Text shown when a timestamp cannot be interpreted.
pub const INVALID_DATE: &str = "Invalid Date";

/// Transform from a raw JSON value to a single display cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueTransform {
    /// Show the value as-is.
    Identity,
    /// RFC 3339 string (or epoch milliseconds) rendered as an HTTP-date in UTC.
    UtcTimestamp,
    /// Truthy value rendered as `Successful`, anything else as `Unsuccessful`.
    ReloadOutcome,
}

impl ValueTransform {
    /// Apply the transform to a raw value.
    pub fn apply(&self, value: &Value) -> String {
        match self {
            Self::Identity => display_value(value),
            Self::UtcTimestamp => utc_string(value),
            Self::ReloadOutcome => {
                if is_truthy(value) {
                    "Successful".to_string()
                } else {
                    "Unsuccessful".to_string()
                }
            }
        }
    }
}

/// Transform from a raw JSON value to a run of table rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowsTransform {
    /// `[{ "url": ... }, ...]` rendered as an "Endpoint" header plus one link row each.
    AlertmanagerEndpoints,
}

impl RowsTransform {
    /// Apply the transform to a raw value.
    pub fn apply(&self, value: &Value) -> Vec<Row> {
        match self {
            Self::AlertmanagerEndpoints => {
                let mut rows = vec![Row::Header("Endpoint".to_string())];
                let endpoints = value.as_array().map(Vec::as_slice).unwrap_or_default();
                rows.extend(
                    endpoints
                        .iter()
                        .filter_map(|am| am.get("url").and_then(Value::as_str))
                        .map(|url| Row::Endpoint(EndpointLink::parse(url))),
                );
                rows
            }
        }
    }
}

/// How a field is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDisplay {
    /// A single title/value row.
    Value(ValueTransform),
    /// Rows produced by the transform, spliced into the table body.
    CustomRows(RowsTransform),
    /// No row at all.
    Skip,
}

/// Formatting rule for one response field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    /// Row title; the field name is used when absent.
    pub title: Option<&'static str>,
    /// Display mode.
    pub display: FieldDisplay,
}

impl FieldRule {
    /// Rule used for fields missing from the table.
    pub const DEFAULT: FieldRule = FieldRule {
        title: None,
        display: FieldDisplay::Value(ValueTransform::Identity),
    };

    const fn titled(title: &'static str) -> Self {
        Self {
            title: Some(title),
            display: FieldDisplay::Value(ValueTransform::Identity),
        }
    }

    const fn transformed(title: &'static str, transform: ValueTransform) -> Self {
        Self {
            title: Some(title),
            display: FieldDisplay::Value(transform),
        }
    }

    const fn custom_rows(transform: RowsTransform) -> Self {
        Self {
            title: None,
            display: FieldDisplay::CustomRows(transform),
        }
    }

    const fn skip() -> Self {
        Self {
            title: None,
            display: FieldDisplay::Skip,
        }
    }

    /// Title to show for `key` under this rule.
    pub fn title_for<'a>(&self, key: &'a str) -> &'a str {
        self.title.unwrap_or(key)
    }

    /// Whether the rule emits its own rows.
    pub fn is_custom_row(&self) -> bool {
        matches!(self.display, FieldDisplay::CustomRows(_))
    }

    /// Whether the field is omitted.
    pub fn is_skipped(&self) -> bool {
        matches!(self.display, FieldDisplay::Skip)
    }
}

impl Default for FieldRule {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Rules for the runtime, build and alertmanager responses.
pub const STATUS_RULES: &[(&str, FieldRule)] = &[
    (
        "startTime",
        FieldRule::transformed("Start time", ValueTransform::UtcTimestamp),
    ),
    ("CWD", FieldRule::titled("Working directory")),
    (
        "reloadConfigSuccess",
        FieldRule::transformed("Configuration reload", ValueTransform::ReloadOutcome),
    ),
    (
        "lastConfigTime",
        FieldRule::titled("Last successful configuration reload"),
    ),
    ("chunkCount", FieldRule::titled("Head chunks")),
    ("timeSeriesCount", FieldRule::titled("Head time series")),
    ("corruptionCount", FieldRule::titled("WAL corruptions")),
    ("goroutineCount", FieldRule::titled("Goroutines")),
    ("storageRetention", FieldRule::titled("Storage retention")),
    (
        "activeAlertmanagers",
        FieldRule::custom_rows(RowsTransform::AlertmanagerEndpoints),
    ),
    ("droppedAlertmanagers", FieldRule::skip()),
];

/// A row of a status table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    /// Title cell and value cell.
    Field { title: String, value: String },
    /// Single header cell.
    Header(String),
    /// Alertmanager endpoint.
    Endpoint(EndpointLink),
}

/// A linked endpoint URL, displayed as the linked origin followed by the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointLink {
    /// Link target, the URL exactly as reported.
    pub href: String,
    /// Linked text.
    pub origin: String,
    /// Unlinked text following the link.
    pub path: String,
}

impl EndpointLink {
    /// Split `url` into origin and path. Unparsable URLs are linked whole.
    pub fn parse(url: &str) -> Self {
        match Url::parse(url) {
            Ok(parsed) => Self {
                href: url.to_string(),
                origin: parsed.origin().ascii_serialization(),
                path: parsed.path().to_string(),
            },
            Err(e) => {
                tracing::debug!(url, error = %e, "alertmanager URL did not parse");
                Self {
                    href: url.to_string(),
                    origin: url.to_string(),
                    path: String::new(),
                }
            }
        }
    }
}

/// Applies a rule table to status responses.
#[derive(Debug, Clone, Copy)]
pub struct FieldFormatter {
    rules: &'static [(&'static str, FieldRule)],
}

impl FieldFormatter {
    /// Formatter over an arbitrary rule table.
    pub const fn new(rules: &'static [(&'static str, FieldRule)]) -> Self {
        Self { rules }
    }

    /// Formatter over [`STATUS_RULES`].
    pub const fn status_page() -> Self {
        Self::new(STATUS_RULES)
    }

    /// Rule for `key`, or [`FieldRule::DEFAULT`].
    pub fn rule_for(&self, key: &str) -> FieldRule {
        self.rules
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, rule)| *rule)
            .unwrap_or(FieldRule::DEFAULT)
    }

    /// Table rows for a response, in field order.
    pub fn rows(&self, payload: &StatusPayload) -> Vec<Row> {
        let mut rows = Vec::with_capacity(payload.len());

        for (key, value) in payload {
            let rule = self.rule_for(key);
            match rule.display {
                FieldDisplay::Skip => {}
                FieldDisplay::CustomRows(transform) => rows.extend(transform.apply(value)),
                FieldDisplay::Value(transform) => rows.push(Row::Field {
                    title: rule.title_for(key).to_string(),
                    value: transform.apply(value),
                }),
            }
        }

        rows
    }
}

impl Default for FieldFormatter {
    fn default() -> Self {
        Self::status_page()
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn utc_string(value: &Value) -> String {
    let parsed = match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    };

    match parsed {
        Some(dt) => dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
        None => INVALID_DATE.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
