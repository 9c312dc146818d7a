//! HTML rendering of the status page.
//!
//! Produces Bootstrap-flavoured markup: an alert box on failure, a spinner
//! while loading, and one titled table per endpoint once every read has
//! succeeded. All text coming from the server is escaped.

use crate::fetch::{CombinedFetch, PageState, StatusEndpoint, StatusPayload};
use crate::format::{FieldFormatter, Row};
use html_escape::{encode_double_quoted_attribute, encode_text};

/// Markup shown while any read is outstanding.
pub const LOADING_INDICATOR: &str = r#"<i class="fas fa-spinner fa-spin fa-3x position-absolute" style="transform: translate(-50%, -50%); top: 50%; left: 50%" aria-label="Loading"></i>"#;

/// Render the page body for the current fetch state.
pub fn render_page(fetch: &CombinedFetch, formatter: &FieldFormatter) -> String {
    match fetch.page_state() {
        PageState::Failed(message) => render_error(message),
        PageState::Loading => LOADING_INDICATOR.to_string(),
        PageState::Ready(payloads) => {
            let mut out = String::new();
            for (endpoint, payload) in StatusEndpoint::ALL.iter().zip(payloads) {
                out.push_str(&render_section(endpoint.title(), payload, formatter));
            }
            out
        }
    }
}

/// Alert box for a failed read.
pub fn render_error(message: &str) -> String {
    format!(
        r#"<div class="alert alert-danger" role="alert"><strong>Error:</strong> Error fetching status: {}</div>"#,
        encode_text(message)
    )
}

/// Heading plus table for one response.
pub fn render_section(title: &str, payload: &StatusPayload, formatter: &FieldFormatter) -> String {
    let mut out = format!(
        r#"<h2>{}</h2><table class="table table-sm table-bordered table-striped h-auto"><tbody>"#,
        encode_text(title)
    );
    for row in formatter.rows(payload) {
        out.push_str(&render_row(&row));
    }
    out.push_str("</tbody></table>");
    out
}

/// A single table row.
pub fn render_row(row: &Row) -> String {
    match row {
        Row::Field { title, value } => format!(
            r#"<tr><th class="capitalize-title" style="width: 35%">{}</th><td class="text-break">{}</td></tr>"#,
            encode_text(title),
            encode_text(value)
        ),
        Row::Header(title) => format!("<tr><th>{}</th></tr>", encode_text(title)),
        Row::Endpoint(link) => format!(
            r#"<tr><td><a href="{}">{}</a>{}</td></tr>"#,
            encode_double_quoted_attribute(&link.href),
            encode_text(&link.origin),
            encode_text(&link.path)
        ),
    }
}

/// Wrap a rendered body in a standalone HTML document.
pub fn render_document(body: &str) -> String {
    format!(
        concat!(
            "<!DOCTYPE html>\n",
            "<html lang=\"en\">\n",
            "<head>\n",
            "<meta charset=\"utf-8\">\n",
            "<title>Status</title>\n",
            "</head>\n",
            "<body>\n",
            "<div class=\"container-fluid\">\n",
            "{}\n",
            "</div>\n",
            "</body>\n",
            "</html>\n"
        ),
        body
    )
}
