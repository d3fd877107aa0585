//! Rendering of upstream payloads and errors as human readable markdown.
//!
//! The upstream schema is not fixed here: records may arrive bare or wrapped in a `data` field,
//! and any field may be missing. Renderers show what is present and skip the rest.

use crate::error::Error;
use serde_json::Value;
use std::fmt::Write as _;

/// Labelled fields shown for an organization record, in display order.
const ORGANIZATION_FIELDS: &[(&str, &str)] = &[
    ("ein", "EIN"),
    ("city", "City"),
    ("state", "State"),
    ("zip", "ZIP"),
    ("ntee_cd", "NTEE code"),
    ("subsection", "Subsection"),
    ("deductibility", "Deductibility"),
    ("ruling", "Ruling date"),
    ("asset_amt", "Assets"),
    ("income_amt", "Income"),
    ("revenue_amt", "Revenue"),
];

/// Unwrap a `{ "data": ... }` envelope if present.
fn unwrap_data(payload: &Value) -> &Value {
    payload.get("data").unwrap_or(payload)
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Bool(b) => Some(if *b { "yes" } else { "no" }.to_string()),
        other => Some(other.to_string()),
    }
}

fn field(record: &Value, key: &str) -> Option<String> {
    record.get(key).and_then(text)
}

fn name_of(record: &Value) -> String {
    field(record, "name").unwrap_or_else(|| "Unnamed organization".to_string())
}

/// Full record for a single organization.
pub fn organization(payload: &Value) -> String {
    let record = unwrap_data(payload);
    if !record.is_object() {
        return "No organization data returned.".to_string();
    }

    let mut out = format!("# {}\n", name_of(record));
    for (key, label) in ORGANIZATION_FIELDS {
        if let Some(value) = field(record, key) {
            let _ = write!(out, "\n- **{label}:** {value}");
        }
    }
    out
}

/// Public-charity status line for `ein`.
pub fn public_charity(ein: &str, payload: &Value) -> String {
    let record = unwrap_data(payload);
    match record.get("public_charity").and_then(Value::as_bool) {
        Some(true) => format!("EIN {ein} is a registered public charity."),
        Some(false) => format!("EIN {ein} is not a registered public charity."),
        None => format!("Public charity status for EIN {ein} is unavailable."),
    }
}

fn items(payload: &Value) -> &[Value] {
    match unwrap_data(payload) {
        Value::Array(items) => items.as_slice(),
        _ => &[],
    }
}

fn summary_line(index: usize, record: &Value) -> String {
    let mut line = format!("{}. **{}**", index + 1, name_of(record));
    if let Some(ein) = field(record, "ein") {
        let _ = write!(line, " (EIN {ein})");
    }
    let place: Vec<String> = ["city", "state"].iter().filter_map(|k| field(record, k)).collect();
    if !place.is_empty() {
        let _ = write!(line, " - {}", place.join(", "));
    }
    line
}

/// Numbered result list plus pagination footer when the payload carries one.
pub fn search_results(payload: &Value) -> String {
    let results = items(payload);
    if results.is_empty() {
        return "No organizations matched the search.".to_string();
    }

    let mut out = format!("Found {} organization(s):\n", results.len());
    for (i, record) in results.iter().enumerate() {
        let _ = write!(out, "\n{}", summary_line(i, record));
    }

    if let Some(pagination) = payload.get("pagination") {
        let total = pagination.get("total").and_then(Value::as_u64);
        let offset = pagination.get("offset").and_then(Value::as_u64).unwrap_or(0);
        if let Some(total) = total {
            let shown_to = offset + results.len() as u64;
            let _ = write!(out, "\n\nShowing {}-{} of {}", offset + 1, shown_to, total);
            if shown_to < total {
                let _ = write!(out, " (use offset {shown_to} for more)");
            }
            out.push('.');
        }
    }
    out
}

/// Recently changed organizations.
pub fn listing(payload: &Value) -> String {
    let results = items(payload);
    if results.is_empty() {
        return "No organizations changed in that period.".to_string();
    }
    let mut out = format!("{} organization(s) changed:\n", results.len());
    for (i, record) in results.iter().enumerate() {
        let _ = write!(out, "\n{}", summary_line(i, record));
    }
    out
}

/// User-facing text for any gateway error. `now_ms` turns rate-limit resets into a wait.
pub fn render_error(error: &Error, now_ms: u64) -> String {
    match error {
        Error::Validation(e) => match e.field() {
            Some(field) => format!("Invalid input for `{field}`: {}", e.message()),
            None => format!("Invalid input: {}", e.message()),
        },
        Error::Upstream(e) => match e.status_code() {
            Some(404) => "No matching organization was found.".to_string(),
            Some(429) => "The charity registry is rate limiting requests; retry later.".to_string(),
            Some(401) | Some(403) => {
                format!("The charity registry rejected our credentials ({}).", e.message())
            }
            Some(400) => format!("The charity registry rejected the request: {}.", e.message()),
            Some(status) if status >= 500 => format!(
                "The charity registry is having trouble (HTTP {status}); try again shortly."
            ),
            _ => format!("Could not reach the charity registry: {}", e.message()),
        },
        Error::RateLimited { reset_at_ms, .. } => {
            let wait_secs = reset_at_ms.saturating_sub(now_ms).div_ceil(1_000);
            if wait_secs == 0 {
                "Rate limit reached; try again now.".to_string()
            } else {
                format!("Rate limit reached; try again in {wait_secs} second(s).")
            }
        }
        Error::Cancelled { .. } => "The request was cancelled.".to_string(),
        Error::Config(_) | Error::InvalidConfig(_) => format!("Gateway misconfigured: {error}"),
    }
}
