//! Row normalization.
//!
//! The index service has returned rows in more than one layout over time:
//! attributes flattened next to `id`/`$dist`, or nested under `attributes`
//! with `dist`. Each field is read through an ordered fallback chain and a
//! missing field degrades to a sentinel instead of failing the row.
//!
//! | field    | chain                                          |
//! |----------|------------------------------------------------|
//! | text     | `text` → `attributes.text` → `"N/A"`           |
//! | id       | `id` → `attributes.id` → `"N/A"`               |
//! | distance | `$dist` → `dist` → `0.0`                       |

use serde_json::Value;

use crate::query::SearchResult;
use crate::SearchError;

pub const MISSING_FIELD: &str = "N/A";

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn attribute<'a>(row: &'a Value, key: &str) -> Option<&'a Value> {
    row.get("attributes").and_then(|attrs| attrs.get(key))
}

/// Turn one raw row into a [`SearchResult`]. Never fails.
pub fn normalize_row(row: &Value) -> SearchResult {
    let text = row
        .get("text")
        .and_then(as_text)
        .or_else(|| attribute(row, "text").and_then(as_text))
        .unwrap_or_else(|| MISSING_FIELD.to_string());

    let id = row
        .get("id")
        .and_then(as_text)
        .or_else(|| attribute(row, "id").and_then(as_text))
        .unwrap_or_else(|| MISSING_FIELD.to_string());

    let distance = row
        .get("$dist")
        .and_then(Value::as_f64)
        .or_else(|| row.get("dist").and_then(Value::as_f64))
        .unwrap_or(0.0);

    SearchResult { id, text, distance }
}

/// Normalize a query response body, keeping the service's rank order.
///
/// Accepts `{"rows": [...]}` or a bare array of rows.
pub fn normalize_rows(body: &Value) -> Result<Vec<SearchResult>, SearchError> {
    let rows = match body {
        Value::Array(rows) => rows,
        Value::Object(map) => match map.get("rows") {
            Some(Value::Array(rows)) => rows,
            Some(Value::Null) | None => return Ok(Vec::new()),
            Some(_) => {
                return Err(SearchError::from_remote(
                    None,
                    "`rows` in query response is not an array",
                ))
            }
        },
        _ => {
            return Err(SearchError::from_remote(
                None,
                "unsupported query response shape",
            ))
        }
    };
    Ok(rows.iter().map(normalize_row).collect())
}
