use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

static VECTOR_TYPE_DIMS: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\[(\d+)\]").ok());

/// Best-effort namespace metadata. Zero means unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub approx_item_count: u64,
    pub dimensions: usize,
    pub region: String,
}

impl IndexStats {
    pub fn unknown(region: impl Into<String>) -> Self {
        Self {
            approx_item_count: 0,
            dimensions: 0,
            region: region.into(),
        }
    }

    /// Read counts and dimensions out of a namespace metadata body.
    ///
    /// Dimensions come from a top-level `dimensions` field, else from the
    /// vector attribute's schema type (e.g. `"[768]f32"`).
    pub fn from_metadata(body: &Value, region: &str) -> Self {
        let approx_item_count = body
            .get("approx_row_count")
            .or_else(|| body.get("approx_count"))
            .and_then(Value::as_u64)
            .unwrap_or(0);

        let dimensions = body
            .get("dimensions")
            .and_then(Value::as_u64)
            .map(|d| d as usize)
            .or_else(|| vector_type(body).and_then(dimensions_from_type))
            .unwrap_or(0);

        Self {
            approx_item_count,
            dimensions,
            region: region.to_string(),
        }
    }
}

fn vector_type(body: &Value) -> Option<&str> {
    let vector = body.get("schema")?.get("vector")?;
    match vector {
        Value::String(ty) => Some(ty.as_str()),
        Value::Object(map) => map.get("type").and_then(Value::as_str),
        _ => None,
    }
}

fn dimensions_from_type(ty: &str) -> Option<usize> {
    VECTOR_TYPE_DIMS
        .as_ref()?
        .captures(ty)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}
