//! Response payload normalization.
//!
//! Portal responses come in many shapes: bare lists, objects wrapping the
//! list under one of several keys, and JSON that has been string-encoded
//! one or more times. This module decodes a body down to a JSON value,
//! extracts the row-bearing part according to an [`ExtractionMode`], and
//! validates it as a rectangular [`RowSet`].

use serde_json::Value;

use crate::reports::{ExtractionMode, ALIAS_KEYS};
use crate::types::NormalizedRow;

/// Length of raw-payload samples attached to diagnostics.
pub const SAMPLE_CHARS: usize = 240;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("Response body is not JSON: {0}")]
    NotJson(#[source] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Rows of one invocation with the union of their field names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    /// Union of keys across rows, in first-seen order.
    pub fields: Vec<String>,
    pub rows: Vec<NormalizedRow>,
}

impl RowSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Outcome of normalizing one response.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// No extraction mode is known for the report.
    Undefined,
    /// The payload is present but not a list of records.
    Unusable { shape: String, sample: String },
    /// A list of records, possibly empty.
    Rows(RowSet),
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Parse a raw response body into a fully decoded JSON value.
///
/// Invalid UTF-8 is decoded lossily. Mojibake is left in place; string
/// values are repaired later by [`crate::sanitize::clean_row`].
pub fn decode_body(bytes: &[u8]) -> Result<Value, NormalizeError> {
    let text = String::from_utf8_lossy(bytes);
    let value = serde_json::from_str::<Value>(&text).map_err(NormalizeError::NotJson)?;
    Ok(decode_nested(value))
}

/// Keep parsing while the value is a string holding JSON.
pub fn decode_nested(mut value: Value) -> Value {
    while let Value::String(s) = &value {
        match serde_json::from_str::<Value>(s) {
            Ok(inner) => value = inner,
            Err(_) => break,
        }
    }
    value
}

/// `null`, `false`, or the strings `"false"`, `"null"`, `""`.
pub fn is_no_rows_marker(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => {
            let s = s.trim();
            s.is_empty() || s.eq_ignore_ascii_case("false") || s.eq_ignore_ascii_case("null")
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Pick the row-bearing value out of a decoded payload.
///
/// Returns `None` when the payload has no recognisable row location.
pub fn extract_values(mode: &ExtractionMode, payload: &Value) -> Option<Value> {
    let obj = decode_nested(payload.clone());
    if is_no_rows_marker(&obj) {
        return Some(Value::Array(Vec::new()));
    }

    let extracted = match (mode, &obj) {
        (ExtractionMode::DirectList, Value::Array(_)) => return Some(obj),
        (ExtractionMode::DirectList, Value::Object(map)) => first_alias(map)?.clone(),
        (ExtractionMode::Keyed(key), Value::Object(map)) => match map.get(key.as_str()) {
            Some(v) => v.clone(),
            None => first_alias(map)?.clone(),
        },
        _ => return None,
    };

    let extracted = decode_nested(extracted);
    if is_no_rows_marker(&extracted) {
        Some(Value::Array(Vec::new()))
    } else {
        Some(extracted)
    }
}

fn first_alias(map: &serde_json::Map<String, Value>) -> Option<&Value> {
    ALIAS_KEYS.iter().find_map(|k| map.get(*k))
}

/// Accept only a list whose every element is an object.
pub fn ensure_rows(values: Value) -> Option<RowSet> {
    let Value::Array(items) = values else {
        return None;
    };

    let mut set = RowSet::default();
    for item in items {
        let Value::Object(row) = item else {
            return None;
        };
        for key in row.keys() {
            if !set.fields.iter().any(|f| f == key) {
                set.fields.push(key.clone());
            }
        }
        set.rows.push(row);
    }
    Some(set)
}

/// Full normalization of a decoded payload for one report.
pub fn normalize(mode: Option<&ExtractionMode>, payload: &Value) -> Normalized {
    let Some(mode) = mode else {
        return Normalized::Undefined;
    };
    match extract_values(mode, payload).and_then(ensure_rows) {
        Some(rows) => Normalized::Rows(rows),
        None => Normalized::Unusable {
            shape: describe_shape(payload),
            sample: sample(payload),
        },
    }
}

/// Top-level keys of an object, or the JSON type name otherwise.
pub fn describe_shape(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("keys [{}]", keys.join(", "))
        }
        Value::Array(_) => "array".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::Bool(_) => "bool".to_string(),
        Value::Null => "null".to_string(),
    }
}

/// Short excerpt of a payload; objects show their first two entries.
pub fn sample(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .take(2)
                .map(|(k, v)| format!("{k}: {}", truncate(&v.to_string(), SAMPLE_CHARS / 2)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
        other => truncate(&other.to_string(), SAMPLE_CHARS),
    }
}

/// First `max` characters of `s`.
pub fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
