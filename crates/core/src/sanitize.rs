//! Field-level cleaning of harvested values before they reach a CSV file.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::types::NormalizedRow;

/// Values a spreadsheet would read as a float, e.g. `5E2` or `1.2E+05`.
static SCIENTIFIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+)?[Ee][+-]?\d+$").expect("valid regex"));

/// Marker left behind when UTF-8 text was decoded as Latin-1 once too often.
const MOJIBAKE_SIGNATURE: char = 'Ã';

/// Undo one round of UTF-8-read-as-Latin-1 corruption.
///
/// Only attempted when the signature is present and no replacement
/// character is; returns `None` when the text cannot be repaired.
pub fn repair_mojibake(s: &str) -> Option<String> {
    if !s.contains(MOJIBAKE_SIGNATURE) || s.contains(char::REPLACEMENT_CHARACTER) {
        return None;
    }
    let bytes = s
        .chars()
        .map(|c| u8::try_from(u32::from(c)).ok())
        .collect::<Option<Vec<u8>>>()?;
    String::from_utf8(bytes).ok()
}

/// Collapse `||` artifacts to a space and strip stray edge pipes.
pub fn strip_double_pipes(s: &str) -> String {
    s.trim()
        .replace("||", " ")
        .trim()
        .trim_matches('|')
        .to_string()
}

/// Wrap bare scientific-notation values as `="..."` so they stay text.
pub fn excel_text_guard(s: &str) -> String {
    if SCIENTIFIC_RE.is_match(s) {
        format!("=\"{s}\"")
    } else {
        s.to_string()
    }
}

pub fn clean_str(raw: &str) -> String {
    let mut s = raw.trim().to_string();
    if let Some(repaired) = repair_mojibake(&s) {
        s = repaired;
    }
    excel_text_guard(&strip_double_pipes(&s))
}

/// Clean a single value; non-strings pass through unchanged.
pub fn clean_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(clean_str(s)),
        other => other.clone(),
    }
}

pub fn clean_row(row: &NormalizedRow) -> NormalizedRow {
    row.iter().map(|(k, v)| (k.clone(), clean_value(v))).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
