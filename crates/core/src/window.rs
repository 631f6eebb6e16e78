//! Academic reporting window discovery.
//!
//! The student-performance report only accepts the window the portal has
//! configured for the school, which is not known up front. A probe request
//! over a wide window (1 January of the current year to today) returns the
//! school's historical windows in two buckets; the most recently created
//! record's `fromToDate` gives the academic start date.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde_json::Value;

use crate::config::DateRange;
use crate::normalize::{decode_body, decode_nested};

/// Probe buckets, merged in this order before sorting.
pub const WINDOW_BUCKETS: [&str; 2] = ["newData", "oldData"];

pub const CREATED_FIELD: &str = "createdDate";
pub const WINDOW_FIELD: &str = "fromToDate";

/// `DD/MM/YY(YY) - DD/MM/YY(YY)`, anchored at the start.
static WINDOW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{2}/\d{2}/\d{2,4})\s*-\s*(\d{2}/\d{2}/\d{2,4})\s*").expect("valid regex")
});

/// Result of academic-window resolution for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcademicWindow {
    /// The portal reported a window; `end` is today.
    Resolved { start: String, end: String },
    /// The probe failed or was inconclusive; the configured range applies.
    FellBackToConfigured,
}

impl AcademicWindow {
    /// The range to query with, given the configured fallback.
    pub fn effective(&self, configured: &DateRange) -> DateRange {
        match self {
            Self::Resolved { start, end } => DateRange {
                start: start.clone(),
                end: end.clone(),
            },
            Self::FellBackToConfigured => configured.clone(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }
}

/// `DD/MM/YYYY` form used by the portal.
pub fn portal_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Query pairs for the probe request.
pub fn probe_params(class_code: &str, today: NaiveDate) -> Vec<(String, String)> {
    vec![
        ("timePeriod".to_string(), "predefined".to_string()),
        ("startDate".to_string(), format!("01/01/{}", today.year())),
        ("endDate".to_string(), portal_date(today)),
        ("levelSection".to_string(), class_code.to_string()),
    ]
}

/// Resolve the window from a raw probe body.
pub fn resolve_from_body(body: &[u8], today: NaiveDate) -> AcademicWindow {
    match decode_body(body) {
        Ok(value) => resolve_from_value(&value, today),
        Err(_) => AcademicWindow::FellBackToConfigured,
    }
}

/// Resolve the window from a decoded probe payload.
pub fn resolve_from_value(value: &Value, today: NaiveDate) -> AcademicWindow {
    match latest_window_start(value) {
        Some(start) => AcademicWindow::Resolved {
            start,
            end: portal_date(today),
        },
        None => AcademicWindow::FellBackToConfigured,
    }
}

/// Start date of the most recently created window record.
///
/// Both buckets are merged and sorted once, newest first; on equal
/// timestamps the earlier record (from `newData`) wins.
pub fn latest_window_start(value: &Value) -> Option<String> {
    let obj = decode_nested(value.clone());
    let data = match &obj {
        Value::Object(map) => map.get("data").cloned().unwrap_or(Value::Null),
        other => other.clone(),
    };
    let payload = decode_nested(data);
    let Value::Object(payload) = payload else {
        return None;
    };

    let mut items: Vec<&Value> = Vec::new();
    for bucket in WINDOW_BUCKETS {
        if let Some(Value::Object(records)) = payload.get(bucket) {
            items.extend(records.values());
        }
    }
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));

    let newest = items.first()?;
    let text = match newest.get(WINDOW_FIELD)? {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    WINDOW_RE
        .captures(&text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn created_at(item: &Value) -> i64 {
    match item.get(CREATED_FIELD) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
