//! Run configuration document.
//!
//! Produced by the setup UI and consumed read-only by a run. Describes the
//! target school, selected levels with their subject mapping, the class
//! sections, the date range, and the portal session headers.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;

/// Section/class code: two digits, a letter, a digit (e.g. `04A0`).
pub const CLASS_CODE_PATTERN: &str = r"\b\d{2}[A-Z]\d\b";

static CLASS_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(CLASS_CODE_PATTERN).expect("valid regex"));

/// Separators between entries of a raw `classSections` cell.
static SECTION_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[;,\n]+").expect("valid regex"));

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A selected grade level, e.g. `{"code": "04", "name": "Grade 4"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    #[serde(deserialize_with = "string_or_number")]
    pub code: String,
    #[serde(default)]
    pub name: String,
}

/// Inclusive reporting range in `DD/MM/YYYY` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfiguration {
    #[serde(default)]
    pub school_name: String,
    #[serde(default)]
    pub school_short_code: String,
    #[serde(default)]
    pub levels: Vec<Level>,
    /// Level code to subject identifier.
    #[serde(default)]
    pub subject_map_by_level: BTreeMap<String, String>,
    /// Level or class code to human-readable grade label.
    #[serde(default)]
    pub grade_label_map: BTreeMap<String, String>,
    #[serde(default)]
    pub section_codes: Vec<String>,
    /// Section code to friendly label, e.g. `04A0` to `Grade 4 Group 1`.
    #[serde(default)]
    pub section_labels: BTreeMap<String, String>,
    /// Raw master-data cells such as `"04A0 - Grade 4 Group 1; 04A1 - ..."`.
    #[serde(default)]
    pub class_sections: Vec<String>,
    pub date_range: DateRange,
    #[serde(default)]
    pub need_class_reports: bool,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Headers and cookies to send with every portal request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpIdentity {
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
}

/// Class sections discovered for the school, with their friendly labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
    pub codes: Vec<String>,
    pub labels: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl RunConfiguration {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| CoreError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// School short code, or the display name when no code is set.
    pub fn school_key(&self) -> &str {
        let code = self.school_short_code.trim();
        if code.is_empty() {
            self.school_name.trim()
        } else {
            code
        }
    }

    /// Split the `cookie` header (any case) into individual cookies.
    pub fn http_identity(&self) -> HttpIdentity {
        let mut identity = HttpIdentity::default();
        for (name, value) in &self.headers {
            if name.eq_ignore_ascii_case("cookie") {
                for item in value.split("; ") {
                    if let Some((k, v)) = item.split_once('=') {
                        identity
                            .cookies
                            .insert(k.trim().to_string(), v.trim().to_string());
                    }
                }
            } else {
                identity.headers.insert(name.clone(), value.clone());
            }
        }
        identity
    }

    /// Two-digit codes of every selected level.
    pub fn selected_level_codes(&self) -> BTreeSet<String> {
        self.levels
            .iter()
            .map(|l| l.code.trim())
            .filter(|c| !c.is_empty())
            .map(|c| format!("{c:0>2}"))
            .collect()
    }

    /// Merge every section source and keep the sections of selected levels.
    pub fn sections(&self) -> Sections {
        let mut codes: Vec<String> = Vec::new();
        let mut labels: BTreeMap<String, String> = BTreeMap::new();
        let push = |code: &str, codes: &mut Vec<String>| {
            if !codes.iter().any(|c| c == code) {
                codes.push(code.to_string());
            }
        };

        for code in &self.section_codes {
            let code = code.trim();
            if !code.is_empty() {
                push(code, &mut codes);
            }
        }
        for cell in &self.class_sections {
            for (code, label) in parse_class_sections(cell) {
                push(&code, &mut codes);
                labels.insert(code, label);
            }
        }
        for (code, label) in &self.section_labels {
            push(code, &mut codes);
            labels.insert(code.clone(), label.clone());
        }

        let selected = self.selected_level_codes();
        if !selected.is_empty() {
            codes.retain(|c| selected.contains(&level_prefix(c)));
        }
        Sections { codes, labels }
    }
}

/// First two characters of a class code (its level).
pub fn level_prefix(code: &str) -> String {
    code.chars().take(2).collect()
}

/// Parse one master-data cell into `(code, label)` pairs.
///
/// Entries are separated by `;`, `,` or newlines. Text after the class code
/// (minus leading separators) is the label; entries without a code are
/// ignored.
pub fn parse_class_sections(raw: &str) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    for part in SECTION_SPLIT_RE.split(raw) {
        let part = part.trim();
        let Some(m) = CLASS_CODE_RE.find(part) else {
            continue;
        };
        let code = m.as_str().to_string();
        let label = part[m.end()..]
            .trim_start_matches([' ', ':', '-', '–', '—'])
            .trim();
        let label = if label.is_empty() {
            format!("Class {code}")
        } else {
            label.to_string()
        };
        match out.iter_mut().find(|(c, _)| *c == code) {
            Some(existing) => existing.1 = label,
            None => out.push((code, label)),
        }
    }
    out
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RunConfiguration {
        RunConfiguration::from_json(
            r#"{
                "schoolName": "Green Valley School",
                "schoolShortCode": "GVS",
                "levels": [{"code": "04", "name": "Grade 4"}, {"code": 5, "name": "Grade 5"}],
                "subjectMapByLevel": {"04": "subj-4"},
                "gradeLabelMap": {"04": "Grade 4"},
                "classSections": ["04A0 - Grade 4 Group 1; 04A1: Grade 4 Group 2, 06A0 - Grade 6"],
                "dateRange": {"start": "01/04/2024", "end": "30/04/2024"},
                "needClassReports": true,
                "headers": {
                    "user-agent": "harvest-test",
                    "Cookie": "JSESSIONID=abc123; authToken=tok=en"
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn cookie_header_is_split_into_pairs() {
        let identity = sample().http_identity();
        assert_eq!(identity.cookies["JSESSIONID"], "abc123");
        assert_eq!(identity.cookies["authToken"], "tok=en");
        assert!(!identity.headers.contains_key("Cookie"));
        assert_eq!(identity.headers["user-agent"], "harvest-test");
    }

    #[test]
    fn numeric_level_codes_are_zero_padded() {
        let codes = sample().selected_level_codes();
        assert!(codes.contains("04"));
        assert!(codes.contains("05"));
    }

    #[test]
    fn sections_are_parsed_and_filtered_by_level() {
        let sections = sample().sections();
        assert_eq!(sections.codes, vec!["04A0", "04A1"]);
        assert_eq!(sections.labels["04A0"], "Grade 4 Group 1");
        assert_eq!(sections.labels["04A1"], "Grade 4 Group 2");
    }

    #[test]
    fn section_without_label_gets_generic_name() {
        let parsed = parse_class_sections("07B2");
        assert_eq!(parsed, vec![("07B2".to_string(), "Class 07B2".to_string())]);
    }

    #[test]
    fn entries_without_code_are_ignored() {
        assert!(parse_class_sections("nothing here; also nothing").is_empty());
    }

    #[test]
    fn explicit_section_labels_override_parsed_ones() {
        let mut cfg = sample();
        cfg.section_labels
            .insert("04A0".to_string(), "Blue House".to_string());
        assert_eq!(cfg.sections().labels["04A0"], "Blue House");
    }

    #[test]
    fn school_key_prefers_short_code() {
        let mut cfg = sample();
        assert_eq!(cfg.school_key(), "GVS");
        cfg.school_short_code.clear();
        assert_eq!(cfg.school_key(), "Green Valley School");
    }
}
