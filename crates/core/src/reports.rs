//! Built-in report classification.
//!
//! Every report the harvester knows about has a [`ReportScope`] (how many
//! invocations it expands into) and an [`ExtractionMode`] (where its rows
//! live in the response payload). Catalog entries named `Class ...` that
//! are not listed here are picked up as custom per-class reports.

use serde::{Deserialize, Serialize};

use crate::catalog::ReportCatalog;

// ---------------------------------------------------------------------------
// Report names
// ---------------------------------------------------------------------------

pub const SCHOOL_LOGINS: &str = "School Logins Report";
pub const SCHOOL_LESSONS_USAGE: &str = "School Lessons Usage Report";
pub const SCHOOL_ASSIGNMENTS_USAGE: &str = "School Assignments Usage Report";
pub const LEVEL_LESSONS_PER_CLASS: &str = "Level Lessons Usage Report for each Class";

pub const TEACHER_LOG_QUIZ: &str = "Teacher Assignment Log Quiz";
pub const TEACHER_LOG_WORKSHEET: &str = "Teacher Assignment Log Worksheet";
pub const TEACHER_LOG_PRASSO: &str = "Teacher Assignment Log Prasso";
pub const TEACHER_LOG_READING: &str = "Teacher Assignment Log Reading";

pub const ALL_TEACHERS_LOGINS: &str = "All Teachers Usage Logins";
pub const ALL_TEACHERS_LESSONS: &str = "All Teachers Usage Lesson Accessed";
pub const ALL_TEACHERS_ASSIGNMENTS: &str = "All Teachers Usage Assignments assigned";

pub const CLASS_LOGIN: &str = "Class Login Report";
pub const CLASS_LESSONS: &str = "Class Lessons Report";
pub const CLASS_ASSIGNMENT: &str = "Class Assignment Report";

/// The one report whose date window is decided by the server.
pub const STUDENT_QUIZ_PERFORMANCE: &str = "Student Quiz Performance Report";

/// Prefix marking catalog entries as class-scoped custom reports.
pub const CLASS_REPORT_PREFIX: &str = "Class ";

/// Keys under which known server variants wrap their row lists.
pub const ALIAS_KEYS: [&str; 5] = ["data", "TABLE_DATA", "tableData", "tableJSON", "lessoninfo"];

/// Catalog spelling of [`ExtractionMode::DirectList`].
pub const DIRECT_LIST: &str = "direct_list";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How many invocations a report expands into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportScope {
    /// One invocation for the whole school.
    School,
    /// One invocation per selected level; the level code is the class code.
    Level,
    /// One invocation per level that has a subject mapping.
    LevelSubject,
    /// One invocation per class section; gated by `needClassReports`.
    Class,
}

/// Where the rows of a report live in its decoded payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionMode {
    /// The payload is the list, or wraps it under one of [`ALIAS_KEYS`].
    DirectList,
    /// The list is under this key, falling back to [`ALIAS_KEYS`].
    Keyed(String),
}

impl ExtractionMode {
    /// Parse a catalog `extract` value.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            None
        } else if raw == DIRECT_LIST {
            Some(Self::DirectList)
        } else {
            Some(Self::Keyed(raw.to_string()))
        }
    }
}

/// Static row of the built-in report table.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinReport {
    pub name: &'static str,
    pub scope: ReportScope,
    /// `None` means a direct list.
    pub key: Option<&'static str>,
}

/// Built-in reports in execution order.
pub const BUILTIN_REPORTS: &[BuiltinReport] = &[
    BuiltinReport { name: SCHOOL_LOGINS, scope: ReportScope::School, key: Some("TABLE_DATA") },
    BuiltinReport { name: SCHOOL_LESSONS_USAGE, scope: ReportScope::School, key: Some("TABLE_DATA") },
    BuiltinReport { name: SCHOOL_ASSIGNMENTS_USAGE, scope: ReportScope::School, key: Some("TABLE_DATA") },
    BuiltinReport { name: LEVEL_LESSONS_PER_CLASS, scope: ReportScope::Level, key: Some("TABLE_DATA") },
    BuiltinReport { name: TEACHER_LOG_QUIZ, scope: ReportScope::LevelSubject, key: None },
    BuiltinReport { name: TEACHER_LOG_WORKSHEET, scope: ReportScope::LevelSubject, key: None },
    BuiltinReport { name: TEACHER_LOG_PRASSO, scope: ReportScope::LevelSubject, key: None },
    BuiltinReport { name: TEACHER_LOG_READING, scope: ReportScope::LevelSubject, key: None },
    BuiltinReport { name: ALL_TEACHERS_LOGINS, scope: ReportScope::School, key: None },
    BuiltinReport { name: ALL_TEACHERS_LESSONS, scope: ReportScope::School, key: Some("lessoninfo") },
    BuiltinReport { name: ALL_TEACHERS_ASSIGNMENTS, scope: ReportScope::School, key: Some("tableJSON") },
    BuiltinReport { name: CLASS_LOGIN, scope: ReportScope::Class, key: Some("data") },
    BuiltinReport { name: CLASS_LESSONS, scope: ReportScope::Class, key: None },
    BuiltinReport { name: CLASS_ASSIGNMENT, scope: ReportScope::Class, key: Some("data") },
    // Returns {"data": "[{...}]"}; the inner string is decoded again.
    BuiltinReport { name: STUDENT_QUIZ_PERFORMANCE, scope: ReportScope::Class, key: Some("data") },
];

/// A report selected for planning, built-in or custom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedReport {
    pub name: String,
    pub scope: ReportScope,
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

pub fn builtin(name: &str) -> Option<&'static BuiltinReport> {
    BUILTIN_REPORTS.iter().find(|r| r.name == name)
}

/// Extraction mode for a report: built-in table first, then the catalog's
/// own `extract` field for custom reports.
pub fn extraction_mode(name: &str, catalog_extract: Option<&str>) -> Option<ExtractionMode> {
    match builtin(name) {
        Some(r) => Some(match r.key {
            Some(key) => ExtractionMode::Keyed(key.to_string()),
            None => ExtractionMode::DirectList,
        }),
        None => catalog_extract.and_then(ExtractionMode::parse),
    }
}

/// Whether a report is subject to the academic-window probe.
pub fn uses_academic_window(name: &str) -> bool {
    name == STUDENT_QUIZ_PERFORMANCE
}

/// Built-in reports followed by any custom `Class ...` catalog entries.
pub fn report_order(catalog: &ReportCatalog) -> Vec<PlannedReport> {
    let mut order: Vec<PlannedReport> = BUILTIN_REPORTS
        .iter()
        .map(|r| PlannedReport {
            name: r.name.to_string(),
            scope: r.scope,
        })
        .collect();

    for name in catalog.names() {
        if name.starts_with(CLASS_REPORT_PREFIX) && !order.iter().any(|r| r.name == name) {
            order.push(PlannedReport {
                name: name.to_string(),
                scope: ReportScope::Class,
            });
        }
    }
    order
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
