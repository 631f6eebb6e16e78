//! Report catalog: the versioned list of report definitions.
//!
//! The catalog document is either a bare JSON list of definitions or an
//! object wrapping that list under `"reports"`. It is loaded once per run
//! and never mutated.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum number of near-miss names suggested for an unknown report.
pub const MAX_SUGGESTIONS: usize = 3;

/// Minimum normalized similarity for a catalog name to be suggested.
pub const SUGGESTION_CUTOFF: f64 = 0.5;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A single report endpoint as described by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDefinition {
    pub name: String,
    pub method: String,
    pub url: String,

    /// Body of a JSON object with `<class>`, `<subject>`, `<start_date>`
    /// and `<end_date>` placeholders, e.g. `"levelSection":"<class>"`.
    #[serde(default)]
    pub params: String,

    #[serde(default, alias = "outfile")]
    pub output_file: Option<String>,

    /// Header used when the server returns zero rows.
    #[serde(default, alias = "expectedFields")]
    pub expected_headers: Vec<String>,

    /// Extraction mode for custom reports (`"direct_list"` or a key name).
    #[serde(default)]
    pub extract: Option<String>,
}

impl ReportDefinition {
    /// Filename template, falling back to `<name>.csv`.
    pub fn output_template(&self) -> String {
        match self.output_file.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => format!("{}.csv", self.name),
        }
    }

    pub fn is_get(&self) -> bool {
        self.method.trim().eq_ignore_ascii_case("GET")
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogDocument {
    Wrapped { reports: Vec<ReportDefinition> },
    List(Vec<ReportDefinition>),
}

/// The loaded, read-only set of report definitions.
#[derive(Debug, Clone, Default)]
pub struct ReportCatalog {
    reports: Vec<ReportDefinition>,
}

impl ReportCatalog {
    pub fn new(reports: Vec<ReportDefinition>) -> Self {
        Self { reports }
    }

    /// Parse a catalog document (list or `{"reports": [...]}`).
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let doc: CatalogDocument = serde_json::from_str(text)?;
        let reports = match doc {
            CatalogDocument::Wrapped { reports } => reports,
            CatalogDocument::List(reports) => reports,
        };
        Ok(Self { reports })
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

    pub fn get(&self, name: &str) -> Option<&ReportDefinition> {
        self.reports.iter().find(|r| r.name == name)
    }

    pub fn reports(&self) -> &[ReportDefinition] {
        &self.reports
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.reports.iter().map(|r| r.name.as_str())
    }

    /// Catalog names most similar to `name`, best first.
    ///
    /// Used to diagnose run-plan entries that do not match any definition.
    pub fn close_matches(&self, name: &str) -> Vec<String> {
        let mut scored: Vec<(f64, &str)> = self
            .names()
            .map(|candidate| (strsim::normalized_levenshtein(name, candidate), candidate))
            .filter(|(score, _)| *score >= SUGGESTION_CUTOFF)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .map(|(_, n)| n.to_string())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
