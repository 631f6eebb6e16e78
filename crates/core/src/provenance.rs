//! Provenance records written next to harvested files.
//!
//! Every CSV gets a `<file>.meta.json` sidecar holding a [`FileRecord`], and
//! each run ends with one `run_manifest.json` ([`RunManifest`]) listing every
//! file produced and every invocation that failed.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Suffix appended to a CSV path to name its sidecar.
pub const SIDECAR_SUFFIX: &str = ".meta.json";

/// Manifest file name inside the run directory.
pub const MANIFEST_FILE: &str = "run_manifest.json";

/// Second-precision local timestamp without offset, e.g. `2024-04-30T17:05:09`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Timestamp suffix of generated run ids.
pub const RUN_ID_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Where an invocation's date range came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowSource {
    Configured,
    Academic,
}

/// Provenance of one written file; serialized as the sidecar and as a
/// manifest entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub report_name: String,
    pub file_name: String,
    pub file_path: String,
    pub url: String,
    pub method: String,
    pub class_code: String,
    pub subject_code: String,
    /// Effective range; the academic window when one was resolved.
    pub start_date: String,
    pub end_date: String,
    pub saved_at: String,
    pub row_count: usize,
    pub class_label: String,
    pub window_source: WindowSource,
    /// SHA-256 of the CSV bytes as written.
    pub sha256: String,
}

/// An attempted invocation that produced no file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationFailure {
    pub report_name: String,
    pub class_code: String,
    pub subject_code: String,
    pub reason: String,
}

/// Run-level summary written once when the run completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunManifest {
    pub run_id: String,
    pub school: String,
    pub school_short_code: String,
    pub start_date: String,
    pub end_date: String,
    pub output_dir: String,
    pub generated_at: String,
    pub files: Vec<FileRecord>,
    #[serde(default)]
    pub failures: Vec<InvocationFailure>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn format_timestamp(at: &Timestamp) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// `<school>_<start label>_<end label>_<YYYYMMDD_HHMMSS>`.
pub fn generate_run_id(school_key: &str, start_label: &str, end_label: &str, at: &Timestamp) -> String {
    format!(
        "{school_key}_{start_label}_{end_label}_{}",
        at.format(RUN_ID_STAMP_FORMAT)
    )
}

/// Sidecar path for a written file.
pub fn sidecar_path(file_path: &str) -> String {
    format!("{file_path}{SIDECAR_SUFFIX}")
}

/// Serialize a record or manifest to pretty-printed JSON.
pub fn serialize_record<T: Serialize>(record: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(record)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    fn at() -> Timestamp {
        Local.with_ymd_and_hms(2024, 4, 30, 17, 5, 9).unwrap()
    }

    fn record() -> FileRecord {
        FileRecord {
            report_name: "Class Login Report".to_string(),
            file_name: "Class Login_Grade_4_GVS.csv".to_string(),
            file_path: "out/run/Class Login_Grade_4_GVS.csv".to_string(),
            url: "https://portal.test/login".to_string(),
            method: "GET".to_string(),
            class_code: "04A0".to_string(),
            subject_code: String::new(),
            start_date: "01/04/2024".to_string(),
            end_date: "30/04/2024".to_string(),
            saved_at: format_timestamp(&at()),
            row_count: 3,
            class_label: "Grade 4".to_string(),
            window_source: WindowSource::Configured,
            sha256: "abc".to_string(),
        }
    }

    #[test]
    fn record_uses_camel_case_keys() {
        let json = serialize_record(&record()).unwrap();
        for key in [
            "\"reportName\"",
            "\"fileName\"",
            "\"filePath\"",
            "\"classCode\"",
            "\"subjectCode\"",
            "\"savedAt\"",
            "\"rowCount\"",
            "\"classLabel\"",
            "\"windowSource\": \"configured\"",
        ] {
            assert!(json.contains(key), "missing {key} in {json}");
        }
    }

    #[test]
    fn timestamps_have_second_precision() {
        assert_eq!(format_timestamp(&at()), "2024-04-30T17:05:09");
    }

    #[test]
    fn run_id_embeds_school_and_labels() {
        assert_eq!(
            generate_run_id("GVS", "01-04-2024", "30-04-2024", &at()),
            "GVS_01-04-2024_30-04-2024_20240430_170509"
        );
    }

    #[test]
    fn sidecar_sits_next_to_file() {
        assert_eq!(sidecar_path("out/a.csv"), "out/a.csv.meta.json");
    }

    #[test]
    fn manifest_without_failures_still_parses() {
        let manifest = RunManifest {
            run_id: "r".to_string(),
            school: "Green Valley".to_string(),
            school_short_code: "GVS".to_string(),
            start_date: "01/04/2024".to_string(),
            end_date: "30/04/2024".to_string(),
            output_dir: "out/r".to_string(),
            generated_at: format_timestamp(&at()),
            files: vec![record()],
            failures: Vec::new(),
        };
        let mut value = serde_json::to_value(&manifest).unwrap();
        value.as_object_mut().unwrap().remove("failures");
        let parsed: RunManifest = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, manifest);
    }
}
