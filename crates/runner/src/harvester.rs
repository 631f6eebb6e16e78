//! Sequential execution of a run plan.
//!
//! [`Harvester::run`] walks the plan in order, one invocation at a time.
//! Each invocation builds its parameters, optionally probes the academic
//! window, fetches the report, normalizes and cleans the rows, and writes a
//! CSV plus sidecar. Any error stays inside its invocation: it is logged,
//! recorded in the manifest's failure list, and the run moves on.

use std::collections::HashSet;
use std::time::Duration;

use chrono::NaiveDate;
use harvest_core::config::RunConfiguration;
use harvest_core::error::CoreError;
use harvest_core::naming::{date_label, disambiguate, output_filename, ClassLabels};
use harvest_core::normalize::{decode_body, normalize, NormalizeError, Normalized};
use harvest_core::params::{build_params, to_pairs, ParamValues, END_DATE_KEY, START_DATE_KEY};
use harvest_core::plan::{Invocation, PlanDiagnostics, RunPlan};
use harvest_core::provenance::{
    format_timestamp, generate_run_id, FileRecord, InvocationFailure, RunManifest, WindowSource,
};
use harvest_core::reports::{extraction_mode, uses_academic_window};
use harvest_core::sanitize::clean_row;
use harvest_core::types::{NormalizedRow, Timestamp};
use harvest_core::window::{probe_params, resolve_from_body, AcademicWindow};
use harvest_portal::{PortalError, PortalRequest, ReportTransport};
use serde_json::Value;

use crate::output::{OutputError, OutputWriter};
use crate::settings::HarvestSettings;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Why a single invocation produced no file.
#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    #[error(transparent)]
    Params(#[from] CoreError),

    #[error(transparent)]
    Portal(#[from] PortalError),

    #[error(transparent)]
    Decode(#[from] NormalizeError),

    #[error("No extraction mode defined for [{0}]")]
    UndefinedExtraction(String),

    #[error("No usable rows, payload {shape}; sample: {sample}")]
    Unusable { shape: String, sample: String },

    #[error(transparent)]
    Output(#[from] OutputError),
}

// ---------------------------------------------------------------------------
// Options / context
// ---------------------------------------------------------------------------

/// Network knobs for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestOptions {
    pub probe_url: String,
    pub probe_timeout: Duration,
    pub request_timeout: Duration,
}

impl From<&HarvestSettings> for HarvestOptions {
    fn from(settings: &HarvestSettings) -> Self {
        Self {
            probe_url: settings.probe_url.clone(),
            probe_timeout: settings.probe_timeout,
            request_timeout: settings.request_timeout,
        }
    }
}

/// Identity of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub run_id: String,
    /// Run start; its date is "today" for academic-window probes.
    pub started_at: Timestamp,
}

impl RunContext {
    /// Use `run_id` when given, otherwise generate one from the school and
    /// configured dates.
    pub fn new(run_id: Option<String>, config: &RunConfiguration, started_at: Timestamp) -> Self {
        let run_id = run_id.unwrap_or_else(|| {
            generate_run_id(
                config.school_key(),
                &date_label(&config.date_range.start),
                &date_label(&config.date_range.end),
                &started_at,
            )
        });
        Self { run_id, started_at }
    }

    pub fn today(&self) -> NaiveDate {
        self.started_at.date_naive()
    }
}

// ---------------------------------------------------------------------------
// Harvester
// ---------------------------------------------------------------------------

pub struct Harvester<T> {
    transport: T,
    config: RunConfiguration,
    options: HarvestOptions,
    writer: OutputWriter,
    run: RunContext,
}

impl<T: ReportTransport> Harvester<T> {
    pub fn new(
        transport: T,
        config: RunConfiguration,
        options: HarvestOptions,
        writer: OutputWriter,
        run: RunContext,
    ) -> Self {
        Self {
            transport,
            config,
            options,
            writer,
            run,
        }
    }

    /// Execute every invocation of `plan` and write the run manifest.
    ///
    /// Never fails: per-invocation errors end up in
    /// [`RunManifest::failures`], a manifest write error is logged.
    pub async fn run(&self, plan: &RunPlan) -> RunManifest {
        log_diagnostics(&plan.diagnostics);
        tracing::info!(
            run_id = %self.run.run_id,
            invocations = plan.invocations.len(),
            sections = plan.sections.codes.len(),
            "Starting harvest run",
        );

        let labels = ClassLabels {
            sections: &plan.sections.labels,
            grades: &self.config.grade_label_map,
        };
        let mut manifest = RunManifest {
            run_id: self.run.run_id.clone(),
            school: self.config.school_name.clone(),
            school_short_code: self.config.school_short_code.clone(),
            start_date: self.config.date_range.start.clone(),
            end_date: self.config.date_range.end.clone(),
            output_dir: self.writer.dir().display().to_string(),
            generated_at: format_timestamp(&self.run.started_at),
            files: Vec::new(),
            failures: Vec::new(),
        };

        // File names already written this run.
        let mut written = HashSet::new();
        for invocation in &plan.invocations {
            match self.execute(invocation, labels, &mut written).await {
                Ok(record) => manifest.files.push(record),
                Err(err) => {
                    tracing::warn!(
                        report = %invocation.report.name,
                        class_code = invocation.class_code(),
                        subject_code = invocation.subject_code(),
                        error = %err,
                        "Invocation failed",
                    );
                    manifest.failures.push(InvocationFailure {
                        report_name: invocation.report.name.clone(),
                        class_code: invocation.class_code().to_string(),
                        subject_code: invocation.subject_code().to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        match self.writer.write_manifest(&manifest) {
            Ok(path) => tracing::info!(
                path = %path.display(),
                files = manifest.files.len(),
                failures = manifest.failures.len(),
                "Wrote run manifest",
            ),
            Err(e) => tracing::warn!(error = %e, "Could not write run manifest"),
        }
        manifest
    }

    /// Run one invocation through to a written file.
    ///
    /// `written` holds the file names taken so far; a name that repeats one
    /// of them is disambiguated instead of overwriting the earlier file.
    async fn execute(
        &self,
        invocation: &Invocation,
        labels: ClassLabels<'_>,
        written: &mut HashSet<String>,
    ) -> Result<FileRecord, InvocationError> {
        let report = &invocation.report;
        let class_code = invocation.class_code();
        let subject_code = invocation.subject_code();

        let window = if uses_academic_window(&report.name) {
            self.resolve_window(class_code).await
        } else {
            AcademicWindow::FellBackToConfigured
        };
        let range = window.effective(&self.config.date_range);
        let window_source = if window.is_resolved() {
            WindowSource::Academic
        } else {
            WindowSource::Configured
        };

        let mut params = build_params(
            report,
            ParamValues {
                class_code,
                subject_code,
                start_date: &range.start,
                end_date: &range.end,
            },
        )?;
        if window.is_resolved() {
            params.insert(START_DATE_KEY.to_string(), Value::String(range.start.clone()));
            params.insert(END_DATE_KEY.to_string(), Value::String(range.end.clone()));
            tracing::info!(
                report = %report.name,
                class_code,
                start = %range.start,
                end = %range.end,
                "Using academic window",
            );
        }

        let request = PortalRequest {
            method: report.method.clone(),
            url: report.url.clone(),
            params: to_pairs(&params),
        };
        let response = self
            .transport
            .send(&request, self.options.request_timeout)
            .await?;
        tracing::info!(
            report = %report.name,
            class_code,
            subject_code,
            status = response.status,
            "Report fetched",
        );
        let response = response.ensure_success()?;

        let payload = decode_body(&response.body)?;
        let mode = extraction_mode(&report.name, report.extract.as_deref());
        let row_set = match normalize(mode.as_ref(), &payload) {
            Normalized::Rows(rows) => rows,
            Normalized::Undefined => {
                return Err(InvocationError::UndefinedExtraction(report.name.clone()))
            }
            Normalized::Unusable { shape, sample } => {
                return Err(InvocationError::Unusable { shape, sample })
            }
        };

        let (fields, rows): (Vec<String>, Vec<NormalizedRow>) = if row_set.is_empty() {
            (report.expected_headers.clone(), Vec::new())
        } else {
            let rows = row_set.rows.iter().map(clean_row).collect();
            (row_set.fields, rows)
        };

        let class_label = labels.resolve(class_code);
        let file_name = output_filename(
            &report.output_template(),
            &class_label,
            &date_label(&range.start),
            &date_label(&range.end),
            &self.config.school_name,
        );
        let file_name = disambiguate(&file_name, &[class_code, subject_code], |name| {
            written.contains(name)
        });
        let saved = self.writer.write_csv(&file_name, &fields, &rows)?;
        written.insert(file_name.clone());
        if rows.is_empty() {
            tracing::warn!(report = %report.name, class_code, path = %saved.path.display(), "Saved header-only CSV");
        } else {
            tracing::info!(report = %report.name, class_code, rows = rows.len(), path = %saved.path.display(), "Saved CSV");
        }

        let record = FileRecord {
            report_name: report.name.clone(),
            file_name,
            file_path: saved.path.display().to_string(),
            url: report.url.clone(),
            method: report.method.clone(),
            class_code: class_code.to_string(),
            subject_code: subject_code.to_string(),
            start_date: range.start,
            end_date: range.end,
            saved_at: format_timestamp(&chrono::Local::now()),
            row_count: rows.len(),
            class_label,
            window_source,
            sha256: saved.sha256,
        };
        if let Err(e) = self.writer.write_sidecar(&record) {
            tracing::warn!(path = %record.file_path, error = %e, "Could not write sidecar");
        }
        Ok(record)
    }

    /// Probe the portal for the academic window of `class_code`.
    ///
    /// Every failure falls back to the configured range.
    async fn resolve_window(&self, class_code: &str) -> AcademicWindow {
        let today = self.run.today();
        let request = PortalRequest::get(&self.options.probe_url, probe_params(class_code, today));
        let response = self
            .transport
            .send(&request, self.options.probe_timeout)
            .await
            .and_then(|r| r.ensure_success());

        match response {
            Ok(response) => {
                let window = resolve_from_body(&response.body, today);
                if !window.is_resolved() {
                    tracing::debug!(class_code, "Probe had no academic window, using configured range");
                }
                window
            }
            Err(e) => {
                tracing::debug!(class_code, error = %e, "Academic window probe failed, using configured range");
                AcademicWindow::FellBackToConfigured
            }
        }
    }
}

fn log_diagnostics(diagnostics: &PlanDiagnostics) {
    for missing in &diagnostics.missing_reports {
        tracing::error!(
            report = %missing.name,
            suggestions = ?missing.suggestions,
            "Report not found in catalog",
        );
    }
    for level in &diagnostics.levels_without_subject {
        tracing::warn!(level = %level.code, name = %level.name, "No subject mapped for level, skipping teacher logs");
    }
    for name in &diagnostics.skipped_class_reports {
        tracing::info!(report = %name, "Skipping class report, class reports disabled");
    }
    for name in &diagnostics.reports_without_sections {
        tracing::warn!(report = %name, "No class sections to run against");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    fn config() -> RunConfiguration {
        RunConfiguration::from_json(
            r#"{"schoolName": "Green Valley", "schoolShortCode": "",
                "dateRange": {"start": "01/04/2024", "end": "30/04/2024"}}"#,
        )
        .unwrap()
    }

    #[test]
    fn run_id_is_generated_from_school_and_dates() {
        let at = Local.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let run = RunContext::new(None, &config(), at);
        assert_eq!(run.run_id, "Green Valley_01-04-2024_30-04-2024_20240501_080000");
        assert_eq!(run.today(), NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
    }

    #[test]
    fn supplied_run_id_wins() {
        let run = RunContext::new(Some("nightly".to_string()), &config(), Local::now());
        assert_eq!(run.run_id, "nightly");
    }

    #[test]
    fn unusable_error_mentions_shape() {
        let err = InvocationError::Unusable {
            shape: "keys [status]".to_string(),
            sample: "{status: \"ok\"}".to_string(),
        };
        assert!(err.to_string().contains("keys [status]"));
    }

    #[test]
    fn options_follow_settings() {
        let settings = HarvestSettings::from_lookup(|_| None).unwrap();
        let options = HarvestOptions::from(&settings);
        assert_eq!(options.probe_timeout, Duration::from_secs(20));
        assert!(options.request_timeout > options.probe_timeout);
    }
}
