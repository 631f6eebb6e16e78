//! Run-plan construction.
//!
//! Expands the report table against the catalog and the run configuration
//! into the ordered list of [`Invocation`]s a run executes. Nothing here is
//! fatal: unknown reports, levels without a subject, and disabled class
//! reports are collected into [`PlanDiagnostics`] for the caller to log.

use serde::Serialize;

use crate::catalog::{ReportCatalog, ReportDefinition};
use crate::config::{Level, RunConfiguration, Sections};
use crate::reports::{report_order, ReportScope};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One concrete unit of work against the portal.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub report: ReportDefinition,
    pub class_code: Option<String>,
    pub subject_code: Option<String>,
}

impl Invocation {
    pub fn school_wide(report: &ReportDefinition) -> Self {
        Self {
            report: report.clone(),
            class_code: None,
            subject_code: None,
        }
    }

    pub fn for_class(report: &ReportDefinition, class_code: &str) -> Self {
        Self {
            report: report.clone(),
            class_code: Some(class_code.to_string()),
            subject_code: None,
        }
    }

    pub fn class_code(&self) -> &str {
        self.class_code.as_deref().unwrap_or("")
    }

    pub fn subject_code(&self) -> &str {
        self.subject_code.as_deref().unwrap_or("")
    }
}

/// A planned report name with no catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingReport {
    pub name: String,
    /// Closest catalog names, best first.
    pub suggestions: Vec<String>,
}

/// Non-fatal findings produced while planning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanDiagnostics {
    pub missing_reports: Vec<MissingReport>,
    /// Class-scoped reports skipped because class reports are disabled.
    pub skipped_class_reports: Vec<String>,
    /// Class-scoped reports that had no sections to run against.
    pub reports_without_sections: Vec<String>,
    /// Selected levels with no subject mapping.
    pub levels_without_subject: Vec<Level>,
}

/// The full ordered plan for a run.
#[derive(Debug, Clone, Default)]
pub struct RunPlan {
    pub invocations: Vec<Invocation>,
    pub sections: Sections,
    pub diagnostics: PlanDiagnostics,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Build the run plan for `config` against `catalog`.
pub fn build_run_plan(catalog: &ReportCatalog, config: &RunConfiguration) -> RunPlan {
    let mut plan = RunPlan::default();

    let (subject_runs, missing_subjects) = level_subject_pairs(config);
    plan.diagnostics.levels_without_subject = missing_subjects;

    if config.need_class_reports {
        plan.sections = config.sections();
    }

    for planned in report_order(catalog) {
        if planned.scope == ReportScope::Class && !config.need_class_reports {
            plan.diagnostics.skipped_class_reports.push(planned.name);
            continue;
        }

        let Some(report) = catalog.get(&planned.name) else {
            let suggestions = catalog.close_matches(&planned.name);
            plan.diagnostics.missing_reports.push(MissingReport {
                name: planned.name,
                suggestions,
            });
            continue;
        };

        match planned.scope {
            ReportScope::School => plan.invocations.push(Invocation::school_wide(report)),
            ReportScope::Level => {
                let before = plan.invocations.len();
                for level in &config.levels {
                    let code = level.code.trim();
                    if !code.is_empty() {
                        plan.invocations.push(Invocation::for_class(report, code));
                    }
                }
                if plan.invocations.len() == before {
                    plan.invocations.push(Invocation::school_wide(report));
                }
            }
            ReportScope::LevelSubject => {
                if subject_runs.is_empty() {
                    plan.invocations.push(Invocation::school_wide(report));
                }
                for (level_code, subject) in &subject_runs {
                    plan.invocations.push(Invocation {
                        report: report.clone(),
                        class_code: Some(level_code.clone()),
                        subject_code: Some(subject.clone()),
                    });
                }
            }
            ReportScope::Class => {
                if plan.sections.codes.is_empty() {
                    plan.diagnostics.reports_without_sections.push(planned.name);
                }
                for code in &plan.sections.codes {
                    plan.invocations.push(Invocation::for_class(report, code));
                }
            }
        }
    }

    plan
}

/// Pair each selected level with its subject, collecting unmapped levels.
fn level_subject_pairs(config: &RunConfiguration) -> (Vec<(String, String)>, Vec<Level>) {
    let mut runs = Vec::new();
    let mut missing = Vec::new();
    for level in &config.levels {
        let code = level.code.trim();
        if code.is_empty() {
            continue;
        }
        match config.subject_map_by_level.get(code).map(|s| s.trim()) {
            Some(subject) if !subject.is_empty() => {
                runs.push((code.to_string(), subject.to_string()));
            }
            _ => missing.push(level.clone()),
        }
    }
    (runs, missing)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
