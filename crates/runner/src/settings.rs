//! Process settings loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Portal endpoint used to discover the academic window.
pub const DEFAULT_PROBE_URL: &str = "https://report.heymath.com/reports/generateReport.action";

pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("{var} must be a whole number of seconds, got {value:?}")]
    InvalidSeconds { var: &'static str, value: String },
}

/// Where a run reads its inputs, writes its outputs, and how long it waits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestSettings {
    /// Run configuration JSON (default: `config.json`).
    pub config_path: PathBuf,
    /// Report catalog JSON (default: `report_def_final.json`).
    pub catalog_path: PathBuf,
    /// Parent of the per-run directory (default: `report_outputs`).
    pub output_root: PathBuf,
    /// Fixed run id; generated when unset.
    pub run_id: Option<String>,
    pub probe_url: String,
    pub probe_timeout: Duration,
    pub request_timeout: Duration,
}

impl HarvestSettings {
    /// Load settings from the process environment.
    ///
    /// | Env Var                        | Default                 |
    /// |--------------------------------|-------------------------|
    /// | `HARVEST_CONFIG`               | `config.json`           |
    /// | `HARVEST_CATALOG`              | `report_def_final.json` |
    /// | `HARVEST_OUTDIR`               | `report_outputs`        |
    /// | `HARVEST_RUN_ID`               | generated               |
    /// | `HARVEST_PROBE_URL`            | portal report endpoint  |
    /// | `HARVEST_PROBE_TIMEOUT_SECS`   | `20`                    |
    /// | `HARVEST_REQUEST_TIMEOUT_SECS` | `30`                    |
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let var = |name: &str, default: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let seconds = |name: &'static str, default: u64| -> Result<Duration, SettingsError> {
            match lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
                None => Ok(Duration::from_secs(default)),
                Some(value) => value
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| SettingsError::InvalidSeconds { var: name, value }),
            }
        };

        Ok(Self {
            config_path: var("HARVEST_CONFIG", "config.json").into(),
            catalog_path: var("HARVEST_CATALOG", "report_def_final.json").into(),
            output_root: var("HARVEST_OUTDIR", "report_outputs").into(),
            run_id: lookup("HARVEST_RUN_ID")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            probe_url: var("HARVEST_PROBE_URL", DEFAULT_PROBE_URL),
            probe_timeout: seconds("HARVEST_PROBE_TIMEOUT_SECS", DEFAULT_PROBE_TIMEOUT_SECS)?,
            request_timeout: seconds("HARVEST_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let settings = HarvestSettings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.config_path, PathBuf::from("config.json"));
        assert_eq!(settings.catalog_path, PathBuf::from("report_def_final.json"));
        assert_eq!(settings.output_root, PathBuf::from("report_outputs"));
        assert_eq!(settings.run_id, None);
        assert_eq!(settings.probe_url, DEFAULT_PROBE_URL);
        assert_eq!(settings.probe_timeout, Duration::from_secs(20));
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn overrides_are_read() {
        let settings = HarvestSettings::from_lookup(lookup(&[
            ("HARVEST_OUTDIR", "/tmp/out"),
            ("HARVEST_RUN_ID", " nightly "),
            ("HARVEST_PROBE_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(settings.output_root, PathBuf::from("/tmp/out"));
        assert_eq!(settings.run_id.as_deref(), Some("nightly"));
        assert_eq!(settings.probe_timeout, Duration::from_secs(5));
    }

    #[test]
    fn blank_run_id_means_generated() {
        let settings = HarvestSettings::from_lookup(lookup(&[("HARVEST_RUN_ID", "  ")])).unwrap();
        assert_eq!(settings.run_id, None);
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let err = HarvestSettings::from_lookup(lookup(&[("HARVEST_REQUEST_TIMEOUT_SECS", "soon")]));
        assert_matches!(
            err,
            Err(SettingsError::InvalidSeconds { var: "HARVEST_REQUEST_TIMEOUT_SECS", .. })
        );
    }
}
