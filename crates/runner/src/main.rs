//! `harvest-runner` -- one report-harvesting run against the portal.
//!
//! Loads the report catalog and run configuration, expands them into a run
//! plan, executes every invocation in order, and writes CSV files with
//! sidecars and a run manifest into a fresh run directory.
//!
//! # Environment variables
//!
//! | Variable                       | Default                 | Description                          |
//! |--------------------------------|-------------------------|--------------------------------------|
//! | `HARVEST_CONFIG`               | `config.json`           | Run configuration JSON               |
//! | `HARVEST_CATALOG`              | `report_def_final.json` | Report catalog JSON                  |
//! | `HARVEST_OUTDIR`               | `report_outputs`        | Parent of the run directory          |
//! | `HARVEST_RUN_ID`               | generated               | Run directory name                   |
//! | `HARVEST_PROBE_URL`            | portal report endpoint  | Academic-window probe endpoint       |
//! | `HARVEST_PROBE_TIMEOUT_SECS`   | `20`                    | Probe request timeout                |
//! | `HARVEST_REQUEST_TIMEOUT_SECS` | `30`                    | Report request timeout               |

use anyhow::Context;
use harvest_core::{build_run_plan, ReportCatalog, RunConfiguration};
use harvest_portal::PortalClient;
use harvest_runner::{HarvestOptions, HarvestSettings, Harvester, OutputWriter, RunContext};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "harvest_runner=info,harvest_portal=info,harvest_core=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = HarvestSettings::from_env()?;

    let catalog = ReportCatalog::load(&settings.catalog_path)?;
    let config = RunConfiguration::load(&settings.config_path)?;

    let run = RunContext::new(settings.run_id.clone(), &config, chrono::Local::now());
    let run_dir = settings.output_root.join(&run.run_id);
    let writer = OutputWriter::create(&run_dir)
        .with_context(|| format!("Could not create output directory {}", run_dir.display()))?;

    tracing::info!(
        run_id = %run.run_id,
        output_dir = %run_dir.display(),
        school = %config.school_name,
        reports = catalog.reports().len(),
        "Starting harvest-runner",
    );

    let plan = build_run_plan(&catalog, &config);
    let client = PortalClient::new(&config.http_identity())?;
    let harvester = Harvester::new(
        client,
        config,
        HarvestOptions::from(&settings),
        writer,
        run,
    );
    let manifest = harvester.run(&plan).await;

    tracing::info!(
        files = manifest.files.len(),
        failures = manifest.failures.len(),
        "Done",
    );
    Ok(())
}
