//! Report harvesting run: settings, the sequential [`Harvester`], and the
//! output writer for CSV files, sidecars and the run manifest.

pub mod harvester;
pub mod output;
pub mod settings;

pub use harvester::{HarvestOptions, Harvester, InvocationError, RunContext};
pub use output::{OutputError, OutputWriter};
pub use settings::HarvestSettings;
