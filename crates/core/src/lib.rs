//! Domain logic for the report harvester.
//!
//! Loads the report catalog and run configuration, expands them into a
//! run plan, builds request parameters, resolves the academic window from
//! a probe payload, normalizes and cleans response rows, and names and
//! describes the files a run produces. Nothing in this crate touches the
//! network.

pub mod catalog;
pub mod config;
pub mod error;
pub mod hashing;
pub mod naming;
pub mod normalize;
pub mod params;
pub mod plan;
pub mod provenance;
pub mod reports;
pub mod sanitize;
pub mod types;
pub mod window;

pub use catalog::{ReportCatalog, ReportDefinition};
pub use config::RunConfiguration;
pub use error::CoreError;
pub use plan::{build_run_plan, Invocation, RunPlan};
