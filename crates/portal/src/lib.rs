//! HTTP access to the reporting portal.
//!
//! - [`ReportTransport`] is the seam the harvester talks to; tests swap in
//!   a scripted implementation.
//! - [`PortalClient`] is the production transport over [`reqwest`], carrying
//!   the session headers and cookies from the run configuration.

pub mod client;
pub mod transport;

pub use client::PortalClient;
pub use transport::{PortalError, PortalRequest, PortalResponse, ReportTransport};
