//! Shared fixtures for runner integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, TimeZone};
use harvest_core::types::Timestamp;
use harvest_core::{build_run_plan, ReportCatalog, RunConfiguration, RunPlan};
use harvest_portal::{PortalError, PortalRequest, PortalResponse, ReportTransport};
use harvest_runner::{HarvestOptions, Harvester, OutputWriter, RunContext};

pub const PROBE_URL: &str = "https://portal.test/probe";

/// Canned answer for a route.
#[derive(Clone)]
pub enum Reply {
    Body { status: u16, body: String },
    /// Connection-level failure.
    Unreachable,
}

struct Route {
    url: String,
    class_code: Option<String>,
    reply: Reply,
}

/// In-memory transport answering by URL (and optionally `levelSection`).
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    routes: Arc<Vec<Route>>,
    log: Arc<Mutex<Vec<(PortalRequest, Duration)>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, url: &str, status: u16, body: impl Into<String>) -> Self {
        self.push(url, None, Reply::Body { status, body: body.into() })
    }

    pub fn route_for_class(self, url: &str, class_code: &str, body: impl Into<String>) -> Self {
        self.push(
            url,
            Some(class_code),
            Reply::Body { status: 200, body: body.into() },
        )
    }

    pub fn unreachable(self, url: &str) -> Self {
        self.push(url, None, Reply::Unreachable)
    }

    fn push(mut self, url: &str, class_code: Option<&str>, reply: Reply) -> Self {
        let routes = Arc::get_mut(&mut self.routes).expect("routes are configured before use");
        routes.push(Route {
            url: url.to_string(),
            class_code: class_code.map(str::to_string),
            reply,
        });
        self
    }

    /// Every request sent so far, with its timeout.
    pub fn requests(&self) -> Vec<(PortalRequest, Duration)> {
        self.log.lock().unwrap().clone()
    }

    pub fn requests_to(&self, url: &str) -> Vec<PortalRequest> {
        self.requests()
            .into_iter()
            .filter(|(r, _)| r.url == url)
            .map(|(r, _)| r)
            .collect()
    }
}

#[async_trait]
impl ReportTransport for ScriptedTransport {
    async fn send(
        &self,
        request: &PortalRequest,
        timeout: Duration,
    ) -> Result<PortalResponse, PortalError> {
        self.log.lock().unwrap().push((request.clone(), timeout));

        let route = self.routes.iter().find(|route| {
            route.url == request.url
                && route
                    .class_code
                    .as_deref()
                    .map_or(true, |c| request.param("levelSection") == Some(c))
        });
        match route.map(|r| r.reply.clone()) {
            Some(Reply::Body { status, body }) => Ok(PortalResponse {
                status,
                body: body.into_bytes(),
            }),
            Some(Reply::Unreachable) => {
                let err = reqwest::Client::new().get("://unreachable").build().unwrap_err();
                Err(PortalError::Request(err))
            }
            None => Ok(PortalResponse {
                status: 404,
                body: b"no such route".to_vec(),
            }),
        }
    }
}

/// Fixed run start: 15 October 2024, 09:30 local.
pub fn started_at() -> Timestamp {
    Local.with_ymd_and_hms(2024, 10, 15, 9, 30, 0).unwrap()
}

pub fn options() -> HarvestOptions {
    HarvestOptions {
        probe_url: PROBE_URL.to_string(),
        probe_timeout: Duration::from_secs(20),
        request_timeout: Duration::from_secs(30),
    }
}

/// Catalog entry JSON for tests.
pub fn report(name: &str, method: &str, url: &str, output_file: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "method": method,
        "url": url,
        "params": "\"startDate\":\"<start_date>\",\"endDate\":\"<end_date>\",\"levelSection\":\"<class>\"",
        "outputFile": output_file,
    })
}

/// Everything a test needs to drive one run.
pub struct Harness {
    pub dir: tempfile::TempDir,
    pub plan: RunPlan,
    pub harvester: Harvester<ScriptedTransport>,
    pub transport: ScriptedTransport,
}

pub fn harness(
    reports: Vec<serde_json::Value>,
    config: serde_json::Value,
    transport: ScriptedTransport,
) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let catalog = ReportCatalog::from_json(&serde_json::json!({ "reports": reports }).to_string()).unwrap();
    let config = RunConfiguration::from_json(&config.to_string()).unwrap();
    let plan = build_run_plan(&catalog, &config);

    let run = RunContext::new(Some("test-run".to_string()), &config, started_at());
    let writer = OutputWriter::create(dir.path().join(&run.run_id)).unwrap();
    let harvester = Harvester::new(transport.clone(), config, options(), writer, run);

    Harness {
        dir,
        plan,
        harvester,
        transport,
    }
}

/// Base configuration: class reports off, April 2024.
pub fn base_config() -> serde_json::Value {
    serde_json::json!({
        "schoolName": "Green Valley",
        "schoolShortCode": "GVS",
        "dateRange": {"start": "01/04/2024", "end": "30/04/2024"},
        "needClassReports": false,
        "headers": {"cookie": "JSESSIONID=abc"}
    })
}

/// CSV text without the byte-order mark.
pub fn read_csv(path: &std::path::Path) -> String {
    let bytes = std::fs::read(path).unwrap();
    assert!(bytes.starts_with(harvest_runner::output::UTF8_BOM));
    String::from_utf8(bytes[3..].to_vec()).unwrap()
}
