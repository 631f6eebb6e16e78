//! Request/response types and the transport seam.

use std::time::Duration;

use async_trait::async_trait;
use harvest_core::normalize::{truncate, SAMPLE_CHARS};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors from the portal HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The portal answered with a non-2xx status.
    #[error("Portal returned HTTP {status}: {excerpt}")]
    Status {
        status: u16,
        /// Leading part of the body, for the log.
        excerpt: String,
    },

    #[error("Invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("Unsupported HTTP method {0}")]
    InvalidMethod(String),
}

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

/// One call to a portal endpoint.
///
/// `params` go in the query string for `GET` and in a URL-encoded form body
/// for every other method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalRequest {
    pub method: String,
    pub url: String,
    pub params: Vec<(String, String)>,
}

impl PortalRequest {
    pub fn get(url: impl Into<String>, params: Vec<(String, String)>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            params,
        }
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// Value of the first parameter named `key`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Raw portal answer; the body is decoded by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl PortalResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Return the response unchanged on 2xx, or a [`PortalError::Status`]
    /// carrying a body excerpt.
    pub fn ensure_success(self) -> Result<Self, PortalError> {
        if self.is_success() {
            return Ok(self);
        }
        Err(PortalError::Status {
            status: self.status,
            excerpt: truncate(&String::from_utf8_lossy(&self.body), SAMPLE_CHARS),
        })
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Sends requests to the portal. Implementations must not retry.
#[async_trait]
pub trait ReportTransport: Send + Sync {
    async fn send(
        &self,
        request: &PortalRequest,
        timeout: Duration,
    ) -> Result<PortalResponse, PortalError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
