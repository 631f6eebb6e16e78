//! Production [`ReportTransport`] over [`reqwest`].

use std::time::Duration;

use async_trait::async_trait;
use harvest_core::config::HttpIdentity;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};
use reqwest::Method;

use crate::transport::{PortalError, PortalRequest, PortalResponse, ReportTransport};

/// HTTP client bound to one portal session.
#[cfg_attr(test, derive(Debug))]
pub struct PortalClient {
    client: reqwest::Client,
    headers: HeaderMap,
}

impl PortalClient {
    /// Create a client that sends the identity's headers and cookies on
    /// every request.
    pub fn new(identity: &HttpIdentity) -> Result<Self, PortalError> {
        let client = reqwest::Client::builder().build()?;
        Self::with_client(client, identity)
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, identity: &HttpIdentity) -> Result<Self, PortalError> {
        Ok(Self {
            client,
            headers: session_headers(identity)?,
        })
    }
}

#[async_trait]
impl ReportTransport for PortalClient {
    async fn send(
        &self,
        request: &PortalRequest,
        timeout: Duration,
    ) -> Result<PortalResponse, PortalError> {
        let method_name = request.method.trim().to_ascii_uppercase();
        let method = Method::from_bytes(method_name.as_bytes())
            .map_err(|_| PortalError::InvalidMethod(request.method.clone()))?;

        let builder = self
            .client
            .request(method, &request.url)
            .headers(self.headers.clone())
            .timeout(timeout);
        let builder = if request.is_get() {
            builder.query(&request.params)
        } else {
            builder.form(&request.params)
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        tracing::debug!(url = %request.url, status, bytes = body.len(), "Portal response received");

        Ok(PortalResponse { status, body })
    }
}

// ---- private helpers ----

/// Build the default header map, folding cookies into one `Cookie` header.
fn session_headers(identity: &HttpIdentity) -> Result<HeaderMap, PortalError> {
    let mut headers = HeaderMap::new();
    for (name, value) in &identity.headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| PortalError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| PortalError::InvalidHeader {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        headers.insert(header_name, header_value);
    }

    if !identity.cookies.is_empty() {
        let cookie = identity
            .cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ");
        let value = HeaderValue::from_str(&cookie).map_err(|e| PortalError::InvalidHeader {
            name: COOKIE.to_string(),
            reason: e.to_string(),
        })?;
        headers.insert(COOKIE, value);
    }
    Ok(headers)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::BTreeMap;

    fn identity() -> HttpIdentity {
        HttpIdentity {
            headers: BTreeMap::from([("User-Agent".to_string(), "harvest-test".to_string())]),
            cookies: BTreeMap::from([
                ("JSESSIONID".to_string(), "abc".to_string()),
                ("lang".to_string(), "en".to_string()),
            ]),
        }
    }

    #[test]
    fn headers_include_cookie_line() {
        let headers = session_headers(&identity()).unwrap();
        assert_eq!(headers["user-agent"], "harvest-test");
        assert_eq!(headers[COOKIE], "JSESSIONID=abc; lang=en");
    }

    #[test]
    fn no_cookies_no_cookie_header() {
        let headers = session_headers(&HttpIdentity::default()).unwrap();
        assert!(headers.get(COOKIE).is_none());
    }

    #[test]
    fn invalid_header_name_is_rejected() {
        let identity = HttpIdentity {
            headers: BTreeMap::from([("bad header".to_string(), "x".to_string())]),
            cookies: BTreeMap::new(),
        };
        assert_matches!(
            PortalClient::new(&identity),
            Err(PortalError::InvalidHeader { name, .. }) if name == "bad header"
        );
    }

    #[tokio::test]
    async fn invalid_method_fails_before_sending() {
        let client = PortalClient::new(&identity()).unwrap();
        let request = PortalRequest {
            method: "NOT A METHOD".to_string(),
            url: "http://127.0.0.1:9/never".to_string(),
            params: Vec::new(),
        };
        assert_matches!(
            client.send(&request, Duration::from_secs(1)).await,
            Err(PortalError::InvalidMethod(_))
        );
    }
}
