//! Blocking `reqwest` transport.

use std::time::Duration;

use reqwest::header::ACCEPT;
use tracing::debug;

use ssogate_auth::{HttpResponse, HttpTransport, RequestBody, TransportError};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Production transport. Each call blocks the calling thread until the
/// response body is read or the timeout elapses.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ssogate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn post(&self, url: &str, body: &RequestBody) -> Result<HttpResponse, TransportError> {
        let request = self.client.post(url).header(ACCEPT, "application/json");
        let request = match body {
            RequestBody::Json(value) => request.json(value),
            RequestBody::Form(pairs) => request.form(pairs),
        };

        let response = request
            .send()
            .map_err(|e| TransportError(e.without_url().to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| TransportError(format!("failed to read response body: {}", e.without_url())))?;

        debug!(url, status, "outbound request completed");
        Ok(HttpResponse { status, body })
    }
}
