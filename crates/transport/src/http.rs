//! reqwest-backed transport
//!
//! POSTs the descriptor's JSON body to `<base_url><path>` with a fixed per-call
//! timeout. Upstream status codes are returned verbatim; only requests that
//! never produced a complete response become a `TransportFailure`.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde_json::Value;
use tracing::{Instrument, debug, debug_span, warn};

use crate::{ApiResponse, RequestDescriptor, Transport, TransportFailure, TransportResult};

/// HTTP transport for the JSON API.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Absolute URL for an API path.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn execute(&self, request: &RequestDescriptor) -> TransportResult {
        let url = self.url_for(request.path());
        let mut headers = request.headers().clone();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let sent = self
            .client
            .request(request.method().clone(), &url)
            .headers(headers)
            .timeout(self.timeout)
            .json(request.body())
            .send()
            .await;

        let response = match sent {
            Ok(r) => r,
            Err(e) => return Err(self.failure(request.path(), e)),
        };

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.failure(request.path(), e))?;

        debug!(status = status.as_u16(), bytes = bytes.len(), "response received");

        Ok(ApiResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body: decode_body(&bytes),
        })
    }

    fn failure(&self, path: &str, error: reqwest::Error) -> TransportFailure {
        if error.is_timeout() {
            warn!(path, timeout_secs = self.timeout.as_secs(), "request timed out");
            TransportFailure::timeout(format!(
                "request to {path} timed out after {}s",
                self.timeout.as_secs()
            ))
        } else {
            warn!(path, error = %error, "request failed before a response arrived");
            TransportFailure::connection(format!("request to {path} failed: {error}"))
        }
    }
}

impl Transport for HttpTransport {
    fn id(&self) -> &str {
        "http"
    }

    fn send<'a>(
        &'a self,
        request: &'a RequestDescriptor,
    ) -> Pin<Box<dyn Future<Output = TransportResult> + Send + 'a>> {
        let span = debug_span!("http_send", method = %request.method(), path = request.path());
        Box::pin(self.execute(request).instrument(span))
    }
}

/// Decode a response body: JSON when possible, otherwise the raw text.
fn decode_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
