//! Transport abstraction for the JSON API
//!
//! Defines the `Transport` trait that decouples the authenticated-request
//! pipeline from the HTTP stack. `HttpTransport` is the reqwest-backed
//! implementation; tests substitute scripted fakes behind the same trait.
//!
//! A transport never interprets a response. Every completed exchange comes
//! back as an `ApiResponse` (status, status text, decoded body), and only a
//! request that never produced a response becomes a `TransportFailure`.

pub mod http;
pub mod request;

pub use http::HttpTransport;
pub use request::RequestDescriptor;

use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

/// A completed HTTP exchange with its body decoded.
///
/// Bodies that are not valid JSON are carried as `Value::String`, and an
/// empty body is `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// Canonical reason phrase for `status` (e.g. "Unauthorized")
    pub status_text: String,
    pub body: Value,
}

impl ApiResponse {
    /// Build a response, deriving the status text from the status code.
    pub fn new(status: u16, body: Value) -> Self {
        let status_text = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_string();
        Self {
            status,
            status_text,
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A request that never reached a response (connect error, timeout, body read failure).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportFailure {
    pub message: String,
    pub timed_out: bool,
}

impl TransportFailure {
    pub fn connection(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: true,
        }
    }
}

/// Outcome of one transport call.
pub type TransportResult = std::result::Result<ApiResponse, TransportFailure>;

/// Sends request descriptors to the remote API.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn Transport>`).
pub trait Transport: Send + Sync {
    /// Identifier for logging (e.g. "http", "scripted")
    fn id(&self) -> &str;

    /// Send one request and wait for its outcome. Implementations apply their
    /// own fixed timeout; an expired timeout is reported as a `TransportFailure`.
    fn send<'a>(
        &'a self,
        request: &'a RequestDescriptor,
    ) -> Pin<Box<dyn Future<Output = TransportResult> + Send + 'a>>;
}
