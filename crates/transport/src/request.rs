//! Outgoing request descriptor
//!
//! A descriptor is a value. Attaching a credential or marking a retry returns a
//! new descriptor, so the caller's copy is never aliased or mutated in place.

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue};
use serde_json::Value;

/// Method, path, JSON body and headers of one logical API call.
///
/// `retried` is private: the only way to set it is `into_retry`, which
/// consumes the descriptor.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    path: String,
    body: Value,
    headers: HeaderMap,
    retried: bool,
}

impl RequestDescriptor {
    /// Create a descriptor. A missing leading `/` is added to `path`.
    pub fn new(method: Method, path: impl Into<String>, body: Value) -> Self {
        let path = path.into();
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        Self {
            method,
            path,
            body,
            headers: HeaderMap::new(),
            retried: false,
        }
    }

    /// The API speaks JSON over POST for every endpoint.
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path, body)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Copy of this descriptor carrying `Authorization: Bearer <token>`.
    ///
    /// Any existing Authorization header is replaced. The header value is
    /// marked sensitive so it is never printed by `HeaderMap`'s Debug output.
    pub fn with_bearer(&self, token: &str) -> Result<Self, InvalidHeaderValue> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))?;
        value.set_sensitive(true);
        let mut next = self.clone();
        next.headers.insert(AUTHORIZATION, value);
        Ok(next)
    }

    /// The bearer token currently attached, if any.
    pub fn bearer(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }

    /// Consume the descriptor and return it flagged as a retry.
    pub fn into_retry(mut self) -> Self {
        self.retried = true;
        self
    }
}
