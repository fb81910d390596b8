//! Response classification
//!
//! The backend is inconsistent about auth failures: some endpoints answer 401,
//! others answer 200 with `{ "error": "Invalid token" }` for the same
//! condition. `classify` normalizes both into `AuthFailure` so refresh fires
//! for every endpoint. Message matching is a case-insensitive substring test
//! against `AUTH_FAILURE_PATTERNS`.

use serde_json::Value;
use transport::{ApiResponse, TransportResult};

/// Outcome category of one transport call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// 2xx with no embedded error
    Success,
    /// Access credential rejected, absent or expired
    AuthFailure,
    /// Anything else: other 4xx/5xx, network failure, timeout, non-auth embedded error
    OtherFailure,
}

impl Classification {
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Success => "success",
            Classification::AuthFailure => "auth_failure",
            Classification::OtherFailure => "other_failure",
        }
    }
}

/// Error-message fragments that mean "your credential is no good".
///
/// Lowercase; matched as substrings of the lowercased message.
pub const AUTH_FAILURE_PATTERNS: &[&str] = &[
    "invalid token",
    "invalid access token",
    "invalid or expired token",
    "token is invalid",
    "token invalid",
    "expired token",
    "token expired",
    "token has expired",
    "jwt expired",
    "unauthorized",
    "unauthenticated",
    "not authenticated",
    "no authenticated user",
    "authentication required",
    "authentication failed",
    "missing access token",
];

/// Classify a transport outcome.
pub fn classify(outcome: &TransportResult) -> Classification {
    match outcome {
        Err(failure) => by_message(&failure.message),
        Ok(response) if response.status == 401 => Classification::AuthFailure,
        Ok(response) if response.is_success() => match embedded_error(&response.body) {
            None => Classification::Success,
            Some(message) => by_message(&message),
        },
        Ok(response) => {
            if matches_auth_vocabulary(&response.status_text)
                || matches_auth_vocabulary(&failure_message(response))
            {
                Classification::AuthFailure
            } else {
                Classification::OtherFailure
            }
        }
    }
}

fn by_message(message: &str) -> Classification {
    if matches_auth_vocabulary(message) {
        Classification::AuthFailure
    } else {
        Classification::OtherFailure
    }
}

/// Whether `message` contains any auth-failure term (case-insensitive).
pub fn matches_auth_vocabulary(message: &str) -> bool {
    let lower = message.to_lowercase();
    AUTH_FAILURE_PATTERNS
        .iter()
        .any(|pattern| lower.contains(pattern))
}

/// The application-level `error` field of a reply body, if it signals failure.
///
/// Null, `false` and empty strings do not count as errors. An object-valued
/// error contributes its `message` when it has one.
pub fn embedded_error(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(fields) => Some(
            fields
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| Value::Object(fields.clone()).to_string()),
        ),
        other => Some(other.to_string()),
    }
}

/// Best human-readable explanation of a failed reply.
///
/// Preference: embedded `error`, then `message`, then a plain-text body, then
/// the status text.
pub fn failure_message(response: &ApiResponse) -> String {
    if let Some(error) = embedded_error(&response.body) {
        return error;
    }
    if let Some(message) = response.body.get("message").and_then(Value::as_str)
        && !message.is_empty()
    {
        return message.to_string();
    }
    if let Value::String(text) = &response.body
        && !text.trim().is_empty()
    {
        return text.trim().to_string();
    }
    if response.status_text.is_empty() {
        format!("HTTP {}", response.status)
    } else {
        response.status_text.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use transport::TransportFailure;

    fn reply(status: u16, body: Value) -> TransportResult {
        Ok(ApiResponse::new(status, body))
    }

    #[test]
    fn plain_2xx_is_success() {
        assert_eq!(classify(&reply(200, json!({"notes": []}))), Classification::Success);
        assert_eq!(classify(&reply(204, Value::Null)), Classification::Success);
        assert_eq!(classify(&reply(201, json!([1, 2]))), Classification::Success);
    }

    #[test]
    fn status_401_is_auth_failure() {
        assert_eq!(classify(&reply(401, Value::Null)), Classification::AuthFailure);
        assert_eq!(
            classify(&reply(401, json!({"error": "whatever"}))),
            Classification::AuthFailure
        );
    }

    #[test]
    fn embedded_auth_error_on_200_is_auth_failure() {
        let body = json!({"error": "Invalid token"});
        assert_eq!(classify(&reply(200, body)), Classification::AuthFailure);
    }

    #[test]
    fn embedded_expired_error_on_200_is_auth_failure() {
        let body = json!({"error": "Access token has expired"});
        assert_eq!(classify(&reply(200, body)), Classification::AuthFailure);
    }

    #[test]
    fn embedded_non_auth_error_on_200_is_other_failure() {
        let body = json!({"error": "Note not found"});
        assert_eq!(classify(&reply(200, body)), Classification::OtherFailure);
    }

    #[test]
    fn falsy_error_fields_are_success() {
        assert_eq!(classify(&reply(200, json!({"error": null}))), Classification::Success);
        assert_eq!(classify(&reply(200, json!({"error": ""}))), Classification::Success);
        assert_eq!(classify(&reply(200, json!({"error": false}))), Classification::Success);
    }

    #[test]
    fn success_message_field_is_not_an_error() {
        let body = json!({"message": "Unauthorized users cannot see this"});
        assert_eq!(classify(&reply(200, body)), Classification::Success);
    }

    #[test]
    fn object_error_uses_its_message() {
        let body = json!({"error": {"code": 7, "message": "JWT expired"}});
        assert_eq!(classify(&reply(200, body)), Classification::AuthFailure);
    }

    #[test]
    fn status_403_with_auth_message_is_auth_failure() {
        let body = json!({"message": "Authentication required"});
        assert_eq!(classify(&reply(403, body)), Classification::AuthFailure);
    }

    #[test]
    fn status_403_without_auth_message_is_other_failure() {
        assert_eq!(classify(&reply(403, Value::Null)), Classification::OtherFailure);
    }

    #[test]
    fn validation_4xx_is_other_failure() {
        let body = json!({"error": "Invalid password"});
        assert_eq!(classify(&reply(400, body)), Classification::OtherFailure);
    }

    #[test]
    fn server_errors_are_other_failure() {
        for status in [500, 502, 503, 504] {
            assert_eq!(
                classify(&reply(status, Value::Null)),
                Classification::OtherFailure,
                "status {status}"
            );
        }
    }

    #[test]
    fn network_failure_is_other_failure() {
        let outcome = Err(TransportFailure::connection("connection refused"));
        assert_eq!(classify(&outcome), Classification::OtherFailure);
    }

    #[test]
    fn timeout_is_other_failure() {
        let outcome = Err(TransportFailure::timeout("request to /x timed out after 10s"));
        assert_eq!(classify(&outcome), Classification::OtherFailure);
    }

    #[test]
    fn transport_failure_with_auth_message_is_auth_failure() {
        let outcome = Err(TransportFailure::connection("proxy says: Unauthorized"));
        assert_eq!(classify(&outcome), Classification::AuthFailure);
    }

    #[test]
    fn vocabulary_is_case_insensitive() {
        assert!(matches_auth_vocabulary("INVALID TOKEN"));
        assert!(matches_auth_vocabulary("Token Expired"));
        assert!(matches_auth_vocabulary("no authenticated user found"));
        assert!(!matches_auth_vocabulary("Invalid folder id"));
        assert!(!matches_auth_vocabulary(""));
    }

    #[test]
    fn every_pattern_is_lowercase() {
        for pattern in AUTH_FAILURE_PATTERNS {
            assert_eq!(*pattern, pattern.to_lowercase(), "pattern {pattern} must be lowercase");
        }
    }

    #[test]
    fn failure_message_preference_order() {
        let both = ApiResponse::new(400, json!({"error": "E", "message": "M"}));
        assert_eq!(failure_message(&both), "E");

        let message_only = ApiResponse::new(400, json!({"message": "M"}));
        assert_eq!(failure_message(&message_only), "M");

        let text = ApiResponse::new(502, json!("  upstream down \n"));
        assert_eq!(failure_message(&text), "upstream down");

        let bare = ApiResponse::new(404, Value::Null);
        assert_eq!(failure_message(&bare), "Not Found");

        let unknown = ApiResponse::new(599, Value::Null);
        assert_eq!(failure_message(&unknown), "HTTP 599");
    }

    #[test]
    fn labels() {
        assert_eq!(Classification::Success.label(), "success");
        assert_eq!(Classification::AuthFailure.label(), "auth_failure");
        assert_eq!(Classification::OtherFailure.label(), "other_failure");
    }
}
