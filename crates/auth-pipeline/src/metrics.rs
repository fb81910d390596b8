//! Pipeline counters
//!
//! - `client_requests_total` (counter): label `outcome` (success, auth_failure, other_failure)
//! - `client_auth_retries_total` (counter): requests resubmitted after a refresh
//! - `client_refresh_exchanges_total` (counter): label `result`
//! - `client_session_teardowns_total` (counter): label `reason`
//!
//! Without an installed recorder every call is a no-op, so library users pay
//! nothing unless they wire up an exporter.

use crate::classify::Classification;

/// Record the final classification of one dispatched request.
pub fn record_outcome(classification: Classification) {
    metrics::counter!("client_requests_total", "outcome" => classification.label()).increment(1);
}

/// Record a request resubmitted with a refreshed credential.
pub fn record_retry() {
    metrics::counter!("client_auth_retries_total").increment(1);
}

/// Record a settled refresh exchange ("success" or a `RefreshError` label).
pub fn record_refresh(result: &str) {
    metrics::counter!("client_refresh_exchanges_total", "result" => result.to_string())
        .increment(1);
}

pub fn record_teardown(reason: &str) {
    metrics::counter!("client_session_teardowns_total", "reason" => reason.to_string())
        .increment(1);
}
