//! Credential attachment
//!
//! Every outgoing request except credential issuance and refresh gets
//! `Authorization: Bearer <access>` when an access token is known.
//! Attachment reads the token the dispatcher passes in at submission time,
//! so a request queued behind a refresh picks up the new token on resubmit.

use session_auth::Endpoints;
use tracing::{debug, warn};
use transport::RequestDescriptor;

pub struct RequestInterceptor {
    endpoints: Endpoints,
}

impl RequestInterceptor {
    pub fn new(endpoints: Endpoints) -> Self {
        Self { endpoints }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Return a copy of `request` carrying the access credential when one applies.
    ///
    /// Exempt paths and an absent or empty token leave the request unchanged.
    pub fn attach(&self, request: &RequestDescriptor, access: Option<&str>) -> RequestDescriptor {
        if !self.endpoints.attaches_credential(request.path()) {
            debug!(path = %request.path(), "exempt endpoint, no credential attached");
            return request.clone();
        }
        let Some(token) = access.filter(|t| !t.is_empty()) else {
            debug!(path = %request.path(), "no access token, sending unauthenticated");
            return request.clone();
        };
        match request.with_bearer(token) {
            Ok(authorized) => authorized,
            Err(e) => {
                warn!(path = %request.path(), error = %e, "access token is not a valid header value, sending unauthenticated");
                request.clone()
            }
        }
    }
}
