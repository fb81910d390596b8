//! Refresh-then-retry dispatch
//!
//! Sends a request with the current access credential and classifies the
//! outcome. An `AuthFailure` on a retryable endpoint, for a descriptor that
//! has not been retried yet, goes through the `RefreshCoordinator` and is
//! resubmitted exactly once with the credential it hands out. Whatever the
//! resubmission yields is final.

use std::sync::Arc;

use serde_json::Value;
use session_auth::{CredentialStore, access_token_in};
use tracing::{Instrument, debug, info_span, warn};
use transport::{RequestDescriptor, Transport, TransportResult};
use uuid::Uuid;

use crate::classify::{Classification, classify};
use crate::coordinator::RefreshCoordinator;
use crate::error::{ApiError, Result};
use crate::interceptor::RequestInterceptor;

pub struct RetryDispatcher {
    transport: Arc<dyn Transport>,
    store: Arc<CredentialStore>,
    interceptor: RequestInterceptor,
    coordinator: Arc<RefreshCoordinator>,
}

impl RetryDispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<CredentialStore>,
        interceptor: RequestInterceptor,
        coordinator: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            transport,
            store,
            interceptor,
            coordinator,
        }
    }

    /// Send `request` and return the reply body, recovering once from an
    /// expired access credential.
    pub async fn dispatch(&self, request: RequestDescriptor) -> Result<Value> {
        let request_id = format!("req_{}", Uuid::new_v4().simple());
        let span = info_span!(
            "dispatch",
            request_id = %request_id,
            path = %request.path(),
            transport = self.transport.id(),
        );
        self.dispatch_inner(request).instrument(span).await
    }

    async fn dispatch_inner(&self, request: RequestDescriptor) -> Result<Value> {
        let access = self.store.access().await;
        let outcome = self.submit(&request, access.as_deref()).await;
        let classification = classify(&outcome);

        let retryable = !request.is_retried()
            && self
                .interceptor
                .endpoints()
                .retries_on_auth_failure(request.path());
        if classification != Classification::AuthFailure || !retryable {
            return self.settle(&request, outcome, classification).await;
        }

        let original = ApiError::from_outcome(outcome, classification);
        let request = request.into_retry();
        debug!(error = %original, "auth failure, acquiring fresh credential");

        match self.coordinator.acquire_credential(access.as_deref()).await {
            Ok(token) => {
                crate::metrics::record_retry();
                let outcome = self.submit(&request, Some(&token)).await;
                let classification = classify(&outcome);
                debug!(outcome = classification.label(), "retried with refreshed credential");
                self.settle(&request, outcome, classification).await
            }
            Err(e) => {
                warn!(error = %e, "no credential available, returning original failure");
                crate::metrics::record_outcome(classification);
                Err(original)
            }
        }
    }

    async fn submit(&self, request: &RequestDescriptor, access: Option<&str>) -> TransportResult {
        let request = self.interceptor.attach(request, access);
        self.transport.send(&request).await
    }

    /// Turn a final outcome into the caller's result.
    async fn settle(
        &self,
        request: &RequestDescriptor,
        outcome: TransportResult,
        classification: Classification,
    ) -> Result<Value> {
        crate::metrics::record_outcome(classification);
        match (classification, outcome) {
            (Classification::Success, Ok(response)) => {
                self.absorb_token(request, &response.body).await;
                Ok(response.body)
            }
            (classification, outcome) => {
                let err = ApiError::from_outcome(outcome, classification);
                debug!(kind = err.kind(), error = %err, "request failed");
                Err(err)
            }
        }
    }

    /// Keep an access token that an ordinary endpoint hands back.
    ///
    /// Issuance replies are installed by the client's login and register.
    async fn absorb_token(&self, request: &RequestDescriptor, body: &Value) {
        if self
            .interceptor
            .endpoints()
            .is_credential_issuance(request.path())
        {
            return;
        }
        let Some(token) = access_token_in(body) else {
            return;
        };
        match self.store.set_access(token.to_string()).await {
            Ok(true) => debug!("stored access token from reply"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "failed to persist access token from reply"),
        }
    }
}
