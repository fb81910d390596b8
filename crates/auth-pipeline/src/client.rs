//! Client facade
//!
//! Wires store, interceptor, coordinator, dispatcher and teardown together
//! and adds the session lifecycle around them: login and register install
//! credentials, logout tears the session down.

use std::sync::Arc;

use serde_json::Value;
use session_auth::{CredentialStore, Endpoints, PasswordCredentials, TokenGrant, access_token_in};
use tracing::info;
use transport::{RequestDescriptor, Transport};

use crate::coordinator::RefreshCoordinator;
use crate::dispatcher::RetryDispatcher;
use crate::error::{ApiError, Result};
use crate::interceptor::RequestInterceptor;
use crate::teardown::{SessionListener, SessionTeardown, TeardownReason};

pub struct AuthClient {
    store: Arc<CredentialStore>,
    endpoints: Endpoints,
    teardown: Arc<SessionTeardown>,
    coordinator: Arc<RefreshCoordinator>,
    dispatcher: RetryDispatcher,
}

impl AuthClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<CredentialStore>,
        endpoints: Endpoints,
        listener: Arc<dyn SessionListener>,
    ) -> Self {
        let teardown = Arc::new(SessionTeardown::new(store.clone(), listener));
        let coordinator = Arc::new(RefreshCoordinator::new(
            transport.clone(),
            store.clone(),
            teardown.clone(),
            endpoints.refresh.clone(),
        ));
        let dispatcher = RetryDispatcher::new(
            transport,
            store.clone(),
            RequestInterceptor::new(endpoints.clone()),
            coordinator.clone(),
        );
        Self {
            store,
            endpoints,
            teardown,
            coordinator,
            dispatcher,
        }
    }

    /// POST `body` to `path` through the authenticated pipeline.
    pub async fn call(&self, path: &str, body: Value) -> Result<Value> {
        self.dispatcher
            .dispatch(RequestDescriptor::post(path, body))
            .await
    }

    pub async fn send(&self, request: RequestDescriptor) -> Result<Value> {
        self.dispatcher.dispatch(request).await
    }

    /// Authenticate with username and password and start a session.
    pub async fn login(&self, credentials: &PasswordCredentials) -> Result<Value> {
        let body = self
            .call(&self.endpoints.login, credentials.to_body())
            .await?;
        self.start_session(&body).await?;
        info!(username = %credentials.username, "logged in");
        Ok(body)
    }

    /// Create an account. A reply that carries tokens also starts a session.
    pub async fn register(&self, credentials: &PasswordCredentials) -> Result<Value> {
        let body = self
            .call(&self.endpoints.register, credentials.to_body())
            .await?;
        if access_token_in(&body).is_some() {
            self.start_session(&body).await?;
            info!(username = %credentials.username, "registered and logged in");
        } else {
            info!(username = %credentials.username, "registered");
        }
        Ok(body)
    }

    /// End the session locally.
    pub async fn logout(&self) {
        self.teardown.run(TeardownReason::Logout).await;
    }

    pub async fn is_authenticated(&self) -> bool {
        self.store.is_authenticated().await
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    async fn start_session(&self, body: &Value) -> Result<()> {
        let grant =
            TokenGrant::from_body(body).map_err(|e| ApiError::MalformedResponse(e.to_string()))?;
        self.store
            .begin_session(grant.access_token, grant.refresh_token, grant.user)
            .await
            .map_err(|e| ApiError::Credential(e.to_string()))
    }
}
