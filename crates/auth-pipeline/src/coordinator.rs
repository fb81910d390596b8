//! Single-flight credential refresh
//!
//! The coordinator owns the only `RefreshState` in the client. The first
//! caller to arrive while `Idle` flips it to `Refreshing` and starts one
//! refresh exchange on a detached task; every caller arriving before that
//! exchange settles joins the FIFO waiter queue instead of issuing its own.
//! When the exchange settles the store is updated (or the session torn down)
//! first, then the state returns to `Idle` and the waiters are released in
//! arrival order with the same outcome.
//!
//! The exchange runs on its own task so a caller that gives up waiting cannot
//! strand the queue.

use std::collections::VecDeque;
use std::sync::Arc;

use session_auth::{CredentialStore, RefreshRequest, access_token_in};
use tokio::sync::{Mutex, oneshot};
use tracing::{Instrument, debug, info, info_span, warn};
use transport::{RequestDescriptor, Transport, TransportResult};

use crate::classify::{Classification, classify, failure_message};
use crate::error::RefreshError;
use crate::teardown::{SessionTeardown, TeardownReason};

type Waiter = oneshot::Sender<Result<String, RefreshError>>;

/// Whether a refresh exchange is outstanding, and who is waiting on it.
///
/// The waiter queue only exists inside `Refreshing`, so it cannot be
/// non-empty while idle.
#[derive(Debug, Default)]
pub enum RefreshState {
    #[default]
    Idle,
    Refreshing { waiters: VecDeque<Waiter> },
}

impl RefreshState {
    pub fn label(&self) -> &'static str {
        match self {
            RefreshState::Idle => "idle",
            RefreshState::Refreshing { .. } => "refreshing",
        }
    }
}

pub struct RefreshCoordinator {
    transport: Arc<dyn Transport>,
    store: Arc<CredentialStore>,
    teardown: Arc<SessionTeardown>,
    refresh_path: String,
    state: Mutex<RefreshState>,
    /// Why the most recent session ended, for callers that arrive after its teardown
    last_failure: Mutex<Option<RefreshError>>,
}

impl RefreshCoordinator {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<CredentialStore>,
        teardown: Arc<SessionTeardown>,
        refresh_path: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            store,
            teardown,
            refresh_path: refresh_path.into(),
            state: Mutex::new(RefreshState::Idle),
            last_failure: Mutex::new(None),
        }
    }

    /// Obtain an access credential to replace `rejected`.
    ///
    /// If the store already holds a different access token (another caller's
    /// refresh finished after this caller's request went out), that token is
    /// returned without an exchange. If the store is empty although the
    /// caller's request carried a credential, that session has already been
    /// torn down: the caller fails with the reason it ended, and no second
    /// teardown runs. Otherwise the caller starts or joins the single
    /// in-flight refresh and resolves with its outcome.
    pub async fn acquire_credential(
        self: &Arc<Self>,
        rejected: Option<&str>,
    ) -> Result<String, RefreshError> {
        let receiver = {
            let mut state = self.state.lock().await;
            let (sender, receiver) = oneshot::channel();
            match &mut *state {
                RefreshState::Refreshing { waiters } => {
                    waiters.push_back(sender);
                    debug!(position = waiters.len(), "refresh in flight, queued");
                }
                RefreshState::Idle => {
                    match self.store.access().await {
                        Some(current) if Some(current.as_str()) != rejected => {
                            debug!("store already holds a newer access token");
                            return Ok(current);
                        }
                        None if rejected.is_some() => {
                            let ended = self.last_failure.lock().await.clone();
                            debug!("credential belongs to a session that already ended");
                            return Err(ended.unwrap_or(RefreshError::SessionEnded));
                        }
                        _ => {}
                    }
                    *state = RefreshState::Refreshing {
                        waiters: VecDeque::from([sender]),
                    };
                    let coordinator = Arc::clone(self);
                    let span = info_span!("refresh_exchange", transport = self.transport.id());
                    tokio::spawn(async move { coordinator.run_exchange().await }.instrument(span));
                }
            }
            receiver
        };

        receiver.await.unwrap_or(Err(RefreshError::Abandoned))
    }

    /// Label of the current state ("idle" or "refreshing").
    pub async fn state(&self) -> &'static str {
        self.state.lock().await.label()
    }

    /// Number of callers waiting on the in-flight exchange.
    pub async fn pending_callers(&self) -> usize {
        match &*self.state.lock().await {
            RefreshState::Idle => 0,
            RefreshState::Refreshing { waiters } => waiters.len(),
        }
    }

    async fn run_exchange(self: Arc<Self>) {
        let outcome = self.exchange().await;

        match &outcome {
            Ok(token) => {
                crate::metrics::record_refresh("success");
                *self.last_failure.lock().await = None;
                if let Err(e) = self.store.set_access(token.clone()).await {
                    warn!(error = %e, "failed to persist refreshed access token");
                }
                info!("access token refreshed");
            }
            Err(e) => {
                crate::metrics::record_refresh(e.label());
                warn!(error = %e, "refresh failed, tearing down session");
                *self.last_failure.lock().await = Some(e.clone());
                self.teardown.run(TeardownReason::from(e)).await;
            }
        }

        let waiters = {
            let mut state = self.state.lock().await;
            match std::mem::take(&mut *state) {
                RefreshState::Refreshing { waiters } => waiters,
                RefreshState::Idle => VecDeque::new(),
            }
        };
        debug!(waiters = waiters.len(), "releasing refresh waiters");
        for waiter in waiters {
            // A waiter that stopped listening has nothing left to receive.
            let _ = waiter.send(outcome.clone());
        }
    }

    /// POST the refresh credential to the refresh endpoint.
    ///
    /// Goes straight to the transport: the exchange never carries an access
    /// token and its failures never re-enter the coordinator.
    async fn exchange(&self) -> Result<String, RefreshError> {
        let Some(refresh_token) = self.store.refresh().await else {
            return Err(RefreshError::MissingRefreshToken);
        };

        let body = RefreshRequest {
            refresh_token: &refresh_token,
        }
        .to_body()
        .map_err(|e| RefreshError::Exchange(e.to_string()))?;
        let request = RequestDescriptor::post(self.refresh_path.as_str(), body);
        let outcome = self.transport.send(&request).await;

        match (classify(&outcome), outcome) {
            (Classification::Success, Ok(response)) => access_token_in(&response.body)
                .map(str::to_string)
                .ok_or(RefreshError::MalformedResponse),
            (Classification::AuthFailure, outcome) => Err(RefreshError::Rejected(describe(&outcome))),
            (_, Ok(response)) if (400..500).contains(&response.status) => {
                Err(RefreshError::Rejected(failure_message(&response)))
            }
            (_, outcome) => Err(RefreshError::Exchange(describe(&outcome))),
        }
    }
}

fn describe(outcome: &TransportResult) -> String {
    match outcome {
        Ok(response) => failure_message(response),
        Err(failure) => failure.message.clone(),
    }
}
