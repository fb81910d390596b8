//! Session teardown
//!
//! Runs when the session can no longer be recovered (refresh missing,
//! rejected or failed) or on explicit logout. Clears both credentials and
//! the user identifier from the store and its persistent copy, then tells the
//! host application so it can route the user back to sign-in.

use std::sync::Arc;

use session_auth::CredentialStore;
use tracing::{info, warn};

use crate::error::RefreshError;

/// Why the session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeardownReason {
    MissingRefreshToken,
    RefreshRejected(String),
    RefreshFailed(String),
    Logout,
}

impl TeardownReason {
    pub fn label(&self) -> &'static str {
        match self {
            TeardownReason::MissingRefreshToken => "missing_refresh_token",
            TeardownReason::RefreshRejected(_) => "refresh_rejected",
            TeardownReason::RefreshFailed(_) => "refresh_failed",
            TeardownReason::Logout => "logout",
        }
    }

    /// Whether the user must sign in again (every reason except an explicit logout).
    pub fn requires_sign_in(&self) -> bool {
        !matches!(self, TeardownReason::Logout)
    }
}

impl From<&RefreshError> for TeardownReason {
    fn from(err: &RefreshError) -> Self {
        match err {
            RefreshError::MissingRefreshToken => TeardownReason::MissingRefreshToken,
            RefreshError::Rejected(message) => TeardownReason::RefreshRejected(message.clone()),
            other => TeardownReason::RefreshFailed(other.to_string()),
        }
    }
}

/// Host-application hook notified after a teardown has cleared the store.
pub trait SessionListener: Send + Sync {
    fn session_ended(&self, reason: &TeardownReason);
}

/// Listener for hosts that poll `is_authenticated` instead.
pub struct NoopListener;

impl SessionListener for NoopListener {
    fn session_ended(&self, _reason: &TeardownReason) {}
}

pub struct SessionTeardown {
    store: Arc<CredentialStore>,
    listener: Arc<dyn SessionListener>,
}

impl SessionTeardown {
    pub fn new(store: Arc<CredentialStore>, listener: Arc<dyn SessionListener>) -> Self {
        Self { store, listener }
    }

    /// Clear the session and notify the listener.
    ///
    /// A storage failure is logged and does not stop the listener from being
    /// told: the in-memory credentials are gone either way.
    pub async fn run(&self, reason: TeardownReason) {
        if let Err(e) = self.store.clear().await {
            warn!(error = %e, "failed to erase persisted session during teardown");
        }
        crate::metrics::record_teardown(reason.label());
        match &reason {
            TeardownReason::Logout => info!("session ended by logout"),
            TeardownReason::MissingRefreshToken => {
                warn!(reason = reason.label(), "session ended, no refresh token available")
            }
            TeardownReason::RefreshRejected(message) | TeardownReason::RefreshFailed(message) => {
                warn!(reason = reason.label(), error = %message, "session ended, refresh failed")
            }
        }
        self.listener.session_ended(&reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingListener;
    use session_auth::{MemoryStorage, PersistedSession};

    async fn logged_in_store() -> (Arc<CredentialStore>, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::with_session(PersistedSession {
            access_token: Some("at".into()),
            refresh_token: Some("rt".into()),
            user: Some("u-1".into()),
        }));
        let store = CredentialStore::load(storage.clone()).await.unwrap();
        (Arc::new(store), storage)
    }

    #[tokio::test]
    async fn teardown_clears_store_and_notifies() {
        let (store, storage) = logged_in_store().await;
        let listener = Arc::new(RecordingListener::default());
        let teardown = SessionTeardown::new(store.clone(), listener.clone());

        teardown
            .run(TeardownReason::RefreshRejected("Invalid refresh token".into()))
            .await;

        assert!(store.access().await.is_none());
        assert!(store.refresh().await.is_none());
        assert!(store.user().await.is_none());
        assert!(storage.snapshot().is_none());
        assert_eq!(storage.erases(), 1);
        assert_eq!(
            listener.reasons(),
            vec![TeardownReason::RefreshRejected("Invalid refresh token".into())]
        );
    }

    #[tokio::test]
    async fn teardown_on_empty_store_still_notifies() {
        let store = Arc::new(CredentialStore::ephemeral());
        let listener = Arc::new(RecordingListener::default());
        SessionTeardown::new(store, listener.clone())
            .run(TeardownReason::MissingRefreshToken)
            .await;
        assert_eq!(listener.reasons(), vec![TeardownReason::MissingRefreshToken]);
    }

    #[test]
    fn reasons_from_refresh_errors() {
        assert_eq!(
            TeardownReason::from(&RefreshError::MissingRefreshToken),
            TeardownReason::MissingRefreshToken
        );
        assert_eq!(
            TeardownReason::from(&RefreshError::Rejected("nope".into())),
            TeardownReason::RefreshRejected("nope".into())
        );
        assert!(matches!(
            TeardownReason::from(&RefreshError::Exchange("connection refused".into())),
            TeardownReason::RefreshFailed(m) if m.contains("connection refused")
        ));
        assert!(matches!(
            TeardownReason::from(&RefreshError::MalformedResponse),
            TeardownReason::RefreshFailed(_)
        ));
    }

    #[test]
    fn only_logout_skips_sign_in_prompt() {
        assert!(!TeardownReason::Logout.requires_sign_in());
        assert!(TeardownReason::MissingRefreshToken.requires_sign_in());
        assert!(TeardownReason::RefreshFailed("x".into()).requires_sign_in());
    }
}
