//! Authenticated-request pipeline
//!
//! Attaches the access credential to outgoing requests, classifies replies,
//! and recovers from an expired credential with one coordinated refresh while
//! concurrent callers wait, then replays each of them exactly once.
//!
//! Request lifecycle:
//! 1. `RequestInterceptor` attaches `Authorization: Bearer <access>` (issuance
//!    and refresh endpoints excluded)
//! 2. The transport sends it; `classify()` sorts the outcome into Success,
//!    AuthFailure or OtherFailure
//! 3. AuthFailure on a retryable endpoint → `RefreshCoordinator` hands out a
//!    fresh credential (single-flight, FIFO waiters)
//! 4. `RetryDispatcher` resubmits once; that outcome is final
//! 5. A failed refresh runs `SessionTeardown` once and rejects every waiter

pub mod classify;
pub mod client;
pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod interceptor;
pub mod metrics;
pub mod teardown;

#[cfg(test)]
mod test_support;

pub use classify::{AUTH_FAILURE_PATTERNS, Classification, classify};
pub use client::AuthClient;
pub use coordinator::{RefreshCoordinator, RefreshState};
pub use dispatcher::RetryDispatcher;
pub use error::{ApiError, RefreshError, Result};
pub use interceptor::RequestInterceptor;
pub use teardown::{NoopListener, SessionListener, SessionTeardown, TeardownReason};
