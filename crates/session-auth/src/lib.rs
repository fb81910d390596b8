//! Session credentials for the JSON API client
//!
//! Holds the access/refresh credential pair, persists it between runs, and
//! knows which endpoints issue credentials rather than consume them. This
//! crate has no knowledge of the request pipeline; `auth-pipeline` builds on
//! top of it.
//!
//! Session flow:
//! 1. Caller logs in; the reply is parsed with `TokenGrant::from_body()`
//! 2. Grant installed via `CredentialStore::begin_session()`
//! 3. Pipeline reads `CredentialStore::access()` for every request
//! 4. A refresh stores its new token through `CredentialStore::set_access()`
//! 5. Session teardown calls `CredentialStore::clear()`

pub mod constants;
pub mod credentials;
pub mod endpoints;
pub mod error;
pub mod token;

pub use credentials::{
    CredentialStore, FileStorage, MemoryStorage, PersistedSession, SessionStorage,
};
pub use endpoints::Endpoints;
pub use error::{Error, Result};
pub use token::{PasswordCredentials, RefreshRequest, TokenGrant, access_token_in};
