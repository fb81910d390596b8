//! Error types for session credential operations

/// Errors from credential persistence and token grant parsing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("malformed token grant: {0}")]
    MalformedGrant(String),
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;
