//! CLI error types

use thiserror::Error;

/// Errors raised by the command-line host itself.
///
/// Pipeline failures (`auth_pipeline::ApiError`) pass through `anyhow`
/// unchanged; these cover argument values and the end of a session.
#[derive(Error, Debug)]
pub enum Error {
    #[error("request body is not valid JSON: {0}")]
    InvalidBody(String),

    #[error("no password given; pass it as an argument or set SCRIBLINK_PASSWORD")]
    MissingPassword,

    #[error("session ended ({0}); run `scriblink-client login <username>` to sign in again")]
    SessionEnded(String),
}

/// Result alias using service Error
pub type Result<T> = std::result::Result<T, Error>;
