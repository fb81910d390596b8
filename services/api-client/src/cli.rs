//! Command-line arguments

use clap::{Parser, Subcommand};
use serde_json::Value;

use crate::error::{Error, Result};

#[derive(Parser, Debug)]
#[command(name = "scriblink-client", author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (overrides CONFIG_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Sign in and store the session
    Login {
        username: String,
        #[arg(env = "SCRIBLINK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create an account (signs in if the server issues tokens)
    Register {
        username: String,
        #[arg(env = "SCRIBLINK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// POST to an API path with the stored session
    Call {
        path: String,
        /// JSON request body
        #[arg(value_parser = parse_body, default_value = "{}")]
        body: Value,
    },
    /// Forget the stored session
    Logout,
    /// Show whether a session is stored
    Status,
}

fn parse_body(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).map_err(|e| Error::InvalidBody(e.to_string()))
}

/// The password from the command line or `SCRIBLINK_PASSWORD`; empty counts as missing.
pub fn resolve_password(given: Option<String>) -> Result<String> {
    given.filter(|p| !p.is_empty()).ok_or(Error::MissingPassword)
}
