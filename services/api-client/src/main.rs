//! Scriblink API client
//!
//! Command-line host for the authenticated-request pipeline:
//! 1. Loads configuration and the persisted session
//! 2. Runs one command (login, register, call, logout, status)
//! 3. Prints the JSON result on stdout; logs go to stderr
//!
//! An expired access token is refreshed transparently. When the session
//! cannot be recovered the stored credentials are erased and the process
//! exits non-zero with a hint to sign in again.

mod cli;
mod config;
mod error;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use auth_pipeline::{AuthClient, SessionListener, TeardownReason};
use clap::Parser;
use serde_json::{Value, json};
use session_auth::{CredentialStore, FileStorage, PasswordCredentials};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transport::HttpTransport;

use crate::cli::{Cli, Command};
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support.
    // stdout is reserved for command output.
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let source = Config::resolve_path(cli.config.as_deref());
    info!(path = %source.path.display(), explicit = source.explicit, "loading configuration");

    let config = Config::load_from(&source)
        .with_context(|| format!("failed to load config from {}", source.path.display()))?;

    info!(
        base_url = %config.api.base_url,
        timeout_secs = config.api.timeout_secs,
        credentials_path = %config.session.credentials_path.display(),
        "configuration loaded"
    );

    let listener = Arc::new(TerminalListener::default());
    let output = run(&config, cli.command, listener).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Remembers why the session ended so the command can fail with a hint.
#[derive(Default)]
struct TerminalListener {
    ended: Mutex<Option<TeardownReason>>,
}

impl TerminalListener {
    fn ended(&self) -> Option<TeardownReason> {
        self.ended
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl SessionListener for TerminalListener {
    fn session_ended(&self, reason: &TeardownReason) {
        if reason.requires_sign_in() {
            warn!(reason = reason.label(), "session ended, sign-in required");
        }
        *self
            .ended
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(reason.clone());
    }
}

async fn build_client(config: &Config, listener: Arc<TerminalListener>) -> Result<AuthClient> {
    let storage = Arc::new(FileStorage::new(config.session.credentials_path.clone()));
    let store = CredentialStore::load(storage).await.with_context(|| {
        format!(
            "failed to load session from {}",
            config.session.credentials_path.display()
        )
    })?;

    let http = reqwest::Client::builder()
        .build()
        .context("failed to build HTTP client")?;
    let transport = Arc::new(HttpTransport::new(
        http,
        config.api.base_url.clone(),
        Duration::from_secs(config.api.timeout_secs),
    ));

    Ok(AuthClient::new(
        transport,
        Arc::new(store),
        config.endpoints.clone(),
        listener,
    ))
}

/// Execute one command and return what it prints.
async fn run(config: &Config, command: Command, listener: Arc<TerminalListener>) -> Result<Value> {
    let client = build_client(config, listener.clone()).await?;

    let outcome = match command {
        Command::Login { username, password } => {
            let credentials = PasswordCredentials::new(username, cli::resolve_password(password)?);
            match client.login(&credentials).await {
                Ok(_) => Ok(session_summary(&client).await),
                Err(e) => Err(e),
            }
        }
        Command::Register { username, password } => {
            let credentials = PasswordCredentials::new(username, cli::resolve_password(password)?);
            match client.register(&credentials).await {
                Ok(body) => Ok(json!({
                    "registered": true,
                    "authenticated": client.is_authenticated().await,
                    "message": body.get("message").cloned().unwrap_or(Value::Null),
                })),
                Err(e) => Err(e),
            }
        }
        Command::Call { path, body } => client.call(&path, body).await,
        Command::Logout => {
            client.logout().await;
            Ok(json!({ "authenticated": false }))
        }
        Command::Status => Ok(session_summary(&client).await),
    };

    if let Some(reason) = listener.ended()
        && reason.requires_sign_in()
    {
        if let Err(e) = &outcome {
            warn!(error = %e, "request failed after session ended");
        }
        eprintln!("Your session has expired. Please log in again.");
        return Err(error::Error::SessionEnded(reason.label().to_string()).into());
    }

    Ok(outcome?)
}

async fn session_summary(client: &AuthClient) -> Value {
    json!({
        "authenticated": client.is_authenticated().await,
        "user": client.store().user().await,
    })
}
