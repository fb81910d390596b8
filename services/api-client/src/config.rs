//! Configuration types and loading
//!
//! Config precedence: env vars > config file > defaults. The config file
//! itself comes from `--config`, then `CONFIG_PATH`, then
//! `scriblink-client.toml` in the working directory. Only the last one may be
//! absent; a path the user named must exist.

use serde::Deserialize;
use session_auth::Endpoints;
use session_auth::constants::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "scriblink-client.toml";
const DEFAULT_CREDENTIALS_FILE: &str = ".scriblink-session.json";

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub endpoints: Endpoints,
}

/// Backend location and transport limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Where the session is persisted between runs
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub credentials_path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_FILE),
        }
    }
}

/// A resolved config file location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub path: PathBuf,
    /// Named by `--config` or `CONFIG_PATH` rather than the built-in default
    pub explicit: bool,
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.finish()
    }

    /// Load `source`, falling back to defaults when the default file is absent.
    pub fn load_from(source: &ConfigSource) -> common::Result<Self> {
        if !source.explicit && !source.path.exists() {
            return Config::default().finish();
        }
        Config::load(&source.path)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> ConfigSource {
        if let Some(p) = cli_path {
            return ConfigSource {
                path: PathBuf::from(p),
                explicit: true,
            };
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return ConfigSource {
                path: PathBuf::from(p),
                explicit: true,
            };
        }
        ConfigSource {
            path: PathBuf::from(DEFAULT_CONFIG_FILE),
            explicit: false,
        }
    }

    fn finish(mut self) -> common::Result<Self> {
        self.apply_env()?;
        self.validate()?;
        Ok(self)
    }

    fn apply_env(&mut self) -> common::Result<()> {
        if let Ok(url) = std::env::var("SCRIBLINK_API_URL") {
            if url.trim().is_empty() {
                return Err(common::Error::Env {
                    var: "SCRIBLINK_API_URL".into(),
                    reason: "must not be empty".into(),
                });
            }
            self.api.base_url = url.trim().to_string();
        }
        if let Ok(path) = std::env::var("SCRIBLINK_CREDENTIALS") {
            if path.trim().is_empty() {
                return Err(common::Error::Env {
                    var: "SCRIBLINK_CREDENTIALS".into(),
                    reason: "must not be empty".into(),
                });
            }
            self.session.credentials_path = PathBuf::from(path);
        }
        Ok(())
    }

    fn validate(&self) -> common::Result<()> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        if self.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        for (key, path) in self.endpoints.paths() {
            if !path.starts_with('/') {
                return Err(common::Error::Config(format!(
                    "endpoints.{key} must start with '/', got: {path}"
                )));
            }
        }

        Ok(())
    }
}
