//! Endpoint roles
//!
//! Credential-issuance endpoints (login, register) establish credentials and
//! the refresh endpoint exchanges them. None of these consume an access
//! token, so the pipeline never attaches one to them and never answers their
//! auth failures with a refresh.

use serde::Deserialize;

use crate::constants::{LEGACY_ISSUANCE_PATHS, LOGIN_PATH, REFRESH_PATH, REGISTER_PATH};

/// Paths with a special role in the session lifecycle.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Endpoints {
    pub login: String,
    pub register: String,
    pub refresh: String,
    /// Additional credential-issuance paths (legacy login/register routes)
    pub issuance: Vec<String>,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: LOGIN_PATH.to_string(),
            register: REGISTER_PATH.to_string(),
            refresh: REFRESH_PATH.to_string(),
            issuance: LEGACY_ISSUANCE_PATHS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl Endpoints {
    /// Whether `path` issues credentials (login, register, or a configured alias).
    pub fn is_credential_issuance(&self, path: &str) -> bool {
        let path = normalize(path);
        path == normalize(&self.login)
            || path == normalize(&self.register)
            || self.issuance.iter().any(|p| normalize(p) == path)
    }

    pub fn is_refresh(&self, path: &str) -> bool {
        normalize(path) == normalize(&self.refresh)
    }

    /// Whether requests to `path` carry the access credential.
    pub fn attaches_credential(&self, path: &str) -> bool {
        !self.is_credential_issuance(path) && !self.is_refresh(path)
    }

    /// Whether an auth failure on `path` may be answered with refresh-then-retry.
    ///
    /// Same set as `attaches_credential`: a request that carried no access
    /// token cannot be fixed by a new one, and retrying the refresh endpoint
    /// through the refresh path would recurse.
    pub fn retries_on_auth_failure(&self, path: &str) -> bool {
        self.attaches_credential(path)
    }

    /// All paths that must start with `/`, paired with their config key.
    pub fn paths(&self) -> Vec<(&'static str, &str)> {
        let mut paths = vec![
            ("login", self.login.as_str()),
            ("register", self.register.as_str()),
            ("refresh", self.refresh.as_str()),
        ];
        paths.extend(self.issuance.iter().map(|p| ("issuance", p.as_str())));
        paths
    }
}

/// Strip the query string and trailing slashes so `/a/b/?x=1` matches `/a/b`.
fn normalize(path: &str) -> &str {
    let path = path.split('?').next().unwrap_or(path);
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_backend_routes() {
        let endpoints = Endpoints::default();
        assert_eq!(endpoints.login, "/PasswordAuth/authenticate");
        assert_eq!(endpoints.register, "/PasswordAuth/register");
        assert_eq!(endpoints.refresh, "/PasswordAuth/refresh");
        assert_eq!(
            endpoints.issuance,
            vec!["/Request/loginUser", "/Request/registerUser"]
        );
    }

    #[test]
    fn login_and_register_are_issuance() {
        let endpoints = Endpoints::default();
        assert!(endpoints.is_credential_issuance("/PasswordAuth/authenticate"));
        assert!(endpoints.is_credential_issuance("/PasswordAuth/register"));
        assert!(endpoints.is_credential_issuance("/Request/loginUser"));
        assert!(endpoints.is_credential_issuance("/Request/registerUser"));
        assert!(!endpoints.is_credential_issuance("/Notes/createNote"));
        assert!(!endpoints.is_credential_issuance("/PasswordAuth/refresh"));
    }

    #[test]
    fn exempt_paths_get_no_credential_and_no_retry() {
        let endpoints = Endpoints::default();
        for path in [
            "/PasswordAuth/authenticate",
            "/PasswordAuth/register",
            "/PasswordAuth/refresh",
            "/Request/loginUser",
        ] {
            assert!(!endpoints.attaches_credential(path), "{path} must be exempt");
            assert!(!endpoints.retries_on_auth_failure(path), "{path} must not retry");
        }
        assert!(endpoints.attaches_credential("/Folder/createFolder"));
        assert!(endpoints.retries_on_auth_failure("/Folder/createFolder"));
    }

    #[test]
    fn matching_ignores_query_and_trailing_slash() {
        let endpoints = Endpoints::default();
        assert!(endpoints.is_refresh("/PasswordAuth/refresh/"));
        assert!(endpoints.is_refresh("/PasswordAuth/refresh?v=2"));
        assert!(!endpoints.is_refresh("/PasswordAuth/refreshed"));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let endpoints = Endpoints::default();
        assert!(!endpoints.is_credential_issuance("/passwordauth/authenticate"));
    }

    #[test]
    fn normalize_root() {
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("///"), "/");
        assert_eq!(normalize("/a/"), "/a");
    }

    #[test]
    fn paths_lists_every_endpoint() {
        let endpoints = Endpoints::default();
        let paths = endpoints.paths();
        assert_eq!(paths.len(), 5);
        assert_eq!(paths[2], ("refresh", "/PasswordAuth/refresh"));
    }

    #[test]
    fn deserializes_partial_section_with_defaults() {
        let endpoints: Endpoints = serde_json::from_str(r#"{"refresh": "/Auth/refresh"}"#).unwrap();
        assert_eq!(endpoints.refresh, "/Auth/refresh");
        assert_eq!(endpoints.login, "/PasswordAuth/authenticate");
        assert_eq!(endpoints.issuance.len(), 2);
    }
}
