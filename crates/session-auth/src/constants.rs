//! API defaults
//!
//! Paths are relative to the API base URL. Every one of them can be overridden
//! through configuration; these are the values the backend ships with.

/// Base URL of a locally running backend
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Upper bound for a single transport call
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Password authentication (issues an access/refresh pair)
pub const LOGIN_PATH: &str = "/PasswordAuth/authenticate";

/// Account registration (issues an access/refresh pair)
pub const REGISTER_PATH: &str = "/PasswordAuth/register";

/// Refresh exchange: `{ refreshToken }` in, `{ accessToken }` out
pub const REFRESH_PATH: &str = "/PasswordAuth/refresh";

/// Older login/register routes still served by the backend. They issue
/// credentials too, so they get the same exemptions.
pub const LEGACY_ISSUANCE_PATHS: &[&str] = &["/Request/loginUser", "/Request/registerUser"];
