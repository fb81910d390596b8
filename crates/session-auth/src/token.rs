//! Token grants and exchange payloads
//!
//! The backend speaks camelCase JSON. Issuance endpoints answer with
//! `{ accessToken, refreshToken, user?, ... }`; the refresh endpoint takes
//! `{ refreshToken }` and answers with `{ accessToken }`.

use common::Secret;
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::{Error, Result};

/// Username/password pair for the issuance endpoints.
///
/// `Debug` never shows the password.
#[derive(Debug, Clone)]
pub struct PasswordCredentials {
    pub username: String,
    pub password: Secret<String>,
}

impl PasswordCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Secret::new(password.into()),
        }
    }

    /// Request body for login and register.
    pub fn to_body(&self) -> Value {
        json!({
            "username": self.username,
            "password": self.password.expose(),
        })
    }
}

/// Body of the refresh exchange.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

impl RefreshRequest<'_> {
    pub fn to_body(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// Credentials issued by login or registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Session identifier derived from the reply's `user` field
    pub user: Option<String>,
}

impl TokenGrant {
    /// Extract a grant from an issuance reply.
    ///
    /// `user` may be a plain id or an object carrying `id`/`_id`.
    pub fn from_body(body: &Value) -> Result<Self> {
        let access_token = access_token_in(body)
            .ok_or_else(|| Error::MalformedGrant("reply has no accessToken".into()))?
            .to_string();

        let refresh_token = body
            .get("refreshToken")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        let user = match body.get("user") {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Object(fields)) => fields
                .get("id")
                .or_else(|| fields.get("_id"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        };

        Ok(Self {
            access_token,
            refresh_token,
            user,
        })
    }
}

/// Non-empty `accessToken` string carried by a reply body, if any.
pub fn access_token_in(body: &Value) -> Option<&str> {
    body.get("accessToken")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_parses_full_reply() {
        let body = json!({
            "accessToken": "at_abc",
            "refreshToken": "rt_def",
            "user": "user-42",
        });
        let grant = TokenGrant::from_body(&body).unwrap();
        assert_eq!(grant.access_token, "at_abc");
        assert_eq!(grant.refresh_token.as_deref(), Some("rt_def"));
        assert_eq!(grant.user.as_deref(), Some("user-42"));
    }

    #[test]
    fn grant_reads_user_object_id() {
        let body = json!({"accessToken": "at", "user": {"_id": "u-1", "username": "alice"}});
        let grant = TokenGrant::from_body(&body).unwrap();
        assert_eq!(grant.user.as_deref(), Some("u-1"));
    }

    #[test]
    fn grant_without_refresh_token() {
        let grant = TokenGrant::from_body(&json!({"accessToken": "at"})).unwrap();
        assert!(grant.refresh_token.is_none());
        assert!(grant.user.is_none());
    }

    #[test]
    fn grant_requires_access_token() {
        let err = TokenGrant::from_body(&json!({"user": "u"})).unwrap_err();
        assert!(matches!(err, Error::MalformedGrant(_)));

        let err = TokenGrant::from_body(&json!({"accessToken": ""})).unwrap_err();
        assert!(matches!(err, Error::MalformedGrant(_)));
    }

    #[test]
    fn access_token_in_ignores_non_strings() {
        assert_eq!(access_token_in(&json!({"accessToken": "at"})), Some("at"));
        assert_eq!(access_token_in(&json!({"accessToken": 5})), None);
        assert_eq!(access_token_in(&json!("accessToken")), None);
    }

    #[test]
    fn refresh_request_body_is_camel_case() {
        let body = RefreshRequest { refresh_token: "rt_1" }.to_body().unwrap();
        assert_eq!(body, json!({"refreshToken": "rt_1"}));
    }

    #[test]
    fn password_credentials_body_and_redaction() {
        let credentials = PasswordCredentials::new("alice", "hunter2");
        assert_eq!(
            credentials.to_body(),
            json!({"username": "alice", "password": "hunter2"})
        );
        let debug = format!("{credentials:?}");
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"), "password leaked: {debug}");
    }
}
