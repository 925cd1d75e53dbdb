//! Request and identity values passed through a resolution

use std::fmt;

use axum::http::HeaderMap;

use crate::data::UserRow;

/// Identity claimed by an authenticator, before reconciliation with a stored user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityAssertion {
    pub login: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Combined display name, when the source provides one
    pub full_name: Option<String>,
}

impl IdentityAssertion {
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            ..Default::default()
        }
    }

    /// Assertion describing an already stored user
    pub fn from_user(user: &UserRow) -> Self {
        Self {
            login: user.login.clone(),
            email: user.email.clone(),
            full_name: user.realname.clone(),
            ..Default::default()
        }
    }

    /// Display name for a new account
    ///
    /// "first last" when both parts are known, else the combined name,
    /// else whichever single part exists.
    pub fn realname(&self) -> Option<String> {
        let first = non_blank(self.first_name.as_deref());
        let last = non_blank(self.last_name.as_deref());
        match (first, last) {
            (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
            (first, last) => non_blank(self.full_name.as_deref())
                .or(first)
                .or(last)
                .map(String::from),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Submitted login form
#[derive(Clone)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything a resolution may look at
#[derive(Clone, Default)]
pub struct AuthRequest {
    pub headers: HeaderMap,
    pub credentials: Option<Credentials>,
    pub session_token: Option<String>,
}

impl AuthRequest {
    pub fn new(headers: HeaderMap) -> Self {
        Self {
            headers,
            ..Default::default()
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }
}

impl fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthRequest")
            .field("headers", &self.headers.len())
            .field("credentials", &self.credentials)
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
