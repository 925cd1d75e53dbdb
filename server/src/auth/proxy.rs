//! Identity asserted by a pre-authenticating reverse proxy
//!
//! The proxy is the trust boundary: it must strip any client-supplied copies
//! of these headers. Nothing here can tell a forged header from a real one.

use async_trait::async_trait;
use axum::http::header::InvalidHeaderName;
use axum::http::{HeaderMap, HeaderName};

use super::error::AuthError;
use super::identity::{AuthRequest, IdentityAssertion};
use super::strategy::Authenticator;
use crate::core::config::ProxyConfig;
use crate::core::constants::{AUTH_METHOD_PROXY, LOGIN_MAX_LEN};

/// Reads the configured identity headers
#[derive(Debug, Clone)]
pub struct ProxyHeaderExtractor {
    login: HeaderName,
    email: HeaderName,
    first_name: HeaderName,
    last_name: HeaderName,
}

impl ProxyHeaderExtractor {
    pub fn new(config: &ProxyConfig) -> Result<Self, InvalidHeaderName> {
        Ok(Self {
            login: HeaderName::from_bytes(config.login_header.as_bytes())?,
            email: HeaderName::from_bytes(config.email_header.as_bytes())?,
            first_name: HeaderName::from_bytes(config.first_name_header.as_bytes())?,
            last_name: HeaderName::from_bytes(config.last_name_header.as_bytes())?,
        })
    }

    /// Build an assertion from the headers
    ///
    /// An absent or blank login header is `Ok(None)`. A login header that is
    /// present but unusable (repeated, not UTF-8, too long) fails.
    pub fn extract(&self, headers: &HeaderMap) -> Result<Option<IdentityAssertion>, AuthError> {
        let mut logins = headers.get_all(&self.login).iter();
        let Some(first) = logins.next() else {
            return Ok(None);
        };
        if logins.next().is_some() {
            tracing::warn!(header = %self.login, "Multiple login headers present");
            return Err(AuthError::AuthenticationFailed);
        }

        let Ok(login) = std::str::from_utf8(first.as_bytes()) else {
            tracing::warn!(header = %self.login, "Login header is not valid UTF-8");
            return Err(AuthError::AuthenticationFailed);
        };
        let login = login.trim();
        if login.is_empty() {
            return Ok(None);
        }
        if login.chars().count() > LOGIN_MAX_LEN {
            tracing::warn!(header = %self.login, "Login header exceeds maximum length");
            return Err(AuthError::AuthenticationFailed);
        }

        Ok(Some(IdentityAssertion {
            login: login.to_string(),
            email: optional_header(headers, &self.email),
            first_name: optional_header(headers, &self.first_name),
            last_name: optional_header(headers, &self.last_name),
            full_name: None,
        }))
    }
}

/// Trimmed UTF-8 text of an optional header; blank or undecodable values are absent
fn optional_header(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    let value = headers.get(name)?;
    let text = std::str::from_utf8(value.as_bytes()).ok()?.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[async_trait]
impl Authenticator for ProxyHeaderExtractor {
    fn method(&self) -> &'static str {
        AUTH_METHOD_PROXY
    }

    async fn authenticate(
        &self,
        request: &AuthRequest,
    ) -> Result<Option<IdentityAssertion>, AuthError> {
        self.extract(&request.headers)
    }
}
