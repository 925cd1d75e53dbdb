//! Directory (LDAP-style) authentication
//!
//! The wire protocol is supplied by a `DirectoryClient` implementation. This
//! module owns the sequencing: bind as the search principal, find exactly one
//! entry, verify the end-user's password, map attributes, and always unbind.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::error::AuthError;
use super::identity::{AuthRequest, IdentityAssertion};
use super::password;
use super::strategy::Authenticator;
use crate::core::config::{DirectoryAuthMode, DirectoryConfig};
use crate::core::constants::AUTH_METHOD_DIRECTORY;

/// Failure reported by a directory client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// The directory rejected the bind credentials
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Connection, TLS, protocol or timeout failure
    #[error("transport error: {0}")]
    Transport(String),
}

/// One search result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attributes: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, values: &[&str]) -> Self {
        self.attributes.insert(
            name.to_string(),
            values.iter().map(|v| v.to_string()).collect(),
        );
        self
    }

    /// First value of an attribute; attribute names compare case-insensitively
    pub fn first(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// Opens connections to the directory service
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn DirectoryConnection>, DirectoryError>;
}

/// A single, unpooled directory connection
#[async_trait]
pub trait DirectoryConnection: Send {
    async fn bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError>;

    async fn search(
        &mut self,
        base: &str,
        filter: &str,
        attributes: &[String],
    ) -> Result<Vec<DirectoryEntry>, DirectoryError>;

    async fn unbind(&mut self) -> Result<(), DirectoryError>;
}

/// Escape a value for use inside an LDAP search filter (RFC 4515)
pub fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\\' => escaped.push_str("\\5c"),
            '\0' => escaped.push_str("\\00"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn unavailable(e: DirectoryError) -> AuthError {
    AuthError::DirectoryUnavailable(e.to_string())
}

pub struct DirectoryAuthenticator {
    config: DirectoryConfig,
    client: Arc<dyn DirectoryClient>,
}

impl DirectoryAuthenticator {
    pub fn new(config: DirectoryConfig, client: Arc<dyn DirectoryClient>) -> Self {
        Self { config, client }
    }

    /// Verify `login`/`password` against the directory
    pub async fn authenticate_credentials(
        &self,
        login: &str,
        password: &str,
    ) -> Result<IdentityAssertion, AuthError> {
        // An empty password would turn the user bind into an anonymous bind
        if password.is_empty() {
            tracing::debug!(%login, "Rejecting empty directory password");
            return Err(AuthError::AuthenticationFailed);
        }

        let mut conn = self
            .timed("connect", self.client.connect())
            .await
            .map_err(unavailable)?;

        let outcome = self.verify(conn.as_mut(), login, password).await;

        if let Err(e) = self.timed("unbind", conn.unbind()).await {
            tracing::warn!(error = %e, "Directory unbind failed");
        }

        match &outcome {
            Ok(_) => tracing::debug!(%login, "Directory authentication succeeded"),
            Err(AuthError::DirectoryUnavailable(reason)) => {
                tracing::error!(%login, %reason, "Directory unavailable")
            }
            Err(_) => tracing::info!(%login, "Directory authentication failed"),
        }
        outcome
    }

    async fn verify(
        &self,
        conn: &mut dyn DirectoryConnection,
        login: &str,
        password: &str,
    ) -> Result<IdentityAssertion, AuthError> {
        let cfg = &self.config;

        match self
            .timed("bind", conn.bind(&cfg.search_user, &cfg.search_auth))
            .await
        {
            Ok(()) => {}
            Err(DirectoryError::InvalidCredentials) => {
                return Err(AuthError::DirectoryUnavailable(
                    "search principal was rejected".to_string(),
                ));
            }
            Err(e) => return Err(unavailable(e)),
        }

        let filter = format!("({}={})", cfg.search_attr, escape_filter_value(login));
        let mut entries = self
            .timed(
                "search",
                conn.search(&cfg.search_base, &filter, &cfg.requested_attributes()),
            )
            .await
            .map_err(unavailable)?;

        let entry = match entries.len() {
            1 => entries.remove(0),
            0 => {
                tracing::debug!(%filter, "No directory entry matched");
                return Err(AuthError::AuthenticationFailed);
            }
            count => {
                tracing::warn!(%filter, count, "Ambiguous directory match");
                return Err(AuthError::AuthenticationFailed);
            }
        };

        match cfg.authenticate {
            DirectoryAuthMode::Bind => {
                match self.timed("bind", conn.bind(&entry.dn, password)).await {
                    Ok(()) => {}
                    Err(DirectoryError::InvalidCredentials) => {
                        return Err(AuthError::AuthenticationFailed);
                    }
                    Err(e) => return Err(unavailable(e)),
                }
            }
            DirectoryAuthMode::Local => {
                let stored = entry.first(&cfg.password_attr);
                if stored.is_none() {
                    tracing::warn!(dn = %entry.dn, attr = %cfg.password_attr, "Entry has no password attribute");
                }
                if !password::verify_blocking(password, stored).await {
                    return Err(AuthError::AuthenticationFailed);
                }
            }
        }

        Ok(self.map_entry(login, &entry))
    }

    fn map_entry(&self, login: &str, entry: &DirectoryEntry) -> IdentityAssertion {
        let cfg = &self.config;
        let attr = |name: &Option<String>| {
            name.as_deref()
                .and_then(|n| entry.first(n))
                .map(String::from)
        };

        IdentityAssertion {
            login: login.to_string(),
            email: entry.first(&cfg.mail_attr).map(String::from),
            first_name: attr(&cfg.first_name_attr),
            last_name: attr(&cfg.last_name_attr),
            full_name: entry.first(&cfg.name_attr).map(String::from),
        }
    }

    /// Bound a directory operation by the configured timeout
    async fn timed<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = Result<T, DirectoryError>>,
    ) -> Result<T, DirectoryError> {
        match tokio::time::timeout(self.config.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(DirectoryError::Transport(format!(
                "{} timed out after {}s",
                op,
                self.config.timeout.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl Authenticator for DirectoryAuthenticator {
    fn method(&self) -> &'static str {
        AUTH_METHOD_DIRECTORY
    }

    async fn authenticate(
        &self,
        request: &AuthRequest,
    ) -> Result<Option<IdentityAssertion>, AuthError> {
        match &request.credentials {
            Some(creds) => self
                .authenticate_credentials(&creds.login, &creds.password)
                .await
                .map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
#[path = "directory_tests.rs"]
mod tests;
