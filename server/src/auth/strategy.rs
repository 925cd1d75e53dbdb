//! Trust-mode dispatch
//!
//! Exactly one strategy is active per deployment. Each strategy turns a
//! request into an optional identity assertion; the resolver handles the rest.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;

use super::directory::{DirectoryAuthenticator, DirectoryClient};
use super::error::AuthError;
use super::identity::{AuthRequest, IdentityAssertion};
use super::local::LocalAuthenticator;
use super::proxy::ProxyHeaderExtractor;
use crate::core::config::{AuthConfig, TrustMode};
use crate::data::UserRepository;

/// Produces an identity from a request
///
/// `Ok(None)` means the request carried nothing this authenticator can use.
/// Rejected credentials are an error.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Recorded on sessions started through this authenticator
    fn method(&self) -> &'static str;

    async fn authenticate(
        &self,
        request: &AuthRequest,
    ) -> Result<Option<IdentityAssertion>, AuthError>;
}

pub enum AuthStrategy {
    Disabled,
    Proxy(ProxyHeaderExtractor),
    Directory(DirectoryAuthenticator),
    Local(LocalAuthenticator),
}

impl AuthStrategy {
    pub fn from_config(
        config: &AuthConfig,
        users: Arc<dyn UserRepository>,
        directory: Option<Arc<dyn DirectoryClient>>,
    ) -> Result<Self> {
        let strategy = match config.trust_mode {
            TrustMode::Disabled => Self::Disabled,
            TrustMode::Proxy => {
                tracing::warn!(
                    header = %config.proxy.login_header,
                    "Proxy trust enabled: identity headers must only be settable by the reverse proxy"
                );
                Self::Proxy(
                    ProxyHeaderExtractor::new(&config.proxy)
                        .context("Invalid proxy header name")?,
                )
            }
            TrustMode::Directory => {
                let Some(directory_config) = config.directory.clone() else {
                    bail!("Directory trust mode requires an auth.directory section");
                };
                let Some(client) = directory else {
                    bail!("Directory trust mode requires a directory client");
                };
                Self::Directory(DirectoryAuthenticator::new(directory_config, client))
            }
            TrustMode::Local => Self::Local(LocalAuthenticator::new(users)),
        };
        Ok(strategy)
    }

    pub fn trust_mode(&self) -> TrustMode {
        match self {
            Self::Disabled => TrustMode::Disabled,
            Self::Proxy(_) => TrustMode::Proxy,
            Self::Directory(_) => TrustMode::Directory,
            Self::Local(_) => TrustMode::Local,
        }
    }

    pub fn authenticator(&self) -> Option<&dyn Authenticator> {
        match self {
            Self::Disabled => None,
            Self::Proxy(a) => Some(a),
            Self::Directory(a) => Some(a),
            Self::Local(a) => Some(a),
        }
    }
}
