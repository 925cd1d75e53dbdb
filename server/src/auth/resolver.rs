//! Per-request authentication resolution
//!
//! Runs the configured strategy, reconciles the asserted identity with the
//! stored user, and starts a session. Requests without anything to
//! authenticate fall back to an existing session.

use std::sync::Arc;

use super::error::AuthError;
use super::identity::AuthRequest;
use super::provisioner::UserProvisioner;
use super::session::{SessionManager, SessionToken};
use super::strategy::AuthStrategy;
use crate::core::config::TrustMode;
use crate::data::UserRow;

/// A resolved user, plus the token to hand back when a new session was started
#[derive(Debug)]
pub struct Resolved {
    pub user: UserRow,
    pub token: Option<SessionToken>,
}

pub struct AuthResolver {
    strategy: AuthStrategy,
    provisioner: UserProvisioner,
    sessions: Arc<SessionManager>,
}

impl AuthResolver {
    pub fn new(
        strategy: AuthStrategy,
        provisioner: UserProvisioner,
        sessions: Arc<SessionManager>,
    ) -> Self {
        Self {
            strategy,
            provisioner,
            sessions,
        }
    }

    pub fn trust_mode(&self) -> TrustMode {
        self.strategy.trust_mode()
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub async fn resolve(&self, request: &AuthRequest) -> Result<Resolved, AuthError> {
        let Some(authenticator) = self.strategy.authenticator() else {
            return self.resume(request).await;
        };

        let identity = match authenticator.authenticate(request).await? {
            Some(identity) => identity,
            // Proxy mode has no login step: a missing header means anonymous,
            // whatever session cookie the client still holds.
            None if self.trust_mode() == TrustMode::Proxy => {
                return Err(AuthError::Unauthenticated);
            }
            None => return self.resume(request).await,
        };

        // Headers arrive on every proxied request; keep a matching session
        // instead of issuing a new one each time.
        if self.trust_mode() == TrustMode::Proxy {
            if let Some(token) = request.session_token.as_deref() {
                if let Some(user) = self.sessions.try_current(token).await? {
                    if user.login == identity.login {
                        return Ok(Resolved { user, token: None });
                    }
                }
            }
        }

        let user = self.provisioner.resolve_or_create(&identity).await?;
        let token = self
            .sessions
            .start(request.session_token.as_deref(), &user, authenticator.method())
            .await?;

        tracing::info!(
            login = %user.login,
            method = authenticator.method(),
            "User authenticated"
        );
        Ok(Resolved {
            user,
            token: Some(token),
        })
    }

    /// End the request's session, if any
    pub async fn logout(&self, request: &AuthRequest) -> Result<(), AuthError> {
        match request.session_token.as_deref() {
            Some(token) => self.sessions.end(token).await,
            None => Ok(()),
        }
    }

    async fn resume(&self, request: &AuthRequest) -> Result<Resolved, AuthError> {
        let token = request
            .session_token
            .as_deref()
            .ok_or(AuthError::Unauthenticated)?;
        match self.sessions.try_current(token).await? {
            Some(user) => Ok(Resolved { user, token: None }),
            None => Err(AuthError::Unauthenticated),
        }
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
