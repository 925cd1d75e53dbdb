//! Server-side sessions carried by signed tokens
//!
//! The token is a JWT whose `jti` names a session record. A token is only
//! honored while its signature verifies, it has not expired, and its record
//! still exists. Deleting the record revokes the token.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::error::AuthError;
use super::jwt::{self, SessionClaims};
use crate::core::constants::SESSION_PURGE_INTERVAL_SECS;
use crate::data::{DataError, SessionRepository, SessionRow, UserRepository, UserRow};

/// A freshly issued session token
#[derive(Clone)]
pub struct SessionToken {
    pub value: String,
    /// Unix timestamp (seconds)
    pub expires_at: i64,
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

pub struct SessionManager {
    sessions: Arc<dyn SessionRepository>,
    users: Arc<dyn UserRepository>,
    signing_key: Vec<u8>,
    ttl: chrono::Duration,
}

impl SessionManager {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        users: Arc<dyn UserRepository>,
        signing_key: Vec<u8>,
        ttl_days: u32,
    ) -> Self {
        Self {
            sessions,
            users,
            signing_key,
            ttl: chrono::Duration::days(i64::from(ttl_days)),
        }
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    /// Issue a new session for `user`
    ///
    /// Any session named by `prior_token` is invalidated in the same
    /// transaction, so a session identifier is never reused across logins.
    pub async fn start(
        &self,
        prior_token: Option<&str>,
        user: &UserRow,
        auth_method: &str,
    ) -> Result<SessionToken, AuthError> {
        let prior_id = prior_token.and_then(|t| self.session_id_of(t));

        let claims = SessionClaims::new(&user.id, &user.login, auth_method, self.ttl);
        let value = jwt::encode_token(&self.signing_key, &claims)
            .map_err(|e| AuthError::Session(e.to_string()))?;

        let record = SessionRow {
            id: claims.jti.clone(),
            user_id: user.id.clone(),
            auth_method: auth_method.to_string(),
            created_at: claims.iat,
            expires_at: claims.exp,
        };
        self.sessions
            .rotate_session(prior_id.as_deref(), &record)
            .await?;

        tracing::debug!(
            login = %user.login,
            session_id = %record.id,
            rotated = prior_id.is_some(),
            "Session started"
        );
        Ok(SessionToken {
            value,
            expires_at: record.expires_at,
        })
    }

    /// Revoke the session named by `token`. Unknown or forged tokens are ignored.
    pub async fn end(&self, token: &str) -> Result<(), AuthError> {
        let Some(session_id) = self.session_id_of(token) else {
            return Ok(());
        };
        let removed = self.sessions.delete_session(&session_id).await?;
        tracing::debug!(%session_id, removed, "Session ended");
        Ok(())
    }

    /// The user behind a still-valid session token
    ///
    /// Missing, forged, expired and revoked tokens are `Ok(None)`; storage
    /// failures are returned as errors.
    pub async fn try_current(&self, token: &str) -> Result<Option<UserRow>, AuthError> {
        let claims = match jwt::decode_token(token, &self.signing_key) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring session token");
                return Ok(None);
            }
        };

        self.lookup(&claims).await.map_err(|e| {
            if e.is_transient() {
                tracing::warn!(error = %e, "Session lookup failed (transient)");
            } else {
                tracing::error!(error = %e, "Session lookup failed");
            }
            AuthError::from(e)
        })
    }

    async fn lookup(&self, claims: &SessionClaims) -> Result<Option<UserRow>, DataError> {
        let now = chrono::Utc::now().timestamp();
        let Some(record) = self.sessions.get_session(&claims.jti).await? else {
            return Ok(None);
        };
        if record.is_expired(now) || record.user_id != claims.user_id() {
            return Ok(None);
        }
        self.users.find_user_by_id(&record.user_id).await
    }

    /// Delete expired session records
    pub async fn purge_expired(&self) -> Result<u64, AuthError> {
        let now = chrono::Utc::now().timestamp();
        Ok(self.sessions.delete_expired_sessions(now).await?)
    }

    pub fn start_purge_task(
        self: &Arc<Self>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(SESSION_PURGE_INTERVAL_SECS));
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::debug!("Session purge task shutting down");
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        match manager.purge_expired().await {
                            Ok(0) => {}
                            Ok(count) => tracing::debug!(count, "Purged expired sessions"),
                            Err(e) => tracing::warn!("Session purge failed: {}", e),
                        }
                    }
                }
            }
        })
    }

    /// Session id of a correctly signed token, expired or not
    fn session_id_of(&self, token: &str) -> Option<String> {
        jwt::decode_token_ignoring_expiry(token, &self.signing_key)
            .ok()
            .map(|claims| claims.jti)
    }
}
