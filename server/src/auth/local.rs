//! Login/password verification against locally stored hashes

use std::sync::Arc;

use async_trait::async_trait;

use super::error::AuthError;
use super::identity::{AuthRequest, IdentityAssertion};
use super::password;
use super::strategy::Authenticator;
use crate::core::constants::AUTH_METHOD_PASSWORD;
use crate::data::UserRepository;

pub struct LocalAuthenticator {
    users: Arc<dyn UserRepository>,
}

impl LocalAuthenticator {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Unknown logins, accounts without a hash and wrong passwords all fail
    /// the same way and take comparable time.
    pub async fn authenticate_credentials(
        &self,
        login: &str,
        password: &str,
    ) -> Result<IdentityAssertion, AuthError> {
        let user = self.users.find_user_by_login(login).await?;
        let stored = user.as_ref().and_then(|u| u.password_hash.as_deref());
        let matched = password::verify_blocking(password, stored).await;

        match user {
            Some(user) if matched => Ok(IdentityAssertion::from_user(&user)),
            _ => {
                tracing::info!(%login, "Local authentication failed");
                Err(AuthError::AuthenticationFailed)
            }
        }
    }
}

#[async_trait]
impl Authenticator for LocalAuthenticator {
    fn method(&self) -> &'static str {
        AUTH_METHOD_PASSWORD
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
