//! Maps an identity assertion onto a stored user, creating it on first login

use std::sync::Arc;

use super::error::AuthError;
use super::identity::IdentityAssertion;
use crate::data::{NewUser, UserRepository, UserRow};

pub struct UserProvisioner {
    users: Arc<dyn UserRepository>,
    create_home_project: bool,
}

impl UserProvisioner {
    pub fn new(users: Arc<dyn UserRepository>, create_home_project: bool) -> Self {
        Self {
            users,
            create_home_project,
        }
    }

    /// Existing users are returned as stored; their profile is never
    /// overwritten from the assertion.
    pub async fn resolve_or_create(
        &self,
        identity: &IdentityAssertion,
    ) -> Result<UserRow, AuthError> {
        if let Some(user) = self.users.find_user_by_login(&identity.login).await? {
            return Ok(user);
        }

        let new_user = NewUser {
            login: identity.login.clone(),
            email: identity.email.clone(),
            realname: identity.realname(),
            password_hash: None,
            is_admin: false,
        };

        let user = match self.users.create_user(&new_user).await {
            Ok(user) => user,
            Err(e) if e.is_conflict() => {
                // Lost a race with a concurrent first login
                tracing::debug!(login = %identity.login, "User created concurrently, re-reading");
                return self
                    .users
                    .find_user_by_login(&identity.login)
                    .await?
                    .ok_or_else(|| AuthError::ProvisioningConflict {
                        login: identity.login.clone(),
                    });
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(login = %user.login, user_id = %user.id, "Provisioned new user");

        if self.create_home_project {
            match self.users.create_home_project(&user).await {
                Ok(project) => {
                    tracing::debug!(project = %project.name, "Created home project")
                }
                Err(e) => {
                    tracing::warn!(login = %user.login, error = %e, "Failed to create home project")
                }
            }
        }

        Ok(user)
    }
}
