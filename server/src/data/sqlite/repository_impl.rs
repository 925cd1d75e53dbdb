//! Repository trait implementations for `Arc<SqliteService>`

use std::sync::Arc;

use async_trait::async_trait;

use crate::data::error::DataError;
use crate::data::traits::{SessionRepository, UserRepository};
use crate::data::types::{NewUser, ProjectRow, SessionRow, UserRow};

use super::SqliteService;
use super::repositories::{project, session, user};

#[async_trait]
impl UserRepository for Arc<SqliteService> {
    async fn find_user_by_login(&self, login: &str) -> Result<Option<UserRow>, DataError> {
        user::get_by_login(self.pool(), login)
            .await
            .map_err(Into::into)
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<UserRow>, DataError> {
        user::get_user(self.pool(), id).await.map_err(Into::into)
    }

    async fn create_user(&self, new_user: &NewUser) -> Result<UserRow, DataError> {
        user::create_user(self.pool(), new_user)
            .await
            .map_err(Into::into)
    }

    async fn set_password_hash(&self, user_id: &str, hash: &str) -> Result<bool, DataError> {
        user::set_password_hash(self.pool(), user_id, hash)
            .await
            .map_err(Into::into)
    }

    async fn create_home_project(&self, owner: &UserRow) -> Result<ProjectRow, DataError> {
        let name = project::home_project_name(&owner.login);
        project::create_project(self.pool(), &name, Some(&owner.id))
            .await
            .map_err(Into::into)
    }

    async fn find_home_project(&self, login: &str) -> Result<Option<ProjectRow>, DataError> {
        project::get_by_name(self.pool(), &project::home_project_name(login))
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl SessionRepository for Arc<SqliteService> {
    async fn rotate_session(
        &self,
        prior_id: Option<&str>,
        new_session: &SessionRow,
    ) -> Result<(), DataError> {
        session::rotate(self.pool(), prior_id, new_session)
            .await
            .map_err(Into::into)
    }

    async fn get_session(&self, id: &str) -> Result<Option<SessionRow>, DataError> {
        session::get_session(self.pool(), id)
            .await
            .map_err(Into::into)
    }

    async fn delete_session(&self, id: &str) -> Result<bool, DataError> {
        session::delete_session(self.pool(), id)
            .await
            .map_err(Into::into)
    }

    async fn delete_expired_sessions(&self, now: i64) -> Result<u64, DataError> {
        session::delete_expired(self.pool(), now)
            .await
            .map_err(Into::into)
    }
}
