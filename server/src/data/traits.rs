//! Repository traits
//!
//! The auth layer depends only on these traits. SQLite implements both for
//! `Arc<SqliteService>`; tests substitute in-memory fakes.

use async_trait::async_trait;

use super::error::DataError;
use super::types::{NewUser, ProjectRow, SessionRow, UserRow};

/// User and home-project persistence
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user_by_login(&self, login: &str) -> Result<Option<UserRow>, DataError>;

    async fn find_user_by_id(&self, id: &str) -> Result<Option<UserRow>, DataError>;

    /// Insert a user. A taken login yields `DataError::Conflict`.
    async fn create_user(&self, user: &NewUser) -> Result<UserRow, DataError>;

    /// Replace the local password hash of an existing user
    async fn set_password_hash(&self, user_id: &str, hash: &str) -> Result<bool, DataError>;

    /// Create the `home:<login>` project owned by `owner`
    async fn create_home_project(&self, owner: &UserRow) -> Result<ProjectRow, DataError>;

    async fn find_home_project(&self, login: &str) -> Result<Option<ProjectRow>, DataError>;
}

/// Server-side session records
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Atomically delete `prior_id` (when given) and insert `session`
    async fn rotate_session(
        &self,
        prior_id: Option<&str>,
        session: &SessionRow,
    ) -> Result<(), DataError>;

    async fn get_session(&self, id: &str) -> Result<Option<SessionRow>, DataError>;

    /// Returns true if a record was removed
    async fn delete_session(&self, id: &str) -> Result<bool, DataError>;

    /// Remove all sessions with `expires_at <= now`, returning the count
    async fn delete_expired_sessions(&self, now: i64) -> Result<u64, DataError>;
}
