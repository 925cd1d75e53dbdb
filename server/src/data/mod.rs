//! Data storage layer
//!
//! - `sqlite` - Embedded database holding users, projects and sessions
//! - `traits` - Repository traits the auth layer is written against
//! - `types` - Row types shared across layers
//! - `error` - Error type for all repository operations

pub mod error;
pub mod sqlite;
pub mod traits;
pub mod types;

pub use error::DataError;
pub use sqlite::SqliteService;
pub use traits::{SessionRepository, UserRepository};
pub use types::{NewUser, ProjectRow, SessionRow, UserRow};
