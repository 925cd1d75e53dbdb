//! SQLite repositories
//!
//! Types (UserRow, ProjectRow, SessionRow) live in `crate::data::types`.

pub mod project;
pub mod session;
pub mod user;
