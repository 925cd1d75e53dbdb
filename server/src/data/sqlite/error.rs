//! SQLite error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SqliteError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration {version} ({name}) failed: {error}")]
    MigrationFailed {
        version: i32,
        name: String,
        error: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl SqliteError {
    /// Map an INSERT failure, turning UNIQUE violations into `Conflict`
    pub fn on_insert(e: sqlx::Error, what: &str) -> Self {
        match e.as_database_error() {
            Some(db) if db.is_unique_violation() => {
                Self::Conflict(format!("{} already exists", what))
            }
            _ => Self::Database(e),
        }
    }
}
