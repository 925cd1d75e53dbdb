//! Error type for the persistence layer

use thiserror::Error;

use super::sqlite::SqliteError;

/// Error returned by repository operations
#[derive(Error, Debug)]
pub enum DataError {
    /// SQLite database error
    #[error("SQLite error: {0}")]
    Sqlite(sqlx::Error),

    /// Migration failed
    #[error("Migration {version} ({name}) failed: {error}")]
    MigrationFailed {
        version: i32,
        name: String,
        error: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Uniqueness violation (e.g. a login or project name already taken)
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl DataError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Check if this is a connection-related error that might be transient
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Sqlite(sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_))
        )
    }
}

impl From<SqliteError> for DataError {
    fn from(e: SqliteError) -> Self {
        match e {
            SqliteError::Database(e) => Self::Sqlite(e),
            SqliteError::MigrationFailed {
                version,
                name,
                error,
            } => Self::MigrationFailed {
                version,
                name,
                error,
            },
            SqliteError::Io(e) => Self::Io(e),
            SqliteError::Conflict(msg) => Self::Conflict(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_sqlite_conflict() {
        let err: DataError = SqliteError::Conflict("user 'tux' already exists".to_string()).into();
        assert!(err.is_conflict());
        assert_eq!(err.to_string(), "Conflict: user 'tux' already exists");
    }

    #[test]
    fn test_from_sqlite_database() {
        let err: DataError = SqliteError::Database(sqlx::Error::PoolTimedOut).into();
        assert!(!err.is_conflict());
        assert!(err.is_transient());
    }

    #[test]
    fn test_not_transient() {
        let err = DataError::Sqlite(sqlx::Error::RowNotFound);
        assert!(!err.is_transient());
        assert!(!DataError::Config("x".to_string()).is_transient());
    }
}
