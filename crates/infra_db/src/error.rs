//! Database error types
//!
//! PostgreSQL error codes are mapped onto specific variants so adapters can
//! translate them into domain errors without inspecting driver internals.

use thiserror::Error;

use core_kernel::ErrorKind;

/// Errors that can occur during database operations
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to establish a database connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Entity not found in database
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// Unique constraint violation (23505)
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Foreign key constraint violation (23503)
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation (23514)
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// The row changed since it was read
    #[error("{entity} {id} was modified concurrently: expected version {expected}, found {actual}")]
    VersionConflict {
        entity: &'static str,
        id: String,
        expected: u64,
        actual: u64,
    },

    /// Migration error
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be turned into a domain value
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Pool exhaustion - no available connections
    #[error("Connection pool exhausted")]
    PoolExhausted,
}

impl DatabaseError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        DatabaseError::NotFound(format!("{} with id '{}' not found", entity, id))
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        DatabaseError::SerializationError(message.into())
    }

    /// Checks if this error indicates a record was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound(_))
    }

    /// Checks if this error is a constraint violation
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            DatabaseError::DuplicateEntry(_)
                | DatabaseError::ForeignKeyViolation(_)
                | DatabaseError::ConstraintViolation(_)
        )
    }

    /// Checks if this error is a connection-related issue
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            DatabaseError::ConnectionFailed(_) | DatabaseError::PoolExhausted
        )
    }

    /// Returns the failure category
    pub fn kind(&self) -> ErrorKind {
        match self {
            DatabaseError::NotFound(_) => ErrorKind::NotFound,
            DatabaseError::VersionConflict { .. } | DatabaseError::DuplicateEntry(_) => {
                ErrorKind::Conflict
            }
            DatabaseError::ForeignKeyViolation(_) | DatabaseError::ConstraintViolation(_) => {
                ErrorKind::Consistency
            }
            _ => ErrorKind::Storage,
        }
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Record not found".to_string()),
            sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted,
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                DatabaseError::SerializationError(error.to_string())
            }
            sqlx::Error::Database(db_err) => {
                // https://www.postgresql.org/docs/current/errcodes-appendix.html
                let message = db_err.message().to_string();
                match db_err.code().as_deref() {
                    Some("23505") => DatabaseError::DuplicateEntry(message),
                    Some("23503") => DatabaseError::ForeignKeyViolation(message),
                    Some("23514") => DatabaseError::ConstraintViolation(message),
                    _ => DatabaseError::QueryFailed(message),
                }
            }
            _ => DatabaseError::QueryFailed(error.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::MigrationFailed(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let error = DatabaseError::from(sqlx::Error::RowNotFound);
        assert!(error.is_not_found());
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_version_conflict_is_conflict_kind() {
        let error = DatabaseError::VersionConflict {
            entity: "invoice",
            id: "INV-1".into(),
            expected: 3,
            actual: 4,
        };
        assert_eq!(error.kind(), ErrorKind::Conflict);
        assert!(error.to_string().contains("expected version 3"));
    }

    #[test]
    fn test_pool_timeout_is_connection_error() {
        let error = DatabaseError::from(sqlx::Error::PoolTimedOut);
        assert!(error.is_connection_error());
        assert_eq!(error.kind(), ErrorKind::Storage);
    }
}
