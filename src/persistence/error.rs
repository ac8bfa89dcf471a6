//! This module contains the error types for the persistence layer.

use thiserror::Error;

/// Errors that can occur in the persistence layer.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// The store could not be reached or failed while executing a statement.
    #[error("The data store is unavailable: {0}")]
    StoreUnavailable(String),

    /// The store rejected a write because it violates a constraint.
    #[error("The data store rejected the write: {0}")]
    StoreConflict(String),

    /// An error occurred during serialization or deserialization.
    #[error("Failed to serialize or deserialize data: {0}")]
    SerializationError(String),

    /// An error occurred during a database migration.
    #[error("A data migration failed: {0}")]
    MigrationError(String),

    /// An invalid configuration or input was provided.
    #[error("An invalid configuration or input was provided: {0}")]
    InvalidInput(String),
}

impl From<sqlx::Error> for PersistenceError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db)
                if db.is_unique_violation()
                    || db.is_check_violation()
                    || db.is_foreign_key_violation() =>
            {
                Self::StoreConflict(error.to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                Self::SerializationError(error.to_string())
            }
            _ => Self::StoreUnavailable(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_unavailable() {
        let error: PersistenceError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(error, PersistenceError::StoreUnavailable(_)));
    }

    #[test]
    fn test_row_not_found_is_unavailable() {
        let error: PersistenceError = sqlx::Error::RowNotFound.into();
        assert!(matches!(error, PersistenceError::StoreUnavailable(_)));
    }
}
