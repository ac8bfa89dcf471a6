//! This module provides a concrete implementation of the RecordStore using
//! SQLite.

use std::str::FromStr;

use sqlx::{SqlitePool, sqlite::SqliteConnectOptions};

pub mod record_store;

use crate::persistence::error::PersistenceError;

/// A concrete implementation of the RecordStore using SQLite.
pub struct SqliteRecordStore {
    /// The SQLite connection pool used for database operations.
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Creates a new instance of SqliteRecordStore with the provided
    /// database URL. This will create the database file if it does not
    /// exist.
    #[tracing::instrument(level = "info")]
    pub async fn new(database_url: &str) -> Result<Self, PersistenceError> {
        tracing::debug!(database_url, "Attempting to connect to SQLite database.");
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| PersistenceError::InvalidInput(e.to_string()))?
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await.map_err(|e| {
            PersistenceError::StoreUnavailable(format!("Failed to connect to database: {e}"))
        })?;
        tracing::info!(database_url, "Successfully connected to SQLite database.");
        Ok(Self { pool })
    }

    /// Runs database migrations.
    #[tracing::instrument(skip(self), level = "info")]
    pub async fn run_migrations(&self) -> Result<(), PersistenceError> {
        tracing::debug!("Running database migrations.");
        sqlx::migrate!("./migrations").run(&self.pool).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run database migrations.");
            PersistenceError::MigrationError(e.to_string())
        })?;
        tracing::info!("Database migrations completed successfully.");
        Ok(())
    }

    /// Closes the connection pool gracefully.
    #[tracing::instrument(skip(self), level = "info")]
    pub async fn close(&self) {
        tracing::debug!("Closing SQLite connection pool.");
        self.pool.close().await;
        tracing::info!("SQLite connection pool closed successfully.");
    }

    /// Truncates the write-ahead log into the main database file.
    async fn checkpoint_wal(&self) -> Result<(), PersistenceError> {
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)").execute(&self.pool).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to checkpoint the write-ahead log.");
            PersistenceError::from(e)
        })?;
        Ok(())
    }

    /// Helper to execute database queries with consistent error handling
    async fn execute_query_with_error_handling<F, T>(
        &self,
        operation: &str,
        query_fn: F,
    ) -> Result<T, PersistenceError>
    where
        F: std::future::Future<Output = Result<T, sqlx::Error>>,
    {
        query_fn.await.map_err(|e| {
            tracing::error!(error = %e, operation = %operation, "Database operation failed.");
            PersistenceError::from(e)
        })
    }
}
