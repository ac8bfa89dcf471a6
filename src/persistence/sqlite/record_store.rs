//! Implementation of the RecordStore trait for SqliteRecordStore

use async_trait::async_trait;

use crate::{
    models::{HexBytes, LogEntry},
    persistence::{error::PersistenceError, sqlite::SqliteRecordStore, traits::RecordStore},
};

// Helper struct for mapping from the database row
#[derive(sqlx::FromRow)]
struct LogEntryRow {
    id: String,
    tx_hash: String,
    found_at: i64,
    contract: String,
    rb: String,
    data: String,
}

impl TryFrom<LogEntryRow> for LogEntry {
    type Error = PersistenceError;

    fn try_from(row: LogEntryRow) -> Result<Self, Self::Error> {
        let hex = |column: &str, value: &str| {
            value.parse::<HexBytes>().map_err(|e| {
                PersistenceError::SerializationError(format!("column {column} of {}: {e}", row.id))
            })
        };

        Ok(LogEntry {
            tx_hash: hex("tx_hash", &row.tx_hash)?,
            found_at: u64::try_from(row.found_at)
                .map_err(|e| PersistenceError::SerializationError(e.to_string()))?,
            contract: hex("contract", &row.contract)?,
            rb: row.rb.parse().map_err(|e: std::num::ParseIntError| {
                PersistenceError::SerializationError(e.to_string())
            })?,
            data: hex("data", &row.data)?,
            id: row.id.clone(),
        })
    }
}

fn height_to_i64(height: u64) -> Result<i64, PersistenceError> {
    i64::try_from(height).map_err(|error| {
        tracing::error!(error = %error, height, "Failed to convert block height to i64 for database use.");
        PersistenceError::InvalidInput(error.to_string())
    })
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    /// Retrieves the last committed block height for a pipeline.
    #[tracing::instrument(skip(self), level = "debug")]
    async fn read_progress_marker(&self, pipeline_id: &str) -> Result<Option<u64>, PersistenceError> {
        tracing::debug!(pipeline_id, "Querying for progress marker.");

        let result: Option<i64> = self
            .execute_query_with_error_handling(
                "query progress marker",
                sqlx::query_scalar("SELECT block_number FROM processed_blocks WHERE pipeline_id = ?")
                    .bind(pipeline_id)
                    .fetch_optional(&self.pool),
            )
            .await?;

        match result {
            Some(block_number) => match u64::try_from(block_number) {
                Ok(block_number) => {
                    tracing::debug!(pipeline_id, block_number, "Progress marker found.");
                    Ok(Some(block_number))
                }
                Err(error) => {
                    tracing::error!(error = %error, pipeline_id, "Failed to convert block_number from i64 to u64.");
                    Err(PersistenceError::SerializationError(error.to_string()))
                }
            },
            None => {
                tracing::debug!(pipeline_id, "No progress marker found.");
                Ok(None)
            }
        }
    }

    /// Inserts the entries and moves the marker inside one transaction.
    #[tracing::instrument(skip(self, entries), fields(entry_count = entries.len()), level = "debug")]
    async fn commit(
        &self,
        pipeline_id: &str,
        entries: Vec<LogEntry>,
        progress_marker: u64,
    ) -> Result<(), PersistenceError> {
        let marker = height_to_i64(progress_marker)?;
        let entry_count = entries.len();

        // Dropping the transaction without commit rolls everything back, so
        // every early return below leaves the store untouched.
        let mut tx = self.pool.begin().await?;

        for entry in entries {
            sqlx::query(
                "INSERT INTO log_entry (id, tx_hash, found_at, contract, rb, data) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&entry.id)
            .bind(entry.tx_hash.to_string())
            .bind(height_to_i64(entry.found_at)?)
            .bind(entry.contract.to_string())
            .bind(entry.rb.to_string())
            .bind(entry.data.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, id = %entry.id, "Failed to insert log entry, rolling back.");
                PersistenceError::from(e)
            })?;
        }

        sqlx::query(
            "INSERT INTO processed_blocks (pipeline_id, block_number) VALUES (?, ?) \
             ON CONFLICT(pipeline_id) DO UPDATE SET \
             block_number = excluded.block_number, updated_at = CURRENT_TIMESTAMP",
        )
        .bind(pipeline_id)
        .bind(marker)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(pipeline_id, progress_marker, entry_count, "Batch committed.");
        Ok(())
    }

    /// Counts all stored records.
    #[tracing::instrument(skip(self), level = "debug")]
    async fn count_log_entries(&self) -> Result<u64, PersistenceError> {
        let count: i64 = self
            .execute_query_with_error_handling(
                "count log entries",
                sqlx::query_scalar("SELECT COUNT(*) FROM log_entry").fetch_one(&self.pool),
            )
            .await?;
        u64::try_from(count).map_err(|e| PersistenceError::SerializationError(e.to_string()))
    }

    /// Retrieves records found in blocks `from..=to`.
    #[tracing::instrument(skip(self), level = "debug")]
    async fn get_log_entries(&self, from: u64, to: u64) -> Result<Vec<LogEntry>, PersistenceError> {
        let rows: Vec<LogEntryRow> = self
            .execute_query_with_error_handling(
                "query log entries",
                sqlx::query_as(
                    "SELECT id, tx_hash, found_at, contract, rb, data FROM log_entry \
                     WHERE found_at BETWEEN ? AND ? ORDER BY found_at, rowid",
                )
                .bind(height_to_i64(from)?)
                .bind(height_to_i64(to.min(i64::MAX as u64))?)
                .fetch_all(&self.pool),
            )
            .await?;

        let entries = rows.into_iter().map(LogEntry::try_from).collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(from, to, entry_count = entries.len(), "Log entries retrieved.");
        Ok(entries)
    }

    /// Ensures all pending writes are flushed to disk.
    #[tracing::instrument(skip(self), level = "debug")]
    async fn flush(&self) -> Result<(), PersistenceError> {
        tracing::debug!("Flushing pending writes to disk.");

        self.checkpoint_wal().await?;

        tracing::debug!("Pending writes flushed successfully.");
        Ok(())
    }

    /// Performs any necessary cleanup operations before shutdown.
    #[tracing::instrument(skip(self), level = "debug")]
    async fn cleanup(&self) -> Result<(), PersistenceError> {
        tracing::debug!("Performing record store cleanup.");
        sqlx::query("PRAGMA optimize").execute(&self.pool).await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to optimize the database.");
            PersistenceError::from(e)
        })?;
        self.checkpoint_wal().await?;
        tracing::debug!("Record store cleanup completed.");
        Ok(())
    }
}
