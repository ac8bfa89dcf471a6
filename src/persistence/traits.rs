//! This module contains the storage interface used by the pipeline.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::error::PersistenceError;
use crate::models::LogEntry;

/// Durable storage for extracted records and pipeline progress.
///
/// A store serves a single writer per pipeline id: the pipeline driver is the
/// only caller of [`RecordStore::commit`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Retrieves the height of the last committed block for a pipeline, or
    /// `None` when the pipeline has never committed.
    async fn read_progress_marker(&self, pipeline_id: &str) -> Result<Option<u64>, PersistenceError>;

    /// Inserts `entries` and sets the progress marker of `pipeline_id` to
    /// `progress_marker` as one atomic unit.
    ///
    /// On error nothing is visible: neither the entries nor the new marker.
    async fn commit(
        &self,
        pipeline_id: &str,
        entries: Vec<LogEntry>,
        progress_marker: u64,
    ) -> Result<(), PersistenceError>;

    /// Counts all stored records.
    async fn count_log_entries(&self) -> Result<u64, PersistenceError>;

    /// Retrieves records found in blocks `from..=to`, in commit order.
    async fn get_log_entries(&self, from: u64, to: u64) -> Result<Vec<LogEntry>, PersistenceError>;

    /// Ensures all pending writes are flushed to disk.
    async fn flush(&self) -> Result<(), PersistenceError>;

    /// Performs any necessary cleanup operations before shutdown.
    async fn cleanup(&self) -> Result<(), PersistenceError>;
}
