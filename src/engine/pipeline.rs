//! The pipeline driver: the run loop that wires a block source, the batch
//! processor and the record store together.
//!
//! One iteration moves through `Idle -> FetchingBatch -> Processing ->
//! Committing` and back to `Idle`. A failed fetch or commit puts the driver
//! back in `Idle` with the stored progress marker untouched, so the same
//! range is fetched again after a backoff. Cancellation is observed while
//! idle, while waiting on the source and while backing off; a commit that has
//! started always runs to completion.

use std::{sync::Arc, time::Duration};

use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::{
    batch_processor::{BatchProcessor, BatchProcessorError},
    filtering::ReceiptFilter,
};
use crate::{
    config::{AppConfig, RetryConfig},
    persistence::{error::PersistenceError, traits::RecordStore},
    providers::traits::{BlockSource, DataSourceError},
};

/// Where the driver currently is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Between iterations.
    Idle,
    /// Waiting for the block source.
    FetchingBatch,
    /// Filtering and mapping the fetched batch.
    Processing,
    /// Writing records and the progress marker.
    Committing,
    /// The run loop has exited.
    Stopped,
}

/// The result of a single iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A batch was committed.
    Committed {
        /// The new progress marker.
        progress_marker: u64,
        /// Number of records written.
        entries: usize,
    },
    /// The source had no blocks past the progress marker.
    Empty,
    /// Cancellation was requested before the batch arrived.
    Cancelled,
}

/// Errors that end an iteration.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The block source failed.
    #[error("Block source error: {0}")]
    Source(#[from] DataSourceError),

    /// The record store failed.
    #[error("Record store error: {0}")]
    Store(#[from] PersistenceError),

    /// The source delivered blocks out of order.
    #[error("Batch processing error: {0}")]
    Processing(#[from] BatchProcessorError),

    /// Too many iterations failed in a row.
    #[error("Giving up after {failures} consecutive failures, last error: {last}")]
    RetriesExhausted {
        /// Number of consecutive failures.
        failures: u32,
        /// The error of the last attempt.
        last: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Whether the iteration can be retried from the unchanged marker.
    ///
    /// Store errors that would repeat on every attempt, such as a height the
    /// schema cannot hold or an undecodable marker row, are not retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Source(_)
                | Self::Store(PersistenceError::StoreUnavailable(_) | PersistenceError::StoreConflict(_))
        )
    }
}

/// Drives batches from a [`BlockSource`] into a [`RecordStore`].
pub struct PipelineDriver<S, R, F>
where
    S: BlockSource + ?Sized,
    R: RecordStore + ?Sized,
    F: ReceiptFilter,
{
    /// Shared application configuration.
    config: Arc<AppConfig>,
    /// Where blocks come from.
    source: Arc<S>,
    /// Where records and the progress marker go.
    store: Arc<R>,
    processor: BatchProcessor<F>,
    /// A token used to signal a graceful shutdown.
    cancellation_token: CancellationToken,
    state_tx: watch::Sender<PipelineState>,
}

impl<S, R, F> PipelineDriver<S, R, F>
where
    S: BlockSource + ?Sized,
    R: RecordStore + ?Sized,
    F: ReceiptFilter,
{
    /// Creates a new driver.
    pub fn new(
        config: Arc<AppConfig>,
        source: Arc<S>,
        store: Arc<R>,
        processor: BatchProcessor<F>,
        cancellation_token: CancellationToken,
    ) -> Self {
        let (state_tx, _) = watch::channel(PipelineState::Idle);
        Self { config, source, store, processor, cancellation_token, state_tx }
    }

    /// Subscribes to state transitions.
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state_tx.subscribe()
    }

    /// The current state.
    pub fn state(&self) -> PipelineState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, state: PipelineState) {
        self.state_tx.send_replace(state);
    }

    fn retry(&self) -> &RetryConfig {
        &self.config.retry
    }

    /// Sleeps for `duration` unless cancelled first. Returns `true` when
    /// cancelled.
    async fn wait_or_cancel(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancellation_token.cancelled() => true,
            _ = tokio::time::sleep(duration) => false,
        }
    }

    /// Runs until cancelled, or until a fatal error or too many consecutive
    /// failures.
    pub async fn run(self) -> Result<(), PipelineError> {
        let pipeline_id = self.config.pipeline_id.as_str();
        tracing::info!(pipeline_id, "Pipeline driver started.");
        let mut failures: u32 = 0;

        let result = loop {
            if self.cancellation_token.is_cancelled() {
                break Ok(());
            }

            match self.run_cycle().await {
                Ok(CycleOutcome::Committed { .. }) => failures = 0,
                Ok(CycleOutcome::Empty) => {
                    failures = 0;
                    if self.wait_or_cancel(self.config.polling_interval_ms).await {
                        break Ok(());
                    }
                }
                Ok(CycleOutcome::Cancelled) => break Ok(()),
                Err(e) if e.is_transient() => {
                    failures = failures.saturating_add(1);
                    self.set_state(PipelineState::Idle);
                    if self.retry().is_exhausted(failures) {
                        tracing::error!(error = %e, failures, "Pipeline failed too many times in a row.");
                        break Err(PipelineError::RetriesExhausted { failures, last: Box::new(e) });
                    }
                    let delay = self.retry().backoff(failures);
                    tracing::warn!(error = %e, failures, delay = ?delay, "Pipeline iteration failed, retrying from the last progress marker.");
                    if self.wait_or_cancel(delay).await {
                        break Ok(());
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Fatal pipeline error.");
                    break Err(e);
                }
            }
        };

        self.set_state(PipelineState::Stopped);
        tracing::info!(pipeline_id, "Pipeline driver has shut down.");
        result
    }

    /// Performs one iteration: read the marker, fetch the next batch, process
    /// it and commit the result.
    pub async fn run_cycle(&self) -> Result<CycleOutcome, PipelineError> {
        let pipeline_id = self.config.pipeline_id.as_str();
        self.set_state(PipelineState::Idle);

        let marker = self.store.read_progress_marker(pipeline_id).await?;
        let from_block = marker.map_or(self.config.start_block, |height| height.saturating_add(1));

        self.set_state(PipelineState::FetchingBatch);
        let batch = tokio::select! {
            biased;
            _ = self.cancellation_token.cancelled() => {
                tracing::info!(from_block, "Cancellation requested while waiting for blocks.");
                self.set_state(PipelineState::Idle);
                return Ok(CycleOutcome::Cancelled);
            }
            batch = self.source.next_batch(from_block) => batch?,
        };

        if batch.is_empty() {
            tracing::debug!(from_block, "No new blocks available.");
            self.set_state(PipelineState::Idle);
            return Ok(CycleOutcome::Empty);
        }

        self.set_state(PipelineState::Processing);
        let processed = self.processor.process(from_block, &batch)?;
        drop(batch);

        let Some(progress_marker) = processed.progress_marker else {
            self.set_state(PipelineState::Idle);
            return Ok(CycleOutcome::Empty);
        };

        self.set_state(PipelineState::Committing);
        let entries = processed.entries.len();
        self.store.commit(pipeline_id, processed.entries, progress_marker).await?;

        tracing::info!(
            from_block,
            to_block = progress_marker,
            entries,
            skipped = processed.skipped,
            "Processed block range."
        );
        self.set_state(PipelineState::Idle);
        Ok(CycleOutcome::Committed { progress_marker, entries })
    }
}
