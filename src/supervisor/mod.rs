//! The Supervisor module manages the lifecycle of the indexer.
//!
//! The supervisor owns the pipeline driver and the record store. It installs
//! a signal handler, runs the driver as a supervised task and, once the
//! driver has stopped, flushes and cleans up the store within the configured
//! shutdown timeout.
//!
//! If the driver fails, the failure is returned from [`Supervisor::run`] after
//! cleanup, so the process exits with an error.

mod builder;

use std::sync::Arc;

pub use builder::SupervisorBuilder;
use thiserror::Error;
use tokio::{signal, task::JoinSet};
use tokio_util::sync::CancellationToken;

use crate::{
    config::AppConfig,
    engine::{
        batch_processor::BatchProcessor,
        filtering::LogDataFilter,
        pipeline::{PipelineDriver, PipelineError},
    },
    persistence::traits::RecordStore,
    providers::traits::BlockSource,
};

/// Represents the set of errors that can occur during the supervisor's
/// operation.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A required configuration was not provided to the `SupervisorBuilder`.
    #[error("Missing configuration for Supervisor")]
    MissingConfig,

    /// A record store was not provided to the `SupervisorBuilder`.
    #[error("Missing record store for Supervisor")]
    MissingRecordStore,

    /// A block source was not provided to the `SupervisorBuilder`.
    #[error("Missing block source for Supervisor")]
    MissingBlockSource,

    /// An error occurred due to an invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The pipeline driver stopped with an error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// A supervised task panicked or was aborted.
    #[error("Supervised task failed: {0}")]
    TaskFailed(String),
}

/// The primary runtime manager for the application.
pub struct Supervisor {
    /// Shared application configuration.
    config: Arc<AppConfig>,

    /// The record store the pipeline commits to.
    store: Arc<dyn RecordStore>,

    /// The source of block batches.
    source: Arc<dyn BlockSource>,

    /// The batch processor handed to the driver when it starts.
    processor: BatchProcessor<LogDataFilter>,

    /// A token used to signal a graceful shutdown to all supervised tasks.
    cancellation_token: CancellationToken,

    /// A set of all spawned tasks that the supervisor is actively managing.
    join_set: JoinSet<Result<(), SupervisorError>>,
}

impl Supervisor {
    /// Creates a new Supervisor instance with all its required components.
    ///
    /// This is typically called by the `SupervisorBuilder` after it has
    /// assembled and validated the necessary dependencies.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn RecordStore>,
        source: Arc<dyn BlockSource>,
        processor: BatchProcessor<LogDataFilter>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            source,
            processor,
            cancellation_token: CancellationToken::new(),
            join_set: JoinSet::new(),
        }
    }

    /// Returns a new `SupervisorBuilder` instance.
    ///
    /// This is the public entry point for creating a supervisor.
    pub fn builder() -> SupervisorBuilder {
        SupervisorBuilder::new()
    }

    /// A handle to the shutdown token. Cancelling it stops the supervisor as
    /// if a signal had been received.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Starts the supervisor and runs until shutdown.
    ///
    /// 1. Spawns a signal handler listening for `SIGINT` (Ctrl+C) and
    ///    `SIGTERM`.
    /// 2. Spawns the pipeline driver.
    /// 3. Waits for every task to finish. When any task ends, the others are
    ///    told to stop; the driver finishes its in-flight commit first.
    /// 4. Flushes and cleans up the record store, bounded by the shutdown
    ///    timeout.
    pub async fn run(mut self) -> Result<(), SupervisorError> {
        let signal_token = self.cancellation_token.clone();
        self.join_set.spawn(async move {
            wait_for_shutdown_signal(signal_token).await;
            Ok(())
        });

        let driver = PipelineDriver::new(
            Arc::clone(&self.config),
            Arc::clone(&self.source),
            Arc::clone(&self.store),
            self.processor,
            self.cancellation_token.clone(),
        );
        self.join_set.spawn(async move { driver.run().await.map_err(SupervisorError::from) });

        let mut first_error: Option<SupervisorError> = None;
        while let Some(joined) = self.join_set.join_next().await {
            let error = match joined {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e),
                Err(e) => Some(SupervisorError::TaskFailed(e.to_string())),
            };
            if let Some(error) = error {
                tracing::error!(error = %error, "A critical task failed. Initiating shutdown.");
                first_error.get_or_insert(error);
            }
            self.cancellation_token.cancel();
        }
        tracing::info!("All supervised tasks have completed.");

        // --- Graceful Shutdown ---
        tracing::info!("Starting graceful resource cleanup...");
        let shutdown_timeout = self.config.shutdown_timeout;

        let cleanup_logic = async {
            if let Err(e) = self.store.flush().await {
                tracing::error!(error = %e, "Failed to flush pending writes, but continuing cleanup.");
            }
            if let Err(e) = self.store.cleanup().await {
                tracing::error!(error = %e, "Failed to perform record store cleanup, but continuing.");
            }
            match self.store.read_progress_marker(&self.config.pipeline_id).await {
                Ok(Some(last_block)) => tracing::info!(
                    last_processed_block = last_block,
                    "Final state: last processed block recorded."
                ),
                Ok(None) => tracing::info!("Final state: no blocks have been processed yet."),
                Err(e) => {
                    tracing::warn!(error = %e, "Could not retrieve final state during cleanup.")
                }
            }
        };

        if tokio::time::timeout(shutdown_timeout, cleanup_logic).await.is_err() {
            tracing::warn!(
                "Cleanup did not complete within the timeout of {:?}. Continuing shutdown.",
                shutdown_timeout
            );
        } else {
            tracing::info!("Cleanup completed successfully.");
        }

        tracing::info!("Supervisor shutdown complete.");
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Resolves on SIGINT, SIGTERM or cancellation of `token`, and cancels
/// `token` in every case.
async fn wait_for_shutdown_signal(token: CancellationToken) {
    let ctrl_c = signal::ctrl_c();
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to register SIGTERM handler.");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("SIGINT (Ctrl+C) received, initiating graceful shutdown."),
        _ = terminate => tracing::info!("SIGTERM received, initiating graceful shutdown."),
        _ = token.cancelled() => tracing::debug!("Shutdown requested, signal handler exiting."),
    }

    token.cancel();
}
