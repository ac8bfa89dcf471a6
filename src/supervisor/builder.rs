//! This module provides the `SupervisorBuilder` for constructing a `Supervisor`.

use std::sync::Arc;

use super::{Supervisor, SupervisorError};
use crate::{
    config::AppConfig,
    engine::{batch_processor::BatchProcessor, filtering::LogDataFilter},
    persistence::traits::RecordStore,
    providers::traits::BlockSource,
};

/// A builder for creating a `Supervisor` instance.
#[derive(Default)]
pub struct SupervisorBuilder {
    config: Option<AppConfig>,
    store: Option<Arc<dyn RecordStore>>,
    source: Option<Arc<dyn BlockSource>>,
}

impl SupervisorBuilder {
    /// Creates a new, empty `SupervisorBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the application configuration for the `Supervisor`.
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the record store (database connection) for the `Supervisor`.
    pub fn store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the block source (e.g., the data portal) for the `Supervisor`.
    pub fn source(mut self, source: Arc<dyn BlockSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Assembles and validates the components to build a `Supervisor`.
    ///
    /// Fails when a component is missing, when no log types are configured,
    /// or when the batch size is zero.
    pub fn build(self) -> Result<Supervisor, SupervisorError> {
        let config = self.config.ok_or(SupervisorError::MissingConfig)?;
        let store = self.store.ok_or(SupervisorError::MissingRecordStore)?;
        let source = self.source.ok_or(SupervisorError::MissingBlockSource)?;

        let log_types = config.log_type_set();
        if log_types.is_empty() {
            return Err(SupervisorError::InvalidConfiguration(
                "log_types must contain at least one discriminator".into(),
            ));
        }
        if config.batch_size == 0 {
            return Err(SupervisorError::InvalidConfiguration(
                "batch_size must be greater than zero".into(),
            ));
        }
        tracing::info!(
            pipeline_id = %config.pipeline_id,
            log_types = ?log_types.to_sorted_vec(),
            "Log filter configured."
        );

        let processor = BatchProcessor::new(LogDataFilter::new(log_types));
        Ok(Supervisor::new(config, store, source, processor))
    }
}
