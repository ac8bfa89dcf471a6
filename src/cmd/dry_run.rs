use clap::Parser;
use thiserror::Error;

use crate::{
    config::AppConfig,
    engine::{
        batch_processor::{BatchProcessor, BatchProcessorError},
        filtering::{LogDataFilter, ReceiptFilter},
    },
    http_client::{create_base_http_client, create_retryable_http_client},
    models::{BlockBatch, LogEntry},
    providers::{
        portal::PortalBlockSource,
        traits::{BlockSource, DataSourceError},
    },
};

/// Errors of the `dry-run` command.
#[derive(Error, Debug)]
pub enum DryRunError {
    /// The requested range is empty.
    #[error("Invalid block range: from_block {from_block} is after to_block {to_block}")]
    InvalidRange {
        /// First requested block.
        from_block: u64,
        /// Last requested block.
        to_block: u64,
    },
    /// No log types are configured.
    #[error("No log types configured")]
    NoLogTypes,
    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
    /// The block source failed.
    #[error("Provider error: {0}")]
    Provider(#[from] DataSourceError),
    /// The source returned blocks out of order.
    #[error("Batch processor error: {0}")]
    BatchProcessor(#[from] BatchProcessorError),
    /// The report could not be serialized.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Arguments of the `dry-run` command.
#[derive(Parser, Debug)]
pub struct DryRunArgs {
    /// The starting block number.
    #[arg(short, long)]
    pub from_block: u64,
    /// The ending block number, inclusive.
    #[arg(short, long)]
    pub to_block: u64,
}

/// Fetches and processes `from_block..=to_block` from the configured portal
/// and prints the extracted records as JSON. Nothing is written to the
/// database.
pub async fn execute(config: AppConfig, args: DryRunArgs) -> Result<(), DryRunError> {
    let log_types = config.log_type_set();
    if log_types.is_empty() {
        return Err(DryRunError::NoLogTypes);
    }

    let base_client = create_base_http_client(&config.portal)?;
    let client = create_retryable_http_client(&config.http_retry_config, base_client);
    let source = PortalBlockSource::new(&config.portal, config.batch_size, client)?;
    let processor = BatchProcessor::new(LogDataFilter::new(log_types));

    tracing::info!(from = args.from_block, to = args.to_block, "Starting block processing...");
    let entries = collect_entries(&source, &processor, args.from_block, args.to_block).await?;
    tracing::info!(entries = entries.len(), "Block processing finished.");

    let report = serde_json::to_string_pretty(&entries)?;
    println!("{}", report);

    Ok(())
}

/// Runs the filter and mapper over `from_block..=to_block` without
/// committing anything. Stops early when the source has no more blocks.
pub async fn collect_entries<S, F>(
    source: &S,
    processor: &BatchProcessor<F>,
    from_block: u64,
    to_block: u64,
) -> Result<Vec<LogEntry>, DryRunError>
where
    S: BlockSource + ?Sized,
    F: ReceiptFilter,
{
    if from_block > to_block {
        return Err(DryRunError::InvalidRange { from_block, to_block });
    }

    let mut entries = Vec::new();
    let mut current_block = from_block;

    while current_block <= to_block {
        let batch: BlockBatch = source
            .next_batch(current_block)
            .await?
            .into_iter()
            .take_while(|block| block.height <= to_block)
            .collect::<Vec<_>>()
            .into();
        if batch.is_empty() {
            tracing::warn!(block = current_block, "Source has no more blocks, stopping early.");
            break;
        }

        let processed = processor.process(current_block, &batch)?;
        entries.extend(processed.entries);
        match processed.progress_marker.and_then(|height| height.checked_add(1)) {
            Some(next) => current_block = next,
            None => break,
        }
    }

    Ok(entries)
}
