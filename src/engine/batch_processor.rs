//! This module defines the `BatchProcessor` component.
//!
//! The `BatchProcessor` is the pure accumulation stage of the pipeline: it
//! walks a `BlockBatch`, applies the receipt filter and the record mapper, and
//! computes the progress marker the resulting records will be committed with.

use thiserror::Error;

use super::{
    filtering::ReceiptFilter,
    record_mapper::{MalformedReceipt, RecordMapper},
};
use crate::models::{BlockBatch, LogEntry};

/// Custom error type for `BatchProcessor` operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchProcessorError {
    /// The first block of the batch does not follow the progress marker.
    #[error("Batch starts at block {actual}, expected block {expected}")]
    Discontinuous {
        /// The height the batch should have started at.
        expected: u64,
        /// The height it actually started at.
        actual: u64,
    },

    /// Two consecutive blocks in the batch are not adjacent heights.
    #[error("Block {next} does not directly follow block {previous}")]
    OutOfOrder {
        /// Height of the earlier block.
        previous: u64,
        /// Height of the block that broke the sequence.
        next: u64,
    },
}

/// The outcome of processing one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedBatch {
    /// Records in block order, then receipt order.
    pub entries: Vec<LogEntry>,
    /// Height of the last block in the batch; `None` for an empty batch.
    pub progress_marker: Option<u64>,
    /// Receipts that passed the filter but could not be mapped.
    pub skipped: usize,
}

/// Applies a [`ReceiptFilter`] and the [`RecordMapper`] to whole batches.
pub struct BatchProcessor<F: ReceiptFilter> {
    filter: F,
    mapper: RecordMapper,
}

impl<F: ReceiptFilter> BatchProcessor<F> {
    /// Creates a new `BatchProcessor` around the given filter.
    pub fn new(filter: F) -> Self {
        Self { filter, mapper: RecordMapper::new() }
    }

    /// Processes a batch that is expected to begin at `from_height`.
    ///
    /// Heights must be contiguous and strictly increasing; the processor does
    /// not re-sort and rejects the whole batch on the first violation.
    pub fn process(
        &self,
        from_height: u64,
        batch: &BlockBatch,
    ) -> Result<ProcessedBatch, BatchProcessorError> {
        let Some(first) = batch.first_height() else {
            return Ok(ProcessedBatch::default());
        };
        if first != from_height {
            return Err(BatchProcessorError::Discontinuous { expected: from_height, actual: first });
        }

        tracing::debug!(
            block_count = batch.len(),
            first_block = first,
            last_block = batch.last_height(),
            "Processing batch of blocks."
        );

        let mut processed = ProcessedBatch::default();
        let mut previous: Option<u64> = None;

        for block in batch.blocks() {
            if let Some(previous) = previous {
                if previous.checked_add(1) != Some(block.height) {
                    tracing::error!(previous, next = block.height, "Block source broke height order.");
                    return Err(BatchProcessorError::OutOfOrder { previous, next: block.height });
                }
            }
            previous = Some(block.height);

            for receipt in block.receipts.iter().filter(|r| self.filter.matches(r)) {
                match self.mapper.map(block, receipt) {
                    Ok(entry) => processed.entries.push(entry),
                    Err(e) => {
                        log_malformed(&e);
                        processed.skipped += 1;
                    }
                }
            }
        }

        processed.progress_marker = previous;

        tracing::debug!(
            entries = processed.entries.len(),
            skipped = processed.skipped,
            progress_marker = ?processed.progress_marker,
            "Batch processing completed."
        );

        Ok(processed)
    }
}

fn log_malformed(error: &MalformedReceipt) {
    tracing::warn!(height = error.height, kind = %error.kind, field = error.field, "Skipping malformed receipt.");
}
