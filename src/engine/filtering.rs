//! This module defines the receipt filter applied to every block.

#[cfg(test)]
use mockall::automock;

use crate::models::{LogTypeSet, Receipt, ReceiptKind};

/// Decides whether a receipt is relevant to the pipeline.
///
/// Implementations must be pure: the answer depends only on the receipt and
/// on state fixed at construction time.
#[cfg_attr(test, automock)]
pub trait ReceiptFilter: Send + Sync {
    /// Returns `true` if the receipt should be turned into a record.
    fn matches(&self, receipt: &Receipt) -> bool;
}

/// Why a receipt was rejected. Only used for trace logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The receipt is not a `LOG_DATA` receipt.
    NotLogData,
    /// No emitting contract.
    MissingContract,
    /// No discriminator.
    MissingRb,
    /// No payload.
    MissingData,
    /// No owning transaction.
    MissingTransaction,
    /// The discriminator is not in the configured set.
    UnknownLogType,
}

/// Accepts `LOG_DATA` receipts that carry every field a `LogEntry` needs and
/// whose discriminator is in the configured [`LogTypeSet`].
#[derive(Debug, Clone)]
pub struct LogDataFilter {
    log_types: LogTypeSet,
}

impl LogDataFilter {
    /// Creates a filter over the given discriminators.
    pub fn new(log_types: LogTypeSet) -> Self {
        Self { log_types }
    }

    /// Checks a receipt, returning the first failed condition.
    pub fn check(&self, receipt: &Receipt) -> Result<(), Rejection> {
        if receipt.kind != ReceiptKind::LogData {
            return Err(Rejection::NotLogData);
        }
        if receipt.contract.is_none() {
            return Err(Rejection::MissingContract);
        }
        let Some(rb) = receipt.rb else {
            return Err(Rejection::MissingRb);
        };
        if receipt.data.is_none() {
            return Err(Rejection::MissingData);
        }
        if receipt.transaction.is_none() {
            return Err(Rejection::MissingTransaction);
        }
        if !self.log_types.contains(rb) {
            return Err(Rejection::UnknownLogType);
        }
        Ok(())
    }
}

impl ReceiptFilter for LogDataFilter {
    fn matches(&self, receipt: &Receipt) -> bool {
        match self.check(receipt) {
            Ok(()) => true,
            Err(reason) => {
                tracing::trace!(kind = %receipt.kind, rb = ?receipt.rb, ?reason, "Receipt skipped.");
                false
            }
        }
    }
}
