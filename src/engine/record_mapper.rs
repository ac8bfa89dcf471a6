//! Turns accepted receipts into [`LogEntry`] records.

use rand::Rng;
use thiserror::Error;

use crate::models::{Block, LogEntry, Receipt, ReceiptKind};

/// Number of random bytes in a generated record identifier.
pub const ID_BYTES: usize = 16;

/// A receipt reached the mapper without a field the record requires.
///
/// The filter rejects such receipts, so this only fires when the two
/// disagree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Malformed {kind} receipt in block {height}: missing {field}")]
pub struct MalformedReceipt {
    /// Height of the block holding the receipt.
    pub height: u64,
    /// Kind of the offending receipt.
    pub kind: ReceiptKind,
    /// Name of the missing field.
    pub field: &'static str,
}

/// Generates a fresh record identifier from the thread-local CSPRNG.
pub fn generate_id() -> String {
    let mut bytes = [0u8; ID_BYTES];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// Maps receipts to records. Stateless apart from identifier generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordMapper;

impl RecordMapper {
    /// Creates a new mapper.
    pub fn new() -> Self {
        Self
    }

    /// Builds a record for a receipt that passed the filter.
    ///
    /// Debug builds assert the receipt kind. A missing field is reported as a
    /// [`MalformedReceipt`] in every build.
    pub fn map(&self, block: &Block, receipt: &Receipt) -> Result<LogEntry, MalformedReceipt> {
        let missing = |field| MalformedReceipt {
            height: block.height,
            kind: receipt.kind.clone(),
            field,
        };

        debug_assert_eq!(receipt.kind, ReceiptKind::LogData, "mapper called on a non LOG_DATA receipt");
        if receipt.kind != ReceiptKind::LogData {
            return Err(missing("LOG_DATA kind"));
        }

        let contract = receipt.contract.clone().ok_or_else(|| missing("contract"))?;
        let rb = receipt.rb.ok_or_else(|| missing("rb"))?;
        let data = receipt.data.clone().ok_or_else(|| missing("data"))?;
        let transaction = receipt.transaction.as_ref().ok_or_else(|| missing("transaction"))?;

        Ok(LogEntry {
            id: generate_id(),
            tx_hash: transaction.hash.clone(),
            found_at: block.height,
            contract,
            rb,
            data,
        })
    }
}
