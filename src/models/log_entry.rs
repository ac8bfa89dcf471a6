//! The persisted output record.

use serde::{Deserialize, Serialize};

use super::HexBytes;

/// A `LOG_DATA` receipt extracted from the chain, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Random, content-independent identifier.
    pub id: String,
    /// Id of the transaction that emitted the log.
    pub tx_hash: HexBytes,
    /// Height of the block the log was found in.
    pub found_at: u64,
    /// Id of the emitting contract.
    pub contract: HexBytes,
    /// The log discriminator.
    pub rb: u64,
    /// The log payload.
    pub data: HexBytes,
}

impl LogEntry {
    /// Whether two entries carry the same chain data, ignoring identifiers.
    pub fn same_content(&self, other: &Self) -> bool {
        self.tx_hash == other.tx_hash
            && self.found_at == other.found_at
            && self.contract == other.contract
            && self.rb == other.rb
            && self.data == other.data
    }
}
