//! This module contains the data models for the indexer.

pub mod block;
pub mod hex_bytes;
pub mod log_entry;
pub mod log_type_set;

pub use block::{Block, BlockBatch, Receipt, ReceiptKind, TransactionRef};
pub use hex_bytes::HexBytes;
pub use log_entry::LogEntry;
pub use log_type_set::{DEFAULT_LOG_TYPES, LogTypeSet};
