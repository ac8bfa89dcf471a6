//! Fuel block, receipt and batch structures as delivered by a block source.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::HexBytes;

/// The kind tag of a Fuel receipt.
///
/// Unknown tags are kept verbatim in `Other` so that a newer data source
/// never breaks decoding; they simply never match the log filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReceiptKind {
    /// A contract call.
    Call,
    /// A return from a call.
    Return,
    /// A return carrying data.
    ReturnData,
    /// A VM panic.
    Panic,
    /// A revert.
    Revert,
    /// A log with register values only.
    Log,
    /// A log carrying a data payload.
    LogData,
    /// A transfer to a contract.
    Transfer,
    /// A transfer to an address.
    TransferOut,
    /// The result of a script.
    ScriptResult,
    /// An outgoing message.
    MessageOut,
    /// An asset mint.
    Mint,
    /// An asset burn.
    Burn,
    /// Any tag this crate does not know about.
    Other(String),
}

impl ReceiptKind {
    /// Returns the wire tag of this kind, e.g. `LOG_DATA`.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Call => "CALL",
            Self::Return => "RETURN",
            Self::ReturnData => "RETURN_DATA",
            Self::Panic => "PANIC",
            Self::Revert => "REVERT",
            Self::Log => "LOG",
            Self::LogData => "LOG_DATA",
            Self::Transfer => "TRANSFER",
            Self::TransferOut => "TRANSFER_OUT",
            Self::ScriptResult => "SCRIPT_RESULT",
            Self::MessageOut => "MESSAGE_OUT",
            Self::Mint => "MINT",
            Self::Burn => "BURN",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for ReceiptKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "CALL" => Self::Call,
            "RETURN" => Self::Return,
            "RETURN_DATA" => Self::ReturnData,
            "PANIC" => Self::Panic,
            "REVERT" => Self::Revert,
            "LOG" => Self::Log,
            "LOG_DATA" => Self::LogData,
            "TRANSFER" => Self::Transfer,
            "TRANSFER_OUT" => Self::TransferOut,
            "SCRIPT_RESULT" => Self::ScriptResult,
            "MESSAGE_OUT" => Self::MessageOut,
            "MINT" => Self::Mint,
            "BURN" => Self::Burn,
            _ => Self::Other(tag),
        }
    }
}

impl From<ReceiptKind> for String {
    fn from(kind: ReceiptKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ReceiptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A back-reference from a receipt to the transaction that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRef {
    /// The transaction id.
    pub hash: HexBytes,
    /// Position of the transaction inside its block.
    pub index: u32,
}

/// A single receipt. Every field besides `kind` may be missing, depending on
/// the receipt kind and the fields the source was asked to project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// The receipt kind tag.
    pub kind: ReceiptKind,
    /// The id of the emitting contract.
    pub contract: Option<HexBytes>,
    /// The log discriminator.
    pub rb: Option<u64>,
    /// The log payload.
    pub data: Option<HexBytes>,
    /// The owning transaction, attached by the block source.
    pub transaction: Option<TransactionRef>,
}

/// A block and its receipts, in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// The block height.
    pub height: u64,
    /// The receipts of all transactions in this block.
    pub receipts: Vec<Receipt>,
}

/// An ordered run of consecutive blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockBatch {
    blocks: Vec<Block>,
}

impl BlockBatch {
    /// Wraps a vector of blocks. Ordering is checked by the batch processor,
    /// not here.
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// A batch with no blocks.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The blocks of this batch.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Whether the batch holds no blocks at all.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of blocks in the batch.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Height of the first block.
    pub fn first_height(&self) -> Option<u64> {
        self.blocks.first().map(|b| b.height)
    }

    /// Height of the last block.
    pub fn last_height(&self) -> Option<u64> {
        self.blocks.last().map(|b| b.height)
    }
}

impl From<Vec<Block>> for BlockBatch {
    fn from(blocks: Vec<Block>) -> Self {
        Self::new(blocks)
    }
}

impl IntoIterator for BlockBatch {
    type Item = Block;
    type IntoIter = std::vec::IntoIter<Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.into_iter()
    }
}
