//! A set of helpers for testing

use crate::models::{Block, BlockBatch, HexBytes, Receipt, ReceiptKind, TransactionRef};

/// A builder for creating `Receipt` instances for testing.
#[derive(Debug, Clone)]
pub struct ReceiptBuilder {
    kind: ReceiptKind,
    contract: Option<HexBytes>,
    rb: Option<u64>,
    data: Option<HexBytes>,
    transaction: Option<TransactionRef>,
}

impl ReceiptBuilder {
    /// Starts a complete `LOG_DATA` receipt with the given discriminator and
    /// placeholder contract, payload and transaction.
    pub fn log_data(rb: u64) -> Self {
        Self {
            kind: ReceiptKind::LogData,
            contract: Some(HexBytes::from([0x11; 32])),
            rb: Some(rb),
            data: Some(HexBytes::from([0xde, 0xad, 0xbe, 0xef])),
            transaction: Some(TransactionRef { hash: HexBytes::from([0x22; 32]), index: 0 }),
        }
    }

    /// Starts a `CALL` receipt with no log fields.
    pub fn call() -> Self {
        Self {
            kind: ReceiptKind::Call,
            contract: Some(HexBytes::from([0x11; 32])),
            rb: None,
            data: None,
            transaction: Some(TransactionRef { hash: HexBytes::from([0x22; 32]), index: 0 }),
        }
    }

    /// Sets the receipt kind.
    pub fn kind(mut self, kind: ReceiptKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the emitting contract.
    pub fn contract(mut self, contract: impl Into<HexBytes>) -> Self {
        self.contract = Some(contract.into());
        self
    }

    /// Sets the payload.
    pub fn data(mut self, data: impl Into<HexBytes>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Sets the owning transaction's hash.
    pub fn transaction_hash(mut self, hash: impl Into<HexBytes>) -> Self {
        let index = self.transaction.as_ref().map_or(0, |tx| tx.index);
        self.transaction = Some(TransactionRef { hash: hash.into(), index });
        self
    }

    /// Removes the emitting contract.
    pub fn no_contract(mut self) -> Self {
        self.contract = None;
        self
    }

    /// Removes the discriminator.
    pub fn no_rb(mut self) -> Self {
        self.rb = None;
        self
    }

    /// Removes the payload.
    pub fn no_data(mut self) -> Self {
        self.data = None;
        self
    }

    /// Removes the transaction back-reference.
    pub fn no_transaction(mut self) -> Self {
        self.transaction = None;
        self
    }

    /// Builds the `Receipt`.
    pub fn build(self) -> Receipt {
        Receipt {
            kind: self.kind,
            contract: self.contract,
            rb: self.rb,
            data: self.data,
            transaction: self.transaction,
        }
    }
}

/// A builder for creating `Block` instances for testing.
#[derive(Debug, Clone)]
pub struct BlockBuilder {
    height: u64,
    receipts: Vec<Receipt>,
}

impl BlockBuilder {
    /// Creates a new `BlockBuilder` for a block at `height`.
    pub fn new(height: u64) -> Self {
        Self { height, receipts: Vec::new() }
    }

    /// Appends a receipt.
    pub fn receipt(mut self, receipt: Receipt) -> Self {
        self.receipts.push(receipt);
        self
    }

    /// Builds the `Block`.
    pub fn build(self) -> Block {
        Block { height: self.height, receipts: self.receipts }
    }
}

/// Creates a batch of empty blocks covering `from..=to`.
pub fn empty_blocks(from: u64, to: u64) -> BlockBatch {
    BlockBatch::new((from..=to).map(|height| BlockBuilder::new(height).build()).collect())
}
