//! A `BlockSource` backed by a Fuel data portal.
//!
//! The portal exposes a dataset stream endpoint. A POST with a block range
//! and a field selection answers with newline-delimited JSON, one block per
//! line. Receipts reference their transaction by index only, so the
//! transaction hash is attached here, before the batch leaves the source.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value, json};
use url::Url;

use super::traits::{BlockSource, DataSourceError};
use crate::{
    config::{FieldSelection, PortalConfig},
    models::{Block, BlockBatch, HexBytes, Receipt, ReceiptKind, TransactionRef},
};

/// Receipt fields the pipeline cannot work without.
const REQUIRED_RECEIPT_FIELDS: [&str; 6] =
    ["transactionIndex", "index", "receiptType", "contract", "rb", "data"];

#[derive(Debug, Deserialize)]
struct PortalHeader {
    height: u64,
}

#[derive(Debug, Deserialize)]
struct PortalTransaction {
    index: u32,
    #[serde(alias = "hash")]
    id: HexBytes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PortalReceipt {
    transaction_index: Option<u32>,
    receipt_type: ReceiptKind,
    #[serde(default)]
    contract: Option<HexBytes>,
    #[serde(default, deserialize_with = "deserialize_optional_u64")]
    rb: Option<u64>,
    #[serde(default)]
    data: Option<HexBytes>,
}

#[derive(Debug, Deserialize)]
struct PortalBlock {
    header: PortalHeader,
    #[serde(default)]
    transactions: Vec<PortalTransaction>,
    #[serde(default)]
    receipts: Vec<PortalReceipt>,
}

/// `rb` spans the full `u64` range, so portals may send it as a string.
fn deserialize_optional_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }

    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::String(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

impl From<PortalBlock> for Block {
    fn from(block: PortalBlock) -> Self {
        let transactions: HashMap<u32, HexBytes> =
            block.transactions.into_iter().map(|tx| (tx.index, tx.id)).collect();

        let receipts = block
            .receipts
            .into_iter()
            .map(|receipt| {
                let transaction = receipt.transaction_index.and_then(|index| {
                    transactions
                        .get(&index)
                        .map(|hash| TransactionRef { hash: hash.clone(), index })
                });
                Receipt {
                    kind: receipt.receipt_type,
                    contract: receipt.contract,
                    rb: receipt.rb,
                    data: receipt.data,
                    transaction,
                }
            })
            .collect();

        Block { height: block.header.height, receipts }
    }
}

/// Streams blocks from a Fuel data portal.
pub struct PortalBlockSource {
    client: ClientWithMiddleware,
    url: Url,
    batch_size: u64,
    fields: FieldSelection,
}

impl PortalBlockSource {
    /// Creates a new `PortalBlockSource`. Each batch spans at most
    /// `batch_size` blocks.
    pub fn new(
        config: &PortalConfig,
        batch_size: u64,
        client: ClientWithMiddleware,
    ) -> Result<Self, DataSourceError> {
        let url = Url::parse(&config.url)?;
        Ok(Self { client, url, batch_size: batch_size.max(1), fields: config.fields.clone() })
    }

    /// Builds the stream query for `from_block..=to_block`.
    fn query(&self, from_block: u64, to_block: u64) -> Value {
        let mut receipt_fields = Map::new();
        for field in REQUIRED_RECEIPT_FIELDS
            .iter()
            .copied()
            .chain(self.fields.extra_receipt_fields.iter().map(String::as_str))
        {
            receipt_fields.insert(field.to_string(), Value::Bool(true));
        }

        let receipt_request = if self.fields.prefilter_receipts {
            json!({ "type": [ReceiptKind::LogData.as_str()], "transaction": true })
        } else {
            json!({ "transaction": true })
        };

        json!({
            "type": "fuel",
            "fromBlock": from_block,
            "toBlock": to_block,
            "includeAllBlocks": true,
            "fields": {
                "block": { "height": true },
                "transaction": { "id": true, "index": true },
                "receipt": receipt_fields,
            },
            "receipts": [receipt_request],
        })
    }

    /// Decodes a newline-delimited JSON body into blocks, keeping only
    /// heights inside the requested range.
    fn decode(body: &str, to_block: u64) -> Result<Vec<Block>, DataSourceError> {
        let mut blocks = Vec::new();
        for (index, line) in body.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let block: PortalBlock = serde_json::from_str(line)
                .map_err(|source| DataSourceError::Decode { line: index + 1, source })?;
            if block.header.height > to_block {
                break;
            }
            blocks.push(Block::from(block));
        }
        Ok(blocks)
    }
}

#[async_trait]
impl BlockSource for PortalBlockSource {
    #[tracing::instrument(skip(self), level = "debug")]
    async fn next_batch(&self, from_height: u64) -> Result<BlockBatch, DataSourceError> {
        let to_block = from_height.saturating_add(self.batch_size - 1);
        tracing::debug!(from_block = from_height, to_block, "Requesting block range from portal.");

        let response =
            self.client.post(self.url.clone()).json(&self.query(from_height, to_block)).send().await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            tracing::debug!(from_block = from_height, "Portal has no blocks past the requested height yet.");
            return Ok(BlockBatch::empty());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %body, "Portal request failed.");
            return Err(DataSourceError::Status { status: status.as_u16(), body });
        }

        let body = response.text().await?;
        let blocks = Self::decode(&body, to_block)?;

        if let Some(first) = blocks.first() {
            if first.height != from_height {
                return Err(DataSourceError::Malformed(format!(
                    "expected stream to start at block {from_height}, got {}",
                    first.height
                )));
            }
        }

        tracing::debug!(
            from_block = from_height,
            block_count = blocks.len(),
            "Received blocks from portal."
        );
        Ok(BlockBatch::new(blocks))
    }
}
