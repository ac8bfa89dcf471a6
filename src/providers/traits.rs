//! This module defines the interface for fetching Fuel blocks.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::models::BlockBatch;

/// Custom error type for data source operations.
#[derive(Error, Debug)]
pub enum DataSourceError {
    /// Error when parsing the portal URL.
    #[error("Failed to parse portal URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// The request could not be sent, or failed after all transport retries.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest_middleware::Error),

    /// The response body could not be read.
    #[error("Failed to read response body: {0}")]
    Body(#[from] reqwest::Error),

    /// The portal answered with a non-success status.
    #[error("Portal returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// A line of the response stream is not a valid block.
    #[error("Failed to decode block on line {line}: {source}")]
    Decode {
        /// One-based line number inside the response.
        line: usize,
        /// The decoding error.
        source: serde_json::Error,
    },

    /// The response decoded but violates the stream contract.
    #[error("Malformed portal response: {0}")]
    Malformed(String),
}

/// A supplier of ordered, gap-free block batches.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Fetches the next batch of blocks, starting at `from_height`.
    ///
    /// The returned blocks are consecutive and the first one, if any, has
    /// height `from_height`. An empty batch means no block at that height is
    /// available yet.
    async fn next_batch(&self, from_height: u64) -> Result<BlockBatch, DataSourceError>;
}
