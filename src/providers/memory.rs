//! A `BlockSource` serving blocks from memory.

use async_trait::async_trait;

use super::traits::{BlockSource, DataSourceError};
use crate::models::{Block, BlockBatch};

/// Replays a fixed, height-ordered list of blocks in slices of at most
/// `batch_size` blocks. A slice ends at the first missing height, so a gap in
/// the stored blocks reads as "not available yet".
#[derive(Debug, Clone)]
pub struct InMemoryBlockSource {
    blocks: Vec<Block>,
    batch_size: usize,
}

impl InMemoryBlockSource {
    /// Creates a source over `blocks`. The blocks are sorted by height.
    pub fn new(mut blocks: Vec<Block>, batch_size: usize) -> Self {
        blocks.sort_by_key(|block| block.height);
        Self { blocks, batch_size: batch_size.max(1) }
    }

    /// Height of the last block this source can serve.
    pub fn last_height(&self) -> Option<u64> {
        self.blocks.last().map(|block| block.height)
    }
}

#[async_trait]
impl BlockSource for InMemoryBlockSource {
    async fn next_batch(&self, from_height: u64) -> Result<BlockBatch, DataSourceError> {
        let start = self.blocks.partition_point(|block| block.height < from_height);
        let blocks = self.blocks[start..]
            .iter()
            .take(self.batch_size)
            .zip(from_height..)
            .take_while(|(block, expected)| block.height == *expected)
            .map(|(block, _)| block.clone())
            .collect();
        Ok(BlockBatch::new(blocks))
    }
}
