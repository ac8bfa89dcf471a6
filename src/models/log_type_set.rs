//! The fixed set of log discriminators the pipeline extracts.

use std::{collections::HashSet, sync::Arc};

/// Discriminators extracted when no other set is configured.
pub const DEFAULT_LOG_TYPES: [u64; 2] = [6732614218709939873, 12195664052085097644];

/// An immutable set of `rb` values of interest.
///
/// Cloning is cheap; all clones share the same set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTypeSet(Arc<HashSet<u64>>);

impl LogTypeSet {
    /// Builds a set from the given discriminators.
    pub fn new(types: impl IntoIterator<Item = u64>) -> Self {
        Self(Arc::new(types.into_iter().collect()))
    }

    /// Whether `rb` is one of the configured discriminators.
    pub fn contains(&self, rb: u64) -> bool {
        self.0.contains(&rb)
    }

    /// Number of discriminators in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty. An empty set can never match anything.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The discriminators, in ascending order.
    pub fn to_sorted_vec(&self) -> Vec<u64> {
        let mut types: Vec<u64> = self.0.iter().copied().collect();
        types.sort_unstable();
        types
    }
}

impl Default for LogTypeSet {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_TYPES)
    }
}
