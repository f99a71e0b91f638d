/// Which pressure metric governs eviction of sealed chunks from the head of
/// a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardStrategy {
    /// Evict sealed chunks until `active_rows <= discard_threshold + chunk_size`.
    BaseElementCount,
    /// Evict sealed chunks until `active_bytes <= discard_threshold + last_sealed_chunk_bytes`.
    BaseMemorySize,
}

/// Per-table configuration fixed at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableConfig {
    pub chunk_size: usize,
    pub discard_threshold: usize,
    pub discard_strategy: DiscardStrategy,
}

impl TableConfig {
    pub fn new(chunk_size: usize, discard_threshold: usize, discard_strategy: DiscardStrategy) -> Self {
        Self {
            chunk_size,
            discard_threshold,
            discard_strategy,
        }
    }
}

impl Default for TableConfig {
    /// A generous default so ad-hoc `create(name, schema)` calls don't need
    /// to think about eviction at all.
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            discard_threshold: usize::MAX / 2,
            discard_strategy: DiscardStrategy::BaseElementCount,
        }
    }
}
