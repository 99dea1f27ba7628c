use serde::{Deserialize, Serialize};

/// Controls how [`Vocabulary::add`](crate::Vocabulary::add) feeds records
/// into the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabConfig {
    /// Number of records per bulk registration.
    pub chunk_size: usize,

    /// Batches with at least this many records use bulk registration.
    pub max_iter_data: usize,

    /// Always use bulk registration, whatever the batch size.
    pub force_speedup: bool,
}

impl Default for VocabConfig {
    fn default() -> Self {
        Self {
            chunk_size: 5000,
            max_iter_data: 10000,
            force_speedup: false,
        }
    }
}

impl VocabConfig {
    /// Returns true if a batch of `n` records should take the bulk path.
    pub fn use_bulk(&self, n: usize) -> bool {
        self.force_speedup || n >= self.max_iter_data
    }
}
