use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Storage backend of a [`ChunkStore`](crate::ChunkStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// One redb file inside the run directory.
    #[default]
    Redb,
    /// Process memory. The run directory is still created and removed.
    Memory,
}

/// Gzip settings for stored arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    pub enabled: bool,

    /// Gzip level, 0 to 9.
    pub level: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: 5,
        }
    }
}

/// Options for opening a chunk store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Directory under which each run creates its own subdirectory.
    pub temp_root: PathBuf,
    pub backend: Backend,
    pub compression: CompressionConfig,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            temp_root: PathBuf::from(".temp"),
            backend: Backend::default(),
            compression: CompressionConfig::default(),
        }
    }
}
