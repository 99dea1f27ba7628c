//! Clustering run configuration.
//!
//! Loaded from YAML; every field is optional:
//!
//! ```yaml
//! chunk_size: 5000
//! threshold: 0.8
//! min_cluster_size: 3
//! reclassify_small: false
//! metric: cosine
//! ingest_mode: per_record
//! parallel: true
//! storage:
//!   temp_root: .temp
//!   backend: redb
//!   compression:
//!     enabled: true
//!     level: 5
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracegroup_chunkstore::StoreOptions;
use tracegroup_similarity::Metric;

use crate::error::{ClusterError, Result};

/// How per-trace failures during ingestion are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestMode {
    /// A bad trace is excluded and reported; the rest of its chunk is kept.
    #[default]
    PerRecord,
    /// A bad trace fails its whole chunk.
    Bulk,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Documents per stored chunk.
    pub chunk_size: usize,

    /// Minimum similarity for a document to join a pivot's cluster.
    pub threshold: f32,

    /// Clusters of at most this many documents go to the "other" bucket
    /// when `reclassify_small` is set.
    pub min_cluster_size: usize,
    pub reclassify_small: bool,

    pub metric: Metric,
    pub ingest_mode: IngestMode,

    /// Vectorize and compute blocks on the rayon pool.
    pub parallel: bool,

    pub storage: StoreOptions,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 5000,
            threshold: 0.8,
            min_cluster_size: 3,
            reclassify_small: false,
            metric: Metric::default(),
            ingest_mode: IngestMode::default(),
            parallel: true,
            storage: StoreOptions::default(),
        }
    }
}

impl ClusterConfig {
    /// Parse a YAML document and validate it.
    pub fn from_yaml(s: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(s).map_err(|e| ClusterError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and validate a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_yaml(&data)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ClusterError::InvalidConfig("chunk_size must be positive".into()));
        }
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(ClusterError::InvalidConfig(format!(
                "threshold must lie in (0, 1], got {}",
                self.threshold
            )));
        }
        if self.storage.compression.level > 9 {
            return Err(ClusterError::InvalidConfig(format!(
                "compression level must be at most 9, got {}",
                self.storage.compression.level
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tracegroup_chunkstore::Backend;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = ClusterConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.chunk_size, 5000);
        assert_eq!(cfg.min_cluster_size, 3);
        assert_eq!(cfg.metric, Metric::Cosine);
    }

    #[test]
    fn yaml_overrides() {
        let cfg = ClusterConfig::from_yaml(
            "chunk_size: 2\nthreshold: 0.5\nmetric: xnor\ningest_mode: bulk\nstorage:\n  backend: memory\n",
        )
        .unwrap();
        assert_eq!(cfg.chunk_size, 2);
        assert_eq!(cfg.threshold, 0.5);
        assert_eq!(cfg.metric, Metric::Xnor);
        assert_eq!(cfg.ingest_mode, IngestMode::Bulk);
        assert_eq!(cfg.storage.backend, Backend::Memory);
        assert!(cfg.parallel);
    }

    #[test]
    fn rejects_out_of_range_values() {
        for yaml in ["threshold: 0.0", "threshold: 1.5", "chunk_size: 0", "threshold: .nan"] {
            assert!(
                matches!(ClusterConfig::from_yaml(yaml), Err(ClusterError::InvalidConfig(_))),
                "{yaml}"
            );
        }
        ClusterConfig::from_yaml("threshold: 1.0").unwrap();
    }

    #[test]
    fn rejects_unknown_metric() {
        assert!(matches!(
            ClusterConfig::from_yaml("metric: euclid"),
            Err(ClusterError::InvalidConfig(_))
        ));
    }
}
