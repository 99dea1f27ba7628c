//! Greedy threshold clustering of stack traces.
//!
//! Traces are vectorized against a frozen
//! [`VocabularySnapshot`](tracegroup_vocab::VocabularySnapshot), written in
//! chunks to a temporary [`ChunkStore`](tracegroup_chunkstore::ChunkStore),
//! compared block by block, and partitioned by a single forward scan:
//! every document not yet grouped becomes a pivot and claims all later
//! ungrouped documents scoring at least the threshold against it.
//!
//! ```
//! use tracegroup_cluster::{ClusterConfig, cluster_in_memory};
//! use tracegroup_vocab::Vocabulary;
//!
//! let mut vocab = Vocabulary::new();
//! vocab.register("seed", &["A", "B", "C"], None).unwrap();
//!
//! let ids: Vec<String> = ["t0", "t1", "t2"].map(String::from).to_vec();
//! let traces = vec![vec!["A", "B"], vec!["A", "B"], vec!["C"]];
//! let out = cluster_in_memory(&ClusterConfig::default(), &vocab.snapshot(), &ids, &traces).unwrap();
//!
//! assert_eq!(out.assignment.clusters()[&0], vec![0, 1]);
//! assert_eq!(out.assignment.clusters()[&1], vec![2]);
//! ```

mod ingest;

pub mod assignment;
pub mod chunked;
pub mod config;
pub mod error;
pub mod greedy;
pub mod report;

pub use assignment::{ClusterAssignment, ClusterKey};
pub use chunked::{ChunkReport, ChunkedClustering, RunOutcome, cluster_in_memory, run};
pub use config::{ClusterConfig, IngestMode};
pub use error::{ClusterError, Result};
pub use greedy::{BlockSource, ClusterId, GreedyClusterer, InMemoryBlocks};
pub use report::{ClusterSummary, merge_common, representation, summarize};
