//! Out-of-core clustering runs.
//!
//! A [`ChunkedClustering`] session streams batches of traces into a
//! [`ChunkStore`], computes every chunk-pair similarity block, then runs
//! the [`GreedyClusterer`] over the stored blocks. Peak memory is bounded
//! by the chunk size, not the corpus size.

use std::collections::BTreeMap;
use std::time::Instant;

use ndarray::Array2;
use rayon::prelude::*;
use tracegroup_chunkstore::{ChunkHandle, ChunkStore};
use tracegroup_vocab::VocabularySnapshot;
use tracing::{debug, error, info};

use crate::assignment::ClusterAssignment;
use crate::config::ClusterConfig;
use crate::error::{ClusterError, Result};
use crate::greedy::{BlockSource, ClusterId, GreedyClusterer, InMemoryBlocks};
use crate::ingest::Vectorizer;

/// Outcome of adding one batch to a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkReport {
    /// Indices of the chunks written for this batch.
    pub chunks: Vec<usize>,
    pub accepted: usize,
    /// Identifiers left out in per-record mode.
    pub excluded: Vec<String>,
}

/// Result of a complete clustering run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub assignment: ClusterAssignment,
    /// External identifier of every document, by absolute index.
    pub ids: Vec<String>,
    pub excluded: Vec<String>,
}

/// A chunked clustering run over one temporary store.
#[derive(Debug)]
pub struct ChunkedClustering {
    config: ClusterConfig,
    snapshot: VocabularySnapshot,
    store: ChunkStore,
    handles: Vec<ChunkHandle>,
    ids: Vec<String>,
    blocks_ready: bool,
}

impl ChunkedClustering {
    /// Validate `config` and open a fresh store under its temporary root.
    pub fn open(config: &ClusterConfig, snapshot: VocabularySnapshot) -> Result<Self> {
        config.validate()?;
        let store = ChunkStore::open(&config.storage)?;
        info!(
            "chunked clustering: {} frames, threshold {}, chunk size {}",
            snapshot.dim(),
            config.threshold,
            config.chunk_size
        );
        Ok(Self {
            config: config.clone(),
            snapshot,
            store,
            handles: Vec::new(),
            ids: Vec::new(),
            blocks_ready: false,
        })
    }

    /// Documents ingested so far.
    pub fn documents(&self) -> usize {
        self.ids.len()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn chunk_count(&self) -> usize {
        self.handles.len()
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    /// Vectorize a batch and persist it in chunks of at most `chunk_size`
    /// documents. Chunk indices continue across batches.
    pub fn add<S>(&mut self, ids: &[String], traces: &[Vec<S>]) -> Result<ChunkReport>
    where
        S: AsRef<str> + Sync,
    {
        if ids.len() != traces.len() {
            return Err(ClusterError::ShapeMismatch {
                what: "traces",
                expected: ids.len(),
                got: traces.len(),
            });
        }
        if ids.is_empty() {
            return Err(ClusterError::EmptyBatch);
        }
        let vectorizer = Vectorizer {
            snapshot: &self.snapshot,
            mode: self.config.ingest_mode,
            metric: self.config.metric,
            parallel: self.config.parallel,
        };

        let mut report = ChunkReport::default();
        for (id_piece, trace_piece) in ids
            .chunks(self.config.chunk_size)
            .zip(traces.chunks(self.config.chunk_size))
        {
            let batch = vectorizer.vectorize(id_piece, trace_piece)?;
            report.excluded.extend(batch.excluded);
            if batch.ids.is_empty() {
                continue;
            }

            let index = self.handles.len();
            let start = Instant::now();
            let handle = self.store.write_chunk(index, &batch.ids, batch.matrix.view())?;
            debug!("wrote chunk {index} in {:?}", start.elapsed());

            report.accepted += batch.ids.len();
            report.chunks.push(index);
            self.handles.push(handle);
            self.ids.extend(batch.ids);
        }
        self.blocks_ready = false;
        Ok(report)
    }

    /// Compute and store the similarity block of every chunk pair.
    pub fn compute_blocks(&mut self) -> Result<()> {
        let n = self.handles.len();
        let stored = self.store.chunk_count()?;
        if stored != n {
            return Err(ClusterError::InternalConsistency(format!(
                "{stored} chunks stored, {n} tracked"
            )));
        }

        let start = Instant::now();
        for (i, hi) in self.handles.iter().enumerate() {
            let row_start = Instant::now();
            let (_, left) = self.store.read_chunk(hi)?;
            let compute = |j: usize, hj: &ChunkHandle| -> Result<()> {
                let (_, right) = self.store.read_chunk(hj)?;
                let block = self.config.metric.block(left.view(), right.t())?;
                self.store.write_block(i, j, block.view())?;
                Ok(())
            };
            if self.config.parallel {
                self.handles
                    .par_iter()
                    .enumerate()
                    .try_for_each(|(j, hj)| compute(j, hj))?;
            } else {
                for (j, hj) in self.handles.iter().enumerate() {
                    compute(j, hj)?;
                }
            }
            info!(
                "calculated similarity of row group gmat_{i}/{} in {:?}",
                n.saturating_sub(1),
                row_start.elapsed()
            );
        }
        info!("computed {} similarity blocks in {:?}", n * n, start.elapsed());
        self.blocks_ready = true;
        Ok(())
    }

    /// Compute all blocks and cluster them.
    pub fn execute(&mut self) -> Result<ClusterAssignment> {
        if self.ids.is_empty() {
            return Err(ClusterError::EmptyBatch);
        }
        self.compute_blocks()?;

        let start = Instant::now();
        let blocks = StoredBlocks {
            store: &self.store,
            sizes: self.handles.iter().map(ChunkHandle::rows).collect(),
        };
        let clusters = GreedyClusterer::new(self.config.threshold).cluster(&blocks)?;
        let assignment = finish(&self.config, clusters, self.ids.len())?;
        info!(
            "clustered {} documents into {} clusters in {:?}",
            self.ids.len(),
            assignment.len(),
            start.elapsed()
        );
        Ok(assignment)
    }

    /// Stored similarity block of chunk pair `(i, j)`, for diagnostics.
    /// Available after [`execute`](Self::execute).
    pub fn similarity_block(&self, i: usize, j: usize) -> Result<Array2<f32>> {
        if !self.blocks_ready {
            return Err(ClusterError::InternalConsistency(
                "similarity blocks have not been computed".into(),
            ));
        }
        Ok(self.store.read_block(i, j)?)
    }

    /// Close the store and remove its files.
    pub fn wipe_out(&mut self) -> Result<()> {
        self.store.delete()?;
        self.blocks_ready = false;
        info!("wiped out temporary data");
        Ok(())
    }
}

struct StoredBlocks<'a> {
    store: &'a ChunkStore,
    sizes: Vec<usize>,
}

impl BlockSource for StoredBlocks<'_> {
    fn chunk_sizes(&self) -> &[usize] {
        &self.sizes
    }

    fn block(&self, i: usize, j: usize) -> Result<Array2<f32>> {
        Ok(self.store.read_block(i, j)?)
    }
}

fn finish(
    config: &ClusterConfig,
    clusters: BTreeMap<ClusterId, Vec<usize>>,
    total: usize,
) -> Result<ClusterAssignment> {
    let assignment = ClusterAssignment::new(clusters, total)?;
    if config.reclassify_small {
        Ok(assignment.reclassify(config.min_cluster_size))
    } else {
        Ok(assignment)
    }
}

/// Run a full chunked clustering over `batches` of `(ids, traces)`.
///
/// The temporary store is wiped whether or not the run succeeds.
pub fn run<I, S>(config: &ClusterConfig, snapshot: VocabularySnapshot, batches: I) -> Result<RunOutcome>
where
    I: IntoIterator<Item = (Vec<String>, Vec<Vec<S>>)>,
    S: AsRef<str> + Sync,
{
    let mut session = ChunkedClustering::open(config, snapshot)?;
    let result = feed_and_execute(&mut session, batches);
    let wiped = session.wipe_out();

    let (assignment, excluded) = match (result, wiped) {
        (Ok(out), Ok(())) => out,
        (Err(e), wiped) => {
            if let Err(w) = wiped {
                error!("cleanup after failed run: {w}");
            }
            return Err(e);
        }
        (Ok(_), Err(w)) => return Err(w),
    };
    Ok(RunOutcome {
        assignment,
        ids: std::mem::take(&mut session.ids),
        excluded,
    })
}

fn feed_and_execute<I, S>(session: &mut ChunkedClustering, batches: I) -> Result<(ClusterAssignment, Vec<String>)>
where
    I: IntoIterator<Item = (Vec<String>, Vec<Vec<S>>)>,
    S: AsRef<str> + Sync,
{
    let mut excluded = Vec::new();
    for (k, (ids, traces)) in batches.into_iter().enumerate() {
        let report = session.add(&ids, &traces)?;
        debug!(
            "batch {k}: {} accepted into chunks {:?}, {} excluded",
            report.accepted,
            report.chunks,
            report.excluded.len()
        );
        excluded.extend(report.excluded);
    }
    let assignment = session.execute()?;
    Ok((assignment, excluded))
}

/// Cluster a corpus small enough to hold its whole similarity matrix in
/// memory. Same semantics as [`run`], without the store.
pub fn cluster_in_memory<S>(
    config: &ClusterConfig,
    snapshot: &VocabularySnapshot,
    ids: &[String],
    traces: &[Vec<S>],
) -> Result<RunOutcome>
where
    S: AsRef<str> + Sync,
{
    config.validate()?;
    let batch = Vectorizer {
        snapshot,
        mode: config.ingest_mode,
        metric: config.metric,
        parallel: config.parallel,
    }
    .vectorize(ids, traces)?;
    if batch.ids.is_empty() {
        return Err(ClusterError::EmptyBatch);
    }

    let start = Instant::now();
    let scores = config.metric.pairwise(batch.matrix.view(), batch.matrix.view())?;
    let clusters = GreedyClusterer::new(config.threshold).cluster(&InMemoryBlocks::new(scores)?)?;
    let assignment = finish(config, clusters, batch.ids.len())?;
    info!(
        "clustered {} documents in memory into {} clusters in {:?}",
        batch.ids.len(),
        assignment.len(),
        start.elapsed()
    );
    Ok(RunOutcome {
        assignment,
        ids: batch.ids,
        excluded: batch.excluded,
    })
}
