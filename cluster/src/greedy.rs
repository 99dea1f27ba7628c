//! Single-pass greedy threshold clustering over blocked similarity scores.

use std::collections::BTreeMap;

use ndarray::{Array2, s};
use tracing::debug;

use crate::error::{ClusterError, Result};

/// Identifier of a cluster, allocated in scan order starting at 0.
pub type ClusterId = usize;

/// Access to a square similarity matrix split into chunk-by-chunk blocks.
///
/// Block `(i, j)` holds the scores of the documents of chunk `i` (rows)
/// against those of chunk `j` (columns).
pub trait BlockSource {
    /// Documents per chunk, in chunk order.
    fn chunk_sizes(&self) -> &[usize];

    fn block(&self, i: usize, j: usize) -> Result<Array2<f32>>;
}

/// A similarity matrix held entirely in memory.
#[derive(Debug, Clone)]
pub struct InMemoryBlocks {
    scores: Array2<f32>,
    sizes: Vec<usize>,
}

impl InMemoryBlocks {
    /// One chunk covering the whole matrix.
    pub fn new(scores: Array2<f32>) -> Result<Self> {
        let n = scores.nrows();
        Self::with_chunk_size(scores, n.max(1))
    }

    /// Serve `scores` as blocks of `chunk_size` documents.
    pub fn with_chunk_size(scores: Array2<f32>, chunk_size: usize) -> Result<Self> {
        let (rows, cols) = scores.dim();
        if rows != cols {
            return Err(ClusterError::ShapeMismatch {
                what: "score columns",
                expected: rows,
                got: cols,
            });
        }
        if chunk_size == 0 {
            return Err(ClusterError::InvalidConfig("chunk_size must be positive".into()));
        }
        let mut sizes = vec![chunk_size; rows / chunk_size];
        if rows % chunk_size != 0 {
            sizes.push(rows % chunk_size);
        }
        Ok(Self { scores, sizes })
    }
}

impl BlockSource for InMemoryBlocks {
    fn chunk_sizes(&self) -> &[usize] {
        &self.sizes
    }

    fn block(&self, i: usize, j: usize) -> Result<Array2<f32>> {
        let start = |k: usize| self.sizes[..k].iter().sum::<usize>();
        let (r0, c0) = (start(i), start(j));
        Ok(self
            .scores
            .slice(s![r0..r0 + self.sizes[i], c0..c0 + self.sizes[j]])
            .to_owned())
    }
}

/// Grouped-set bookkeeping over absolute document indices.
struct Scan {
    grouped: Vec<bool>,
    n_grouped: usize,
    assigned: usize,
    clusters: BTreeMap<ClusterId, Vec<usize>>,
}

impl Scan {
    fn new(total: usize) -> Self {
        Self {
            grouped: vec![false; total],
            n_grouped: 0,
            assigned: 0,
            clusters: BTreeMap::new(),
        }
    }

    fn claim(&mut self, id: ClusterId, doc: usize) {
        self.grouped[doc] = true;
        self.n_grouped += 1;
        self.assigned += 1;
        self.clusters.entry(id).or_default().push(doc);
    }

    fn check_assigned(&self) -> Result<()> {
        if self.assigned != self.n_grouped {
            return Err(ClusterError::InternalConsistency(format!(
                "{} documents assigned to clusters but {} grouped",
                self.assigned, self.n_grouped
            )));
        }
        Ok(())
    }

    /// Every document before `end` must be grouped by now.
    fn check_leftover(&self, end: usize) -> Result<()> {
        let total = self.grouped.len();
        let leftover = self.grouped[end..].iter().filter(|&&g| !g).count();
        if self.n_grouped + leftover != total {
            return Err(ClusterError::InternalConsistency(format!(
                "grouped {} + leftover {} != total {total} after document {end}",
                self.n_grouped, leftover
            )));
        }
        Ok(())
    }
}

/// Greedy pivot clustering with a fixed similarity threshold.
///
/// Documents are visited in ascending absolute index. Each document not
/// yet grouped becomes a pivot and claims every later ungrouped document
/// scoring at least `threshold` against it. A document claimed by an
/// earlier pivot is never revisited, so the result is a partition.
#[derive(Debug, Clone, Copy)]
pub struct GreedyClusterer {
    threshold: f32,
}

impl GreedyClusterer {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Partition all documents of `source` into clusters.
    ///
    /// Row group `i` reads its diagonal block first, which fixes the pivots
    /// of chunk `i`, then each block to its right. Blocks left of the
    /// diagonal are never read. Member lists are sorted ascending.
    pub fn cluster<B: BlockSource + ?Sized>(&self, source: &B) -> Result<BTreeMap<ClusterId, Vec<usize>>> {
        let sizes = source.chunk_sizes().to_vec();
        let mut offsets = Vec::with_capacity(sizes.len());
        let mut total = 0;
        for &n in &sizes {
            offsets.push(total);
            total += n;
        }

        let mut scan = Scan::new(total);
        let mut next_id: ClusterId = 0;

        for (i, &rows) in sizes.iter().enumerate() {
            let start = offsets[i];
            let end = start + rows;
            if scan.grouped[start..end].iter().all(|&g| g) {
                debug!("chunk {i}: all {rows} documents already grouped");
                scan.check_leftover(end)?;
                continue;
            }

            let diag = source.block(i, i)?;
            check_block(&diag, i, i, rows, rows)?;

            let mut pivots: Vec<(usize, ClusterId)> = Vec::new();
            for r in 0..rows {
                if scan.grouped[start + r] {
                    continue;
                }
                let id = next_id;
                next_id += 1;
                scan.claim(id, start + r);
                for c in r + 1..rows {
                    if !scan.grouped[start + c] && diag[[r, c]] >= self.threshold {
                        scan.claim(id, start + c);
                    }
                }
                scan.check_assigned()?;
                pivots.push((r, id));
            }
            drop(diag);

            for (j, &cols) in sizes.iter().enumerate().skip(i + 1) {
                let col0 = offsets[j];
                if scan.grouped[col0..col0 + cols].iter().all(|&g| g) {
                    continue;
                }
                let block = source.block(i, j)?;
                check_block(&block, i, j, rows, cols)?;
                for &(r, id) in &pivots {
                    for c in 0..cols {
                        if !scan.grouped[col0 + c] && block[[r, c]] >= self.threshold {
                            scan.claim(id, col0 + c);
                        }
                    }
                    scan.check_assigned()?;
                }
            }

            scan.check_leftover(end)?;
            debug!(
                "chunk {i}: {} pivots, {} of {total} documents grouped",
                pivots.len(),
                scan.n_grouped
            );
        }

        let mut clusters = scan.clusters;
        for members in clusters.values_mut() {
            members.sort_unstable();
        }
        Ok(clusters)
    }
}

fn check_block(block: &Array2<f32>, i: usize, j: usize, rows: usize, cols: usize) -> Result<()> {
    if block.nrows() != rows {
        return Err(ClusterError::ShapeMismatch {
            what: "block rows",
            expected: rows,
            got: block.nrows(),
        });
    }
    if block.ncols() != cols {
        return Err(ClusterError::ShapeMismatch {
            what: "block columns",
            expected: cols,
            got: block.ncols(),
        });
    }
    debug!("block ({i}, {j}) {rows}x{cols}");
    Ok(())
}
