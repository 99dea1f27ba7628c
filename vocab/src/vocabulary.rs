use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::time::Instant;

use tracing::{info, warn};

use crate::config::VocabConfig;
use crate::error::VocabError;
use crate::hash::{FrameHash, TraceHash};
use crate::node::{Attrs, Node};
use crate::snapshot::VocabularySnapshot;
use crate::trace::TraceIndex;

/// Outcome of [`Vocabulary::add`].
#[derive(Debug, Default)]
pub struct AddReport {
    /// Records registered into the graph.
    pub added: usize,

    /// Records skipped because their identifier was already registered.
    pub skipped: usize,

    /// Records rejected in per-record mode, with the reason.
    pub rejected: Vec<(String, VocabError)>,
}

/// Append-only frame graph.
///
/// Nodes are stored in creation order; that order becomes the dimension
/// order of every [`VocabularySnapshot`] taken from this vocabulary. A
/// [`FrameHash`] resolves to the same node for the lifetime of the value.
///
/// Registration is a counter operation: registering the same trace twice
/// doubles the weights and frequencies it contributes.
#[derive(Debug, Default, Clone)]
pub struct Vocabulary {
    hashes: Vec<FrameHash>,
    nodes: Vec<Node>,
    index: HashMap<FrameHash, usize>,
    traces: TraceIndex,
    config: VocabConfig,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: VocabConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &VocabConfig {
        &self.config
    }

    /// Number of distinct frames.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn traces(&self) -> &TraceIndex {
        &self.traces
    }

    /// Look up a node by frame string.
    pub fn node(&self, frame: &str) -> Option<&Node> {
        self.node_by_hash(&FrameHash::of(frame))
    }

    pub fn node_by_hash(&self, hash: &FrameHash) -> Option<&Node> {
        self.index.get(hash).map(|&slot| &self.nodes[slot])
    }

    /// All nodes with their hashes, in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = (&FrameHash, &Node)> {
        self.hashes.iter().zip(self.nodes.iter())
    }

    /// Freeze the current frame ordering for vectorization.
    pub fn snapshot(&self) -> VocabularySnapshot {
        VocabularySnapshot::from_hashes(self.hashes.iter().copied())
    }

    /// Register one trace under `id`.
    ///
    /// Creates missing nodes, increments node weights, links consecutive
    /// frames and counts the trace against every frame it contains.
    pub fn register<S: AsRef<str>>(
        &mut self,
        id: &str,
        trace: &[S],
        attrs: Option<&Attrs>,
    ) -> Result<TraceHash, VocabError> {
        if trace.is_empty() {
            return Err(VocabError::EmptyTrace { id: id.to_string() });
        }
        let hashes: Vec<FrameHash> = trace.iter().map(|f| FrameHash::of(f.as_ref())).collect();
        let trace_hash = TraceHash::of(trace);
        self.apply(&hashes, trace, trace_hash, attrs);
        self.traces.track(id, trace, trace_hash);
        Ok(trace_hash)
    }

    /// Register a batch of traces.
    ///
    /// Produces the same node state as calling [`register`](Self::register)
    /// for each record in order, but hashes every distinct frame string once
    /// per batch. The batch is validated up front, so an error leaves the
    /// vocabulary untouched.
    pub fn bulk_register(
        &mut self,
        ids: &[String],
        traces: &[Vec<String>],
        attrs: Option<&[Attrs]>,
    ) -> Result<Vec<TraceHash>, VocabError> {
        if ids.len() != traces.len() {
            return Err(VocabError::ShapeMismatch {
                what: "traces",
                expected: ids.len(),
                got: traces.len(),
            });
        }
        if let Some(attrs) = attrs {
            if attrs.len() != ids.len() {
                return Err(VocabError::ShapeMismatch {
                    what: "attribute maps",
                    expected: ids.len(),
                    got: attrs.len(),
                });
            }
        }
        if let Some(pos) = traces.iter().position(|t| t.is_empty()) {
            return Err(VocabError::EmptyTrace {
                id: ids[pos].clone(),
            });
        }

        let mut cache: HashMap<&str, FrameHash> = HashMap::new();
        let mut out = Vec::with_capacity(traces.len());
        for (i, (id, trace)) in ids.iter().zip(traces.iter()).enumerate() {
            let hashes: Vec<FrameHash> = trace
                .iter()
                .map(|f| *cache.entry(f.as_str()).or_insert_with(|| FrameHash::of(f)))
                .collect();
            let trace_hash = TraceHash::of(trace);
            self.apply(&hashes, trace, trace_hash, attrs.map(|a| &a[i]));
            self.traces.track(id, trace, trace_hash);
            out.push(trace_hash);
        }
        Ok(out)
    }

    /// Feed a batch of records, skipping identifiers already registered.
    ///
    /// Small batches go through [`register`](Self::register) one record at a
    /// time; an invalid record is rejected and reported while the rest are
    /// kept. Batches at or above [`VocabConfig::max_iter_data`] (or every
    /// batch with `force_speedup`) go through
    /// [`bulk_register`](Self::bulk_register) in `chunk_size` slices, where
    /// an invalid record fails the whole call.
    pub fn add(
        &mut self,
        ids: &[String],
        traces: &[Vec<String>],
        attrs: Option<&[Attrs]>,
    ) -> Result<AddReport, VocabError> {
        if ids.len() != traces.len() {
            return Err(VocabError::ShapeMismatch {
                what: "traces",
                expected: ids.len(),
                got: traces.len(),
            });
        }
        if let Some(attrs) = attrs {
            if attrs.len() != ids.len() {
                return Err(VocabError::ShapeMismatch {
                    what: "attribute maps",
                    expected: ids.len(),
                    got: attrs.len(),
                });
            }
        }

        let mut report = AddReport::default();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut fresh: Vec<usize> = Vec::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            if self.traces.contains(id) || !seen.insert(id.as_str()) {
                report.skipped += 1;
            } else {
                fresh.push(i);
            }
        }
        if fresh.is_empty() {
            return Ok(report);
        }

        let start = Instant::now();
        if self.config.use_bulk(fresh.len()) {
            let chunk_size = self.config.chunk_size.max(1);
            let iterations = fresh.len().div_ceil(chunk_size);
            for (n, part) in fresh.chunks(chunk_size).enumerate() {
                let part_ids: Vec<String> = part.iter().map(|&i| ids[i].clone()).collect();
                let part_traces: Vec<Vec<String>> =
                    part.iter().map(|&i| traces[i].clone()).collect();
                let part_attrs: Option<Vec<Attrs>> =
                    attrs.map(|a| part.iter().map(|&i| a[i].clone()).collect());
                info!(
                    "--- adding records {} to {} - iteration {}/{}",
                    n * chunk_size,
                    n * chunk_size + part.len(),
                    n + 1,
                    iterations
                );
                self.bulk_register(&part_ids, &part_traces, part_attrs.as_deref())?;
                report.added += part.len();
            }
        } else {
            for &i in &fresh {
                match self.register(&ids[i], &traces[i], attrs.map(|a| &a[i])) {
                    Ok(_) => report.added += 1,
                    Err(e) => {
                        warn!("rejected record {}: {e}", ids[i]);
                        report.rejected.push((ids[i].clone(), e));
                    }
                }
            }
        }
        info!(
            "added {} records into vocabulary within {:?} - total {} frames",
            report.added,
            start.elapsed(),
            self.len()
        );
        Ok(report)
    }

    /// The `k` heaviest frames, heaviest first. With `reverse`, the `k`
    /// lightest, lightest first.
    pub fn top_k_nodes(&self, k: usize, reverse: bool) -> Vec<&Node> {
        let mut all: Vec<&Node> = self.nodes.iter().collect();
        if reverse {
            all.sort_by_key(|n| (n.weight, n.name.as_str()));
        } else {
            all.sort_by_key(|n| (Reverse(n.weight), n.name.as_str()));
        }
        all.truncate(k);
        all
    }

    /// The `k` most frequent distinct traces with their frequency.
    pub fn top_k_traces(&self, k: usize, reverse: bool) -> Vec<(&[String], u64)> {
        let counts = self.traces.frequencies().map(|(h, &c)| (*h, c));
        self.rank_traces(counts, k, reverse)
    }

    /// The `k` most traversed successors of `frame` with their edge counts.
    pub fn top_k_neighbors(
        &self,
        frame: &str,
        k: usize,
        reverse: bool,
    ) -> Result<Vec<(&Node, u64)>, VocabError> {
        let node = self
            .node(frame)
            .ok_or_else(|| VocabError::UnknownFrame(frame.to_string()))?;
        let mut out: Vec<(&Node, u64)> = node
            .out_edges
            .iter()
            .filter_map(|(h, &c)| self.node_by_hash(h).map(|n| (n, c)))
            .collect();
        if reverse {
            out.sort_by_key(|(n, c)| (*c, n.name.as_str()));
        } else {
            out.sort_by_key(|(n, c)| (Reverse(*c), n.name.as_str()));
        }
        out.truncate(k);
        Ok(out)
    }

    /// The `k` traces in which `frame` occurs most often.
    pub fn top_k_traces_along(
        &self,
        frame: &str,
        k: usize,
        reverse: bool,
    ) -> Result<Vec<(&[String], u64)>, VocabError> {
        let node = self
            .node(frame)
            .ok_or_else(|| VocabError::UnknownFrame(frame.to_string()))?;
        let counts = node.trace_frequency.iter().map(|(h, &c)| (*h, c));
        Ok(self.rank_traces(counts, k, reverse))
    }

    fn rank_traces(
        &self,
        counts: impl Iterator<Item = (TraceHash, u64)>,
        k: usize,
        reverse: bool,
    ) -> Vec<(&[String], u64)> {
        let mut ranked: Vec<(TraceHash, u64)> = counts.collect();
        if reverse {
            ranked.sort_by_key(|(h, c)| (*c, *h));
        } else {
            ranked.sort_by_key(|(h, c)| (Reverse(*c), *h));
        }
        ranked
            .into_iter()
            .filter_map(|(h, c)| self.traces.trace(&h).map(|t| (t, c)))
            .take(k)
            .collect()
    }

    fn slot(&mut self, hash: FrameHash, frame: &str, attrs: Option<&Attrs>) -> usize {
        if let Some(&slot) = self.index.get(&hash) {
            return slot;
        }
        let slot = self.nodes.len();
        self.nodes.push(Node::new(frame, attrs));
        self.hashes.push(hash);
        self.index.insert(hash, slot);
        slot
    }

    fn apply<S: AsRef<str>>(
        &mut self,
        hashes: &[FrameHash],
        frames: &[S],
        trace_hash: TraceHash,
        attrs: Option<&Attrs>,
    ) {
        let slots: Vec<usize> = hashes
            .iter()
            .zip(frames.iter())
            .map(|(h, f)| self.slot(*h, f.as_ref(), attrs))
            .collect();

        for &slot in &slots {
            self.nodes[slot].weight += 1;
        }
        for pair in slots.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            let (from_hash, to_hash) = (self.hashes[from], self.hashes[to]);
            *self.nodes[from].out_edges.entry(to_hash).or_insert(0) += 1;
            *self.nodes[to].in_edges.entry(from_hash).or_insert(0) += 1;
        }
        for &slot in &slots {
            *self.nodes[slot].trace_frequency.entry(trace_hash).or_insert(0) += 1;
        }
    }
}
