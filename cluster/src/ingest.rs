//! Turning batches of traces into membership matrices.

use std::time::Instant;

use ndarray::Array2;
use rayon::prelude::*;
use tracegroup_similarity::Metric;
use tracegroup_vocab::{MembershipVector, VocabularySnapshot};
use tracing::{debug, warn};

use crate::config::IngestMode;
use crate::error::{ClusterError, Result};

/// Documents that survived ingestion, in input order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Batch {
    pub ids: Vec<String>,
    pub matrix: Array2<f32>,
    pub excluded: Vec<String>,
}

pub(crate) struct Vectorizer<'a> {
    pub snapshot: &'a VocabularySnapshot,
    pub mode: IngestMode,
    pub metric: Metric,
    pub parallel: bool,
}

impl Vectorizer<'_> {
    /// Vectorize `traces` against the snapshot.
    ///
    /// In per-record mode empty traces, and zero vectors the metric cannot
    /// score, are excluded by id. In bulk mode either fails the batch.
    pub fn vectorize<S>(&self, ids: &[String], traces: &[Vec<S>]) -> Result<Batch>
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

        let start = Instant::now();
        let vectors: Vec<MembershipVector> = if self.parallel {
            traces.par_iter().map(|t| self.snapshot.vectorize(t)).collect()
        } else {
            traces.iter().map(|t| self.snapshot.vectorize(t)).collect()
        };
        debug!("looked up {} membership vectors in {:?}", vectors.len(), start.elapsed());

        let mut kept = Vec::with_capacity(vectors.len());
        let mut excluded = Vec::new();
        for ((id, trace), v) in ids.iter().zip(traces).zip(&vectors) {
            let problem = if trace.is_empty() {
                Some(ClusterError::EmptyTrace { id: id.clone() })
            } else if v.is_zero() && self.metric.rejects_zero_vectors() {
                Some(ClusterError::DegenerateVector { id: id.clone() })
            } else {
                None
            };
            match (problem, self.mode) {
                (None, _) => kept.push((id, v)),
                (Some(e), IngestMode::Bulk) => return Err(e),
                (Some(e), IngestMode::PerRecord) => {
                    warn!("excluded: {e}");
                    excluded.push(id.clone());
                }
            }
        }

        let dim = self.snapshot.dim();
        let mut matrix = Array2::zeros((kept.len(), dim));
        for (row, (_, v)) in kept.iter().enumerate() {
            for col in v.ones() {
                matrix[[row, col]] = 1.0;
            }
        }
        Ok(Batch {
            ids: kept.into_iter().map(|(id, _)| id.clone()).collect(),
            matrix,
            excluded,
        })
    }
}
