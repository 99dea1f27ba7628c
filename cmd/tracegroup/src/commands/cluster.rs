use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::bail;
use clap::{Args, ValueEnum};
use serde::Serialize;
use tracegroup_cluster::{ClusterConfig, ClusterSummary, IngestMode, cluster_in_memory, run, summarize};
use tracegroup_similarity::Metric;
use tracegroup_vocab::VocabConfig;
use tracing::info;

use super::util::{build_vocabulary, frame_parser, load_cluster_config, output_result};
use crate::Cli;
use crate::input::load_corpus;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MetricArg {
    Cosine,
    Xnor,
}

impl From<MetricArg> for Metric {
    fn from(m: MetricArg) -> Self {
        match m {
            MetricArg::Cosine => Metric::Cosine,
            MetricArg::Xnor => Metric::Xnor,
        }
    }
}

/// Cluster the traces of a JSON-lines file.
#[derive(Args)]
pub struct ClusterCommand {
    /// Traces to cluster
    pub input: PathBuf,

    /// Build the vocabulary from this file instead of the input
    #[arg(long)]
    pub train: Option<PathBuf>,

    /// Similarity threshold in (0, 1]
    #[arg(short = 't', long)]
    pub threshold: Option<f32>,

    /// Documents per stored chunk
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Clusters up to this size count as "other" with --reclassify
    #[arg(long)]
    pub min_cluster_size: Option<usize>,

    /// Move small clusters to the "other" bucket
    #[arg(long)]
    pub reclassify: bool,

    #[arg(long, value_enum)]
    pub metric: Option<MetricArg>,

    /// Fail a whole chunk on the first unusable trace
    #[arg(long)]
    pub bulk: bool,

    /// Hold the whole similarity matrix in memory
    #[arg(long)]
    pub in_memory: bool,

    /// Root directory for temporary chunk storage
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,

    /// Treat logs without letters as comma-separated frame lists
    #[arg(long)]
    pub prehashed: bool,

    /// Frame to drop from every trace (repeatable)
    #[arg(long = "exclude-frame")]
    pub exclude_frames: Vec<String>,

    /// Print only the N largest clusters
    #[arg(long)]
    pub top: Option<usize>,
}

#[derive(Serialize)]
struct ClusterOutput {
    documents: usize,
    clusters: usize,
    other: usize,
    excluded: Vec<String>,
    groups: Vec<ClusterSummary>,
}

impl ClusterCommand {
    fn apply(&self, config: &mut ClusterConfig) {
        if let Some(t) = self.threshold {
            config.threshold = t;
        }
        if let Some(n) = self.chunk_size {
            config.chunk_size = n;
        }
        if let Some(n) = self.min_cluster_size {
            config.min_cluster_size = n;
        }
        if self.reclassify {
            config.reclassify_small = true;
        }
        if let Some(m) = self.metric {
            config.metric = m.into();
        }
        if self.bulk {
            config.ingest_mode = IngestMode::Bulk;
        }
        if let Some(dir) = &self.temp_dir {
            config.storage.temp_root = dir.clone();
        }
    }

    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let mut config = load_cluster_config(cli)?;
        self.apply(&mut config);
        config.validate()?;

        let parser = frame_parser(self.prehashed, &self.exclude_frames);
        let corpus = load_corpus(&self.input, &parser)?;
        if corpus.is_empty() {
            bail!("no records in {}", self.input.display());
        }
        let mut seen = HashSet::new();
        if let Some(dup) = corpus.ids.iter().find(|id| !seen.insert(id.as_str())) {
            bail!("duplicate record id {dup:?}");
        }

        let (vocab, _) = match &self.train {
            Some(path) => build_vocabulary(&load_corpus(path, &parser)?, VocabConfig::default())?,
            None => build_vocabulary(&corpus, VocabConfig::default())?,
        };
        let snapshot = vocab.snapshot();
        info!("vocabulary of {} frames from {} traces", vocab.len(), vocab.traces().len());

        let outcome = if self.in_memory {
            cluster_in_memory(&config, &snapshot, &corpus.ids, &corpus.traces)?
        } else {
            let batches = corpus
                .ids
                .chunks(config.chunk_size)
                .zip(corpus.traces.chunks(config.chunk_size))
                .map(|(ids, traces)| (ids.to_vec(), traces.to_vec()));
            run(&config, snapshot, batches)?
        };

        // Documents keep input order, minus the excluded ones.
        let excluded: HashSet<&str> = outcome.excluded.iter().map(String::as_str).collect();
        let traces: Vec<Vec<String>> = corpus
            .ids
            .iter()
            .zip(&corpus.traces)
            .filter(|(id, _)| !excluded.contains(id.as_str()))
            .map(|(_, t)| t.clone())
            .collect();

        let mut groups = summarize(&outcome.assignment, &outcome.ids, &traces)?;
        if let Some(n) = self.top {
            groups.truncate(n);
        }
        let out = ClusterOutput {
            documents: outcome.assignment.total(),
            clusters: outcome.assignment.len(),
            other: outcome.assignment.other().len(),
            excluded: outcome.excluded,
            groups,
        };
        output_result(&out, cli.output.as_deref(), cli.json)
    }
}
