//! Utility functions for CLI commands.

use anyhow::bail;
use tracegroup_cluster::ClusterConfig;
use tracegroup_vocab::{AddReport, FrameParser, VocabConfig, Vocabulary};
use tracing::{info, warn};

use crate::Cli;
use crate::input::Corpus;

/// Loads the clustering config named by `--config`, or the defaults.
pub fn load_cluster_config(cli: &Cli) -> anyhow::Result<ClusterConfig> {
    match cli.config.as_deref() {
        Some(path) => Ok(ClusterConfig::load(path)?),
        None => Ok(ClusterConfig::default()),
    }
}

/// Builds the frame parser shared by all commands.
pub fn frame_parser(prehashed: bool, exclude: &[String]) -> FrameParser {
    FrameParser::new()
        .with_prehashed_detection(prehashed)
        .exclude(exclude.iter().cloned())
}

/// Registers every record of `corpus` that has frames into a fresh
/// vocabulary.
pub fn build_vocabulary(corpus: &Corpus, config: VocabConfig) -> anyhow::Result<(Vocabulary, AddReport)> {
    let (ids, traces): (Vec<String>, Vec<Vec<String>>) = corpus
        .ids
        .iter()
        .zip(&corpus.traces)
        .filter(|(_, t)| !t.is_empty())
        .map(|(id, t)| (id.clone(), t.clone()))
        .unzip();
    if ids.len() < corpus.len() {
        info!("{} records without frames left out of the vocabulary", corpus.len() - ids.len());
    }

    let mut vocab = Vocabulary::with_config(config);
    let report = vocab.add(&ids, &traces, None)?;
    for (id, e) in &report.rejected {
        warn!("record {id} not in vocabulary: {e}");
    }
    if vocab.is_empty() {
        bail!("vocabulary is empty: no record has a usable frame");
    }
    Ok((vocab, report))
}

/// Outputs result as JSON or YAML.
pub fn output_result<T: serde::Serialize>(
    result: &T,
    output_path: Option<&str>,
    as_json: bool,
) -> anyhow::Result<()> {
    let output = if as_json {
        serde_json::to_string_pretty(result)?
    } else {
        serde_yaml::to_string(result)?
    };

    match output_path {
        Some(path) => std::fs::write(path, output)?,
        None => print!("{}", output),
    }

    Ok(())
}
