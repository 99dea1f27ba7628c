use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use tracegroup_vocab::{Node, VocabConfig, Vocabulary};

use super::util::{build_vocabulary, frame_parser, output_result};
use crate::Cli;
use crate::input::load_corpus;

/// Build a vocabulary from a JSON-lines file and print its statistics.
#[derive(Args)]
pub struct VocabCommand {
    /// Traces to register
    pub input: PathBuf,

    /// Number of entries per ranking
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Rank from the bottom instead
    #[arg(long)]
    pub reverse: bool,

    /// Also show successors of and traces through this frame
    #[arg(long)]
    pub frame: Option<String>,

    /// Register through the bulk path regardless of input size
    #[arg(long)]
    pub force_speedup: bool,

    /// Treat logs without letters as comma-separated frame lists
    #[arg(long)]
    pub prehashed: bool,

    /// Frame to drop from every trace (repeatable)
    #[arg(long = "exclude-frame")]
    pub exclude_frames: Vec<String>,
}

#[derive(Serialize)]
struct FrameStat {
    name: String,
    weight: u64,
    successors: usize,
    predecessors: usize,
}

impl From<&Node> for FrameStat {
    fn from(n: &Node) -> Self {
        Self {
            name: n.name().to_string(),
            weight: n.weight(),
            successors: n.out_edges().len(),
            predecessors: n.in_edges().len(),
        }
    }
}

#[derive(Serialize)]
struct TraceStat {
    count: u64,
    frames: Vec<String>,
}

#[derive(Serialize)]
struct FrameDetail {
    frame: FrameStat,
    neighbors: Vec<(String, u64)>,
    traces: Vec<TraceStat>,
}

#[derive(Serialize)]
struct VocabStats {
    records: usize,
    added: usize,
    skipped: usize,
    rejected: Vec<String>,
    frames: usize,
    distinct_traces: usize,
    top_frames: Vec<FrameStat>,
    top_traces: Vec<TraceStat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<FrameDetail>,
}

fn trace_stats(ranked: Vec<(&[String], u64)>) -> Vec<TraceStat> {
    ranked
        .into_iter()
        .map(|(frames, count)| TraceStat {
            count,
            frames: frames.to_vec(),
        })
        .collect()
}

impl VocabCommand {
    fn detail(&self, vocab: &Vocabulary, frame: &str) -> anyhow::Result<FrameDetail> {
        let node = vocab
            .node(frame)
            .ok_or_else(|| anyhow::anyhow!("frame {frame:?} not in vocabulary"))?;
        let neighbors = vocab
            .top_k_neighbors(frame, self.top, self.reverse)?
            .into_iter()
            .map(|(n, c)| (n.name().to_string(), c))
            .collect();
        let traces = trace_stats(vocab.top_k_traces_along(frame, self.top, self.reverse)?);
        Ok(FrameDetail {
            frame: node.into(),
            neighbors,
            traces,
        })
    }

    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let parser = frame_parser(self.prehashed, &self.exclude_frames);
        let corpus = load_corpus(&self.input, &parser)?;
        let config = VocabConfig {
            force_speedup: self.force_speedup,
            ..VocabConfig::default()
        };
        let (vocab, report) = build_vocabulary(&corpus, config)?;

        let detail = match &self.frame {
            Some(f) => Some(self.detail(&vocab, f)?),
            None => None,
        };
        let stats = VocabStats {
            records: corpus.len(),
            added: report.added,
            skipped: report.skipped,
            rejected: report.rejected.iter().map(|(id, e)| format!("{id}: {e}")).collect(),
            frames: vocab.len(),
            distinct_traces: vocab.traces().distinct(),
            top_frames: vocab
                .top_k_nodes(self.top, self.reverse)
                .into_iter()
                .map(FrameStat::from)
                .collect(),
            top_traces: trace_stats(vocab.top_k_traces(self.top, self.reverse)),
            detail,
        };
        output_result(&stats, cli.output.as_deref(), cli.json)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use serde_json::Value;

    use crate::{Cli, Commands};

    #[test]
    fn prints_vocabulary_statistics() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("traces.jsonl");
        let out = dir.path().join("vocab.json");
        std::fs::write(
            &input,
            "{\"id\": \"a\", \"frames\": [\"A\", \"B\"]}\n\
             {\"id\": \"b\", \"frames\": [\"A\", \"B\"]}\n\
             {\"id\": \"c\", \"frames\": [\"C\"]}\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "tracegroup",
            "--json",
            "-o",
            out.to_str().unwrap(),
            "vocab",
            input.to_str().unwrap(),
            "--frame",
            "A",
        ])
        .unwrap();
        let Commands::Vocab(cmd) = &cli.command else {
            panic!("expected vocab command");
        };
        cmd.run(&cli).unwrap();

        let v: Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(v["records"], 3);
        assert_eq!(v["frames"], 3);
        assert_eq!(v["distinct_traces"], 2);
        assert_eq!(v["top_frames"][0]["name"], "A");
        assert_eq!(v["top_frames"][0]["weight"], 2);
        assert_eq!(v["top_traces"][0]["count"], 2);
        assert_eq!(v["detail"]["neighbors"][0][0], "B");
        assert_eq!(v["detail"]["neighbors"][0][1], 2);
    }
}
