//! JSON-lines trace input.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, bail};
use serde::Deserialize;
use tracegroup_vocab::FrameParser;

#[derive(Debug, Deserialize)]
struct Record {
    id: String,
    #[serde(default)]
    frames: Option<Vec<String>>,
    #[serde(default)]
    log: Option<String>,
}

/// Traces read from a file, in file order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Corpus {
    pub ids: Vec<String>,
    pub traces: Vec<Vec<String>>,
}

impl Corpus {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Parse JSON-lines records. Raw logs go through `parser`; explicit frame
/// lists only have the parser's excluded frames removed.
pub fn read_corpus<R: BufRead>(reader: R, parser: &FrameParser) -> anyhow::Result<Corpus> {
    let mut corpus = Corpus::default();
    let mut logs: Vec<(usize, String)> = Vec::new();

    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: Record =
            serde_json::from_str(&line).with_context(|| format!("line {}: invalid record", n + 1))?;
        let trace = match (record.frames, record.log) {
            (Some(frames), _) => parser.filter(frames),
            (None, Some(log)) => {
                logs.push((corpus.traces.len(), log));
                Vec::new()
            }
            (None, None) => bail!("line {}: record {:?} has neither frames nor log", n + 1, record.id),
        };
        corpus.ids.push(record.id);
        corpus.traces.push(trace);
    }

    if !logs.is_empty() {
        let texts: Vec<&str> = logs.iter().map(|(_, l)| l.as_str()).collect();
        for ((pos, _), frames) in logs.iter().zip(parser.parse(&texts)) {
            corpus.traces[*pos] = frames;
        }
    }
    Ok(corpus)
}

pub fn load_corpus<P: AsRef<Path>>(path: P, parser: &FrameParser) -> anyhow::Result<Corpus> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    read_corpus(BufReader::new(file), parser)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_frames_and_logs() {
        let data = r#"{"id": "a", "frames": ["A", "junit.Runner", "B"]}

{"id": "b", "log": "Boom\n\tat x.Y.z(Y.java:1)\n"}
{"id": "c", "frames": []}
"#;
        let parser = FrameParser::new().exclude(["junit.Runner"]);
        let corpus = read_corpus(data.as_bytes(), &parser).unwrap();
        assert_eq!(corpus.ids, vec!["a", "b", "c"]);
        assert_eq!(corpus.traces[0], vec!["A", "B"]);
        assert_eq!(corpus.traces[1], vec!["x.Y.z"]);
        assert!(corpus.traces[2].is_empty());
    }

    #[test]
    fn rejects_bad_records() {
        let parser = FrameParser::new();
        let err = read_corpus(r#"{"id": "a"}"#.as_bytes(), &parser).unwrap_err();
        assert!(err.to_string().contains("neither frames nor log"));
        assert!(read_corpus("not json".as_bytes(), &parser).is_err());
    }
}
